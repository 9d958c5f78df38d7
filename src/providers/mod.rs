pub mod anthropic;
pub mod openai;

use serde::Deserialize;

use crate::llm::CompletionClient;

#[derive(Debug, Clone, PartialEq, Deserialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    Anthropic,
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAI,
}

/// Auto-detect provider from model name: `claude*` → Anthropic, everything else → OpenAI.
pub fn detect_provider(model: &str) -> Provider {
    if model.starts_with("claude") {
        Provider::Anthropic
    } else {
        Provider::OpenAI
    }
}

/// Reads the credential for `provider` from the environment. An empty string
/// means none was found.
pub fn api_key_from_env(provider: &Provider) -> String {
    match provider {
        Provider::Anthropic => std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        Provider::OpenAI => std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("LLM_API_KEY"))
            .unwrap_or_default(),
    }
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("rxchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

pub fn build_client(
    provider: &Provider,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: Option<String>,
) -> Box<dyn CompletionClient> {
    match provider {
        Provider::Anthropic => {
            let base = base_url.unwrap_or_else(|| "https://api.anthropic.com".into());
            Box::new(anthropic::AnthropicProvider::new(
                api_key, model, max_tokens, base,
            ))
        }
        Provider::OpenAI => {
            let base = base_url.unwrap_or_else(|| "https://api.openai.com/v1".into());
            Box::new(openai::OpenAIProvider::new(
                api_key, model, max_tokens, base,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_detect_provider_claude() {
        assert_eq!(detect_provider("claude-sonnet-4-5"), Provider::Anthropic);
        assert_eq!(
            detect_provider("claude-3-7-sonnet-20250219"),
            Provider::Anthropic
        );
    }

    #[test]
    fn test_detect_provider_non_claude() {
        assert_eq!(detect_provider("gpt-4o"), Provider::OpenAI);
        assert_eq!(detect_provider("llama-3"), Provider::OpenAI);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(Provider::from_str("anthropic").unwrap(), Provider::Anthropic);
        assert_eq!(Provider::from_str("openai").unwrap(), Provider::OpenAI);
        assert!(Provider::from_str("gemini").is_err());
        assert_eq!(Provider::OpenAI.to_string(), "openai");
    }
}
