use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::{Conversation, ToolCallRequest, ToolDescriptor, Turn};
use crate::error::{Error, Result};
use crate::llm::{CompletionClient, CompletionResponse, Usage, completion_from_parts};

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDescriptor],
}

fn no_tools(tools: &&[ToolDescriptor]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, max_tokens: u32, base_url: String) -> Self {
        Self {
            client: super::http_client(),
            api_key,
            model,
            max_tokens,
            base_url,
        }
    }
}

fn to_messages(conversation: &Conversation) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();
    for turn in conversation.turns() {
        let (role, block) = match turn {
            Turn::User(text) => ("user", vec![ContentBlock::Text { text: text.clone() }]),
            Turn::Assistant(text) => ("assistant", vec![ContentBlock::Text { text: text.clone() }]),
            Turn::ToolCall { text, call } => {
                let mut blocks = Vec::new();
                if let Some(text) = text {
                    blocks.push(ContentBlock::Text { text: text.clone() });
                }
                blocks.push(ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                });
                ("assistant", blocks)
            }
            Turn::ToolResult(result) => (
                "user",
                vec![ContentBlock::ToolResult {
                    tool_use_id: result.call_id.clone(),
                    content: result.content(),
                    is_error: result.is_error().then_some(true),
                }],
            ),
        };
        // Consecutive same-role turns are merged into one message
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(block),
            _ => messages.push(Message {
                role: role.into(),
                content: block,
            }),
        }
    }
    messages
}

impl CompletionClient for AnthropicProvider {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        conversation: &'a Conversation,
        tools: &'a [ToolDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(Error::Provider("ANTHROPIC_API_KEY not set".into()));
            }

            let request = MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                system,
                messages: to_messages(conversation),
                tools,
            };

            let resp = self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Provider(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Provider(format!("{status}: {body}")));
            }

            let response: MessagesResponse = resp
                .json()
                .await
                .map_err(|e| Error::Provider(format!("malformed response: {e}")))?;

            let mut texts = Vec::new();
            let mut calls = Vec::new();
            for block in response.content {
                match block {
                    ContentBlock::Text { text } => texts.push(text),
                    ContentBlock::ToolUse { id, name, input } => calls.push(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    }),
                    _ => {}
                }
            }

            Ok(CompletionResponse {
                completion: completion_from_parts(texts, calls),
                usage: Usage {
                    input_tokens: response.usage.input_tokens,
                    output_tokens: response.usage.output_tokens,
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ToolCallResult, ToolFailure, ToolOutput};
    use crate::llm::Completion;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(
            "test-key".into(),
            "claude-test".into(),
            1024,
            base_url.into(),
        )
    }

    fn tool_conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.push(Turn::User("What is the RxCUI for ibuprofen?".into()));
        conv.push(Turn::ToolCall {
            text: Some("Looking it up.".into()),
            call: ToolCallRequest {
                id: "toolu_1".into(),
                name: "find_rxcui".into(),
                arguments: json!({"drug_name": "ibuprofen"}),
            },
        });
        conv.push(Turn::ToolResult(ToolCallResult {
            call_id: "toolu_1".into(),
            name: "find_rxcui".into(),
            output: ToolOutput::Failure(ToolFailure::Upstream {
                status: Some(500),
                message: "boom".into(),
            }),
        }));
        conv
    }

    #[test]
    fn test_to_messages_format() {
        let messages = to_messages(&tool_conversation());
        let v = serde_json::to_value(&messages).unwrap();
        assert_eq!(v[0]["role"], "user");
        assert_eq!(v[0]["content"][0]["type"], "text");
        assert_eq!(v[1]["role"], "assistant");
        assert_eq!(v[1]["content"][0]["text"], "Looking it up.");
        assert_eq!(v[1]["content"][1]["type"], "tool_use");
        assert_eq!(v[1]["content"][1]["input"]["drug_name"], "ibuprofen");
        assert_eq!(v[2]["role"], "user");
        assert_eq!(v[2]["content"][0]["type"], "tool_result");
        assert_eq!(v[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(v[2]["content"][0]["is_error"], true);
    }

    #[test]
    fn test_to_messages_merges_consecutive_user_turns() {
        let mut conv = tool_conversation();
        conv.push(Turn::User("and aspirin?".into()));
        let messages = to_messages(&conv);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content.len(), 2);
    }

    #[tokio::test]
    async fn test_complete_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Hello!"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 5}
            })))
            .mount(&server)
            .await;

        let provider = make_provider(&server.uri());
        let mut conv = Conversation::new();
        conv.push(Turn::User("Hi".into()));
        let resp = provider.complete("system", &conv, &[]).await.unwrap();
        assert_eq!(resp.completion, Completion::Answer("Hello!".into()));
        assert_eq!(resp.usage.input_tokens, 10);
        assert_eq!(resp.usage.output_tokens, 5);
    }

    #[tokio::test]
    async fn test_complete_tool_use_sends_tools() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({
                "tools": [{"name": "find_rxcui"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "find_rxcui",
                    "input": {"drug_name": "ibuprofen"}
                }],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 20, "output_tokens": 10}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = make_provider(&server.uri());
        let mut conv = Conversation::new();
        conv.push(Turn::User("What is the RxCUI for ibuprofen?".into()));
        let tools = vec![ToolDescriptor {
            name: "find_rxcui".into(),
            description: "Find an RxCUI".into(),
            input_schema: json!({"type": "object"}),
        }];
        let resp = provider.complete("system", &conv, &tools).await.unwrap();
        match resp.completion {
            Completion::ToolCall { call, .. } => {
                assert_eq!(call.id, "toolu_1");
                assert_eq!(call.name, "find_rxcui");
                assert_eq!(call.arguments["drug_name"], "ibuprofen");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = AnthropicProvider::new(
            String::new(),
            "claude-test".into(),
            1024,
            "http://127.0.0.1:1".into(),
        );
        let err = provider
            .complete("system", &Conversation::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let provider = make_provider(&server.uri());
        let err = provider
            .complete("system", &Conversation::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = make_provider(&server.uri());
        let err = provider
            .complete("system", &Conversation::new(), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }
}
