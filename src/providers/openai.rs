use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::conversation::{Conversation, ToolCallRequest, ToolDescriptor, Turn};
use crate::error::{Error, Result};
use crate::llm::{CompletionClient, CompletionResponse, Usage, completion_from_parts};

pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAIProvider {
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

fn to_messages(system: &str, conversation: &Conversation) -> Vec<Value> {
    let mut messages = vec![json!({
        "role": "system",
        "content": system,
    })];
    for turn in conversation.turns() {
        let msg = match turn {
            Turn::User(text) => json!({ "role": "user", "content": text }),
            Turn::Assistant(text) => json!({ "role": "assistant", "content": text }),
            Turn::ToolCall { text, call } => json!({
                "role": "assistant",
                "content": text,
                "tool_calls": [{
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                }]
            }),
            Turn::ToolResult(result) => json!({
                "role": "tool",
                "tool_call_id": result.call_id,
                "content": result.content(),
            }),
        };
        messages.push(msg);
    }
    messages
}

impl CompletionClient for OpenAIProvider {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        conversation: &'a Conversation,
        tools: &'a [ToolDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse>> + Send + 'a>> {
        Box::pin(async move {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect();

            let mut body = json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "messages": to_messages(system, conversation),
            });
            if !tool_defs.is_empty() {
                body["tools"] = json!(tool_defs);
            }

            let mut req = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .json(&body);

            if !self.api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", self.api_key));
            }

            let resp = req
                .send()
                .await
                .map_err(|e| Error::Provider(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Provider(format!("{status}: {body}")));
            }

            let response: ChatResponse = resp
                .json()
                .await
                .map_err(|e| Error::Provider(format!("malformed response: {e}")))?;

            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| Error::Provider("no choices in response".into()))?;

            let calls = choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|c| {
                    let arguments = parse_arguments(&c.function.name, &c.function.arguments);
                    ToolCallRequest {
                        id: c.id,
                        name: c.function.name,
                        arguments,
                    }
                })
                .collect();
            let texts = choice.message.content.into_iter().collect();

            let usage = match response.usage {
                Some(u) => Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                },
                None => Usage::default(),
            };

            Ok(CompletionResponse {
                completion: completion_from_parts(texts, calls),
                usage,
            })
        })
    }
}

/// Tool-call arguments arrive as a JSON string. Anything unparseable is
/// passed on as an empty object so the tool reports what is missing.
fn parse_arguments(tool: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!("malformed arguments for {tool} ({e}): {raw}");
        json!({})
    })
}
