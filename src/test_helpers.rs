use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::conversation::{Conversation, ToolCallRequest, ToolDescriptor};
use crate::error::{Error, Result};
use crate::llm::{Completion, CompletionClient, CompletionResponse, Usage};
use crate::mcp::ToolServer;

/// What the mock saw on one `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub conversation: Conversation,
    pub tool_names: Vec<String>,
}

/// Replays scripted completions in order and records every request.
pub struct MockCompletionClient {
    responses: Mutex<Vec<Result<Completion>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockCompletionClient {
    pub fn new(responses: Vec<Result<Completion>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.calls)
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        conversation: &'a Conversation,
        tools: &'a [ToolDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse>> + Send + 'a>> {
        self.calls.lock().unwrap().push(RecordedCall {
            conversation: conversation.clone(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        let next = {
            let mut responses = self.responses.lock().unwrap();
            assert!(!responses.is_empty(), "mock completion client ran out of responses");
            responses.remove(0)
        };
        Box::pin(async move {
            next.map(|completion| CompletionResponse {
                completion,
                usage: fake_usage(),
            })
        })
    }
}

/// An in-process tool server with canned outputs.
pub struct MockToolServer {
    name: String,
    tools: Vec<ToolDescriptor>,
    outputs: HashMap<String, Result<Value>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    delay: Option<Duration>,
}

impl MockToolServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            outputs: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Makes every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_tool(self, tool: &str, output: Value) -> Self {
        self.with_output(tool, Ok(output))
    }

    pub fn with_error(self, tool: &str, error: Error) -> Self {
        self.with_output(tool, Err(error))
    }

    fn with_output(mut self, tool: &str, output: Result<Value>) -> Self {
        self.tools.push(ToolDescriptor {
            name: tool.into(),
            description: format!("mock {tool}"),
            input_schema: json!({"type": "object"}),
        });
        self.outputs.insert(tool.into(), output);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        Arc::clone(&self.calls)
    }
}

impl ToolServer for MockToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDescriptor>>> + Send + '_>> {
        let tools = self.tools.clone();
        Box::pin(async move { Ok(tools) })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        let out = match self.outputs.get(name) {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(Error::Upstream { status, message })) => Err(Error::Upstream {
                status: *status,
                message: message.clone(),
            }),
            Some(Err(Error::ProxyUnavailable(m))) => Err(Error::ProxyUnavailable(m.clone())),
            Some(Err(e)) => Err(Error::Tool(e.to_string())),
            None => Err(Error::UnknownOperation(name.to_string())),
        };
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            out
        })
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> Completion {
    Completion::ToolCall {
        text: None,
        call: ToolCallRequest {
            id: id.into(),
            name: name.into(),
            arguments,
        },
    }
}

pub fn answer(text: &str) -> Completion {
    Completion::Answer(text.into())
}

pub fn fake_usage() -> Usage {
    Usage {
        input_tokens: 0,
        output_tokens: 0,
    }
}
