use std::future::Future;
use std::pin::Pin;

use crate::conversation::{Conversation, ToolCallRequest, ToolDescriptor};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Answer(String),
    ToolCall {
        text: Option<String>,
        call: ToolCallRequest,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub completion: Completion,
    pub usage: Usage,
}

/// A chat completion API. Implementations translate the typed
/// [`Conversation`] into their provider's wire format on every call.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        conversation: &'a Conversation,
        tools: &'a [ToolDescriptor],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse>> + Send + 'a>>;
}

/// Joins text blocks and decides between an answer and a tool call.
/// Providers may return several tool calls; only the first is kept.
pub(crate) fn completion_from_parts(
    texts: Vec<String>,
    mut calls: Vec<ToolCallRequest>,
) -> Completion {
    let text: String = texts.concat().trim().to_string();
    if calls.is_empty() {
        return Completion::Answer(text);
    }
    if calls.len() > 1 {
        log::warn!(
            "provider requested {} tool calls, dispatching only {}",
            calls.len(),
            calls[0].name
        );
    }
    let call = calls.swap_remove(0);
    Completion::ToolCall {
        text: if text.is_empty() { None } else { Some(text) },
        call,
    }
}
