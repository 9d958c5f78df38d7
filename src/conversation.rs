use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, fmt_status};

/// A callable operation advertised by a tool server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolFailure {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("upstream error{}: {message}", fmt_status(.status))]
    Upstream { status: Option<u16>, message: String },

    #[error("tool server unavailable: {message}")]
    Unavailable { message: String },
}

impl From<Error> for ToolFailure {
    fn from(err: Error) -> Self {
        match err {
            Error::UnknownOperation(name) => ToolFailure::UnknownOperation { name },
            Error::Upstream { status, message } => ToolFailure::Upstream { status, message },
            other => ToolFailure::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Success(Value),
    Failure(ToolFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub output: ToolOutput,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        matches!(self.output, ToolOutput::Failure(_))
    }

    /// Text handed to the model as the tool's result.
    pub fn content(&self) -> String {
        match &self.output {
            ToolOutput::Success(Value::String(s)) => s.clone(),
            ToolOutput::Success(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            ToolOutput::Failure(f) => format!("Error: {f}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    Assistant(String),
    /// An assistant turn that asks for a tool. `text` is any prose the model
    /// emitted alongside the request.
    ToolCall {
        text: Option<String>,
        call: ToolCallRequest,
    },
    ToolResult(ToolCallResult),
}

impl Turn {
    pub fn role(&self) -> Role {
        match self {
            Turn::User(_) => Role::User,
            Turn::Assistant(_) | Turn::ToolCall { .. } => Role::Assistant,
            Turn::ToolResult(_) => Role::ToolResult,
        }
    }
}

/// Append-only transcript of a chat session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// True when every tool result directly follows the call it answers and
    /// no tool call is left without a result.
    pub fn is_well_formed(&self) -> bool {
        let mut pending: Option<&ToolCallRequest> = None;
        for turn in &self.turns {
            match (turn, pending) {
                (Turn::ToolResult(result), Some(call)) => {
                    if result.name != call.name || result.call_id != call.id {
                        return false;
                    }
                    pending = None;
                }
                (Turn::ToolResult(_), None) => return false,
                (_, Some(_)) => return false,
                (Turn::ToolCall { call, .. }, None) => pending = Some(call),
                _ => {}
            }
        }
        pending.is_none()
    }
}
