//! Conversions between rxchat's tool types and the MCP wire model.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject, RawContent, Tool};
use serde_json::{Value, json};

use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};

pub fn descriptor(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        input_schema: Value::Object((*tool.input_schema).clone()),
    }
}

pub fn tool(descriptor: &ToolDescriptor) -> Tool {
    let schema: JsonObject = match &descriptor.input_schema {
        Value::Object(map) => map.clone(),
        _ => JsonObject::from_iter([("type".to_string(), json!("object"))]),
    };
    Tool::new(
        descriptor.name.clone(),
        descriptor.description.clone(),
        Arc::new(schema),
    )
}

/// A successful `tools/call` result. Objects travel both as pretty text and
/// as structured content.
pub fn success(value: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    if value.is_object() {
        result.structured_content = Some(value.clone());
    }
    result
}

/// An error `tools/call` result carrying `{"error": {"status", "message"}}`.
pub fn failure(err: Error) -> CallToolResult {
    let (status, message) = match err {
        Error::Upstream { status, message } => (status, message),
        Error::Tool(message) => (None, message),
        other => (None, other.to_string()),
    };
    let payload = json!({ "error": { "status": status, "message": message } });
    CallToolResult::error(vec![Content::text(payload.to_string())])
}

/// Interprets a `tools/call` result. Error results become
/// [`Error::Upstream`] with the status and message the server reported.
pub fn parse_result(result: CallToolResult) -> Result<Value> {
    let text = result
        .content
        .iter()
        .filter_map(|part| match &part.raw {
            RawContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        return Err(upstream_from_text(&text));
    }
    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    if text.is_empty() {
        return Ok(Value::String("(empty tool result)".into()));
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

fn upstream_from_text(text: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(text).ok();
    match parsed.as_ref().and_then(|v| v.get("error")) {
        Some(Value::Object(obj)) => Error::Upstream {
            status: obj
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok()),
            message: obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(text)
                .to_string(),
        },
        Some(Value::String(message)) => Error::Upstream {
            status: None,
            message: message.clone(),
        },
        _ => Error::Upstream {
            status: None,
            message: text.to_string(),
        },
    }
}
