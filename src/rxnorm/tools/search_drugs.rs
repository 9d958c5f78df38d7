use serde_json::{Value, json};

use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};
use crate::rxnorm::RxNormClient;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 50;

pub fn definition() -> ToolDescriptor {
    ToolDescriptor {
        name: "search_drugs".into(),
        description: "Search RxNorm for drug concepts by brand or generic name. \
                      Returns matching concepts with their RxCUI, name, synonym and term type."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Drug name to search for, e.g. \"tylenol\""
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (1-50, default 5)"
                }
            },
            "required": ["query"]
        }),
    }
}

/// Accepts a number or a numeric string; anything else means the default.
fn limit(input: &Value) -> usize {
    let raw = match &input["limit"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match raw {
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as usize,
        None => DEFAULT_LIMIT,
    }
}

pub async fn execute(client: &RxNormClient, input: &Value) -> Result<Value> {
    let query = input["query"]
        .as_str()
        .ok_or_else(|| Error::Tool("search_drugs: missing 'query' parameter".into()))?;
    client.search_drugs(query, limit(input)).await
}
