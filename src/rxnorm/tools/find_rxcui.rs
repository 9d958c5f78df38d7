use serde_json::{Value, json};

use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};
use crate::rxnorm::RxNormClient;

pub fn definition() -> ToolDescriptor {
    ToolDescriptor {
        name: "find_rxcui".into(),
        description: "Look up the RxNorm concept identifier (RxCUI) for an exact drug name.".into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "drug_name": {
                    "type": "string",
                    "description": "Drug name, e.g. \"ibuprofen\""
                }
            },
            "required": ["drug_name"]
        }),
    }
}

pub async fn execute(client: &RxNormClient, input: &Value) -> Result<Value> {
    let name = input["drug_name"]
        .as_str()
        .ok_or_else(|| Error::Tool("find_rxcui: missing 'drug_name' parameter".into()))?;
    client.find_rxcui(name).await
}
