use serde_json::{Value, json};

use crate::conversation::ToolDescriptor;
use crate::error::{Error, Result};
use crate::rxnorm::RxNormClient;

pub fn definition() -> ToolDescriptor {
    ToolDescriptor {
        name: "get_drug_properties".into(),
        description: "Fetch the RxNorm properties (name, term type, synonym, language) of a concept \
                      by its RxCUI."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "rxcui": {
                    "type": "string",
                    "description": "Numeric RxCUI, e.g. \"5640\""
                }
            },
            "required": ["rxcui"]
        }),
    }
}

pub async fn execute(client: &RxNormClient, input: &Value) -> Result<Value> {
    // Models often send the id as a bare number.
    let rxcui = match &input["rxcui"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(Error::Tool(
                "get_drug_properties: missing 'rxcui' parameter".into(),
            ));
        }
    };
    client.get_drug_properties(&rxcui).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_numeric_rxcui_argument() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rxcui/5640/properties.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"rxcui": "5640", "name": "ibuprofen"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNormClient::new(server.uri()).unwrap();
        let out = execute(&client, &json!({"rxcui": 5640})).await.unwrap();
        assert_eq!(out["properties"]["name"], "ibuprofen");
    }

    #[tokio::test]
    async fn test_missing_rxcui() {
        let client = RxNormClient::new("http://127.0.0.1:1").unwrap();
        let err = execute(&client, &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }
}
