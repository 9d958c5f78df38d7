pub mod find_rxcui;
pub mod get_drug_properties;
pub mod search_drugs;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::conversation::ToolDescriptor;
use crate::error::Result;
use crate::mcp::server::{ToolHandler, ToolService};
use crate::rxnorm::RxNormClient;

pub fn all_definitions() -> Vec<ToolDescriptor> {
    vec![
        search_drugs::definition(),
        find_rxcui::definition(),
        get_drug_properties::definition(),
    ]
}

/// The RxNorm proxy's tool table.
pub struct RxNormTools {
    client: RxNormClient,
}

impl RxNormTools {
    pub fn new(client: RxNormClient) -> Self {
        Self { client }
    }
}

impl ToolHandler for RxNormTools {
    fn server_name(&self) -> &str {
        "rxnorm"
    }

    fn definitions(&self) -> Vec<ToolDescriptor> {
        all_definitions()
    }

    fn call<'a>(
        &'a self,
        name: &'a str,
        arguments: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Option<Result<Value>>> + Send + 'a>> {
        Box::pin(async move {
            let result = match name {
                "search_drugs" => search_drugs::execute(&self.client, arguments).await,
                "find_rxcui" => find_rxcui::execute(&self.client, arguments).await,
                "get_drug_properties" => {
                    get_drug_properties::execute(&self.client, arguments).await
                }
                _ => return None,
            };
            Some(result)
        })
    }
}

/// Runs the RxNorm proxy on this process's stdin/stdout.
pub async fn run_stdio(base_url: &str) -> Result<()> {
    let tools = RxNormTools::new(RxNormClient::new(base_url)?);
    ToolService::new(tools).serve_stdio().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rmcp::ServiceExt;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::Error;
    use crate::mcp::ToolServer;
    use crate::mcp::client::McpClient;

    async fn proxy_client(base_url: String) -> McpClient {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let tools = RxNormTools::new(RxNormClient::new(base_url).unwrap());
            let running = ToolService::new(tools)
                .serve(tokio::io::split(server_end))
                .await
                .unwrap();
            let _ = running.waiting().await;
        });
        let service = ().serve(tokio::io::split(client_end)).await.unwrap();
        McpClient::new("rxnorm", service, Duration::from_secs(5))
    }

    #[test]
    fn test_tool_names_unique() {
        let defs = all_definitions();
        let mut names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[tokio::test]
    async fn test_find_rxcui_through_proxy() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rxcui.json"))
            .and(query_param("name", "ibuprofen"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idGroup": {"name": "ibuprofen", "rxnormId": ["5640"]}
            })))
            .mount(&upstream)
            .await;

        let client = proxy_client(upstream.uri()).await;
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 3);

        let out = client
            .call_tool("find_rxcui", json!({"drug_name": "ibuprofen"}))
            .await
            .unwrap();
        assert_eq!(out["rxcui"], "5640");
    }

    #[tokio::test]
    async fn test_upstream_status_through_proxy() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;

        let client = proxy_client(upstream.uri()).await;
        let err = client
            .call_tool("search_drugs", json!({"query": "advil"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_tool_errors() {
        let client = proxy_client("http://127.0.0.1:1".into()).await;
        let err = client
            .call_tool("get_drug_properties", json!({"rxcui": "abc"}))
            .await
            .unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, None);
                assert!(message.contains("numeric"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
