//! RxNorm REST client and the MCP tools built on it.

pub mod tools;

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://rxnav.nlm.nih.gov/REST";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct RxNormClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize, Default)]
struct DrugsResponse {
    #[serde(rename = "drugGroup", default)]
    drug_group: DrugGroup,
}

#[derive(Debug, Deserialize, Default)]
struct DrugGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Option<Vec<ConceptGroup>>,
}

#[derive(Debug, Deserialize)]
struct ConceptGroup {
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Option<Vec<ConceptProperties>>,
}

#[derive(Debug, Deserialize)]
struct ConceptProperties {
    rxcui: Option<String>,
    name: Option<String>,
    synonym: Option<String>,
    tty: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RxcuiResponse {
    #[serde(rename = "idGroup", default)]
    id_group: IdGroup,
}

#[derive(Debug, Deserialize, Default)]
struct IdGroup {
    #[serde(rename = "rxnormId", default)]
    rxnorm_id: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct PropertiesResponse {
    #[serde(default)]
    properties: Option<Value>,
}

impl RxNormClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rxchat/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let url = reqwest::Url::parse_with_params(&url, params)
            .map_err(|e| Error::Tool(format!("invalid RxNorm URL {url}: {e}")))?;
        log::debug!("GET {url}");
        let resp = self.client.get(url).send().await.map_err(|e| Error::Upstream {
            status: e.status().map(|s| s.as_u16()),
            message: format!("HTTP error contacting RxNorm: {e}"),
        })?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: Some(status.as_u16()),
                message: format!("RxNorm returned {status}: {body}"),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: serde::de::DeserializeOwned + Default>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self.get(path, params).await?;
        let text = resp.text().await.map_err(|e| Error::Upstream {
            status: None,
            message: format!("failed to read RxNorm response: {e}"),
        })?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|e| Error::Upstream {
            status: None,
            message: format!("malformed RxNorm response: {e}"),
        })
    }

    /// Drug concepts matching a brand or generic name, at most `limit`.
    pub async fn search_drugs(&self, query: &str, limit: usize) -> Result<Value> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Tool("query is required".into()));
        }
        let data: DrugsResponse = self.get_json("/drugs.json", &[("name", query)]).await?;
        let results: Vec<Value> = data
            .drug_group
            .concept_group
            .unwrap_or_default()
            .into_iter()
            .flat_map(|g| g.concept_properties.unwrap_or_default())
            .take(limit)
            .map(|c| {
                json!({
                    "rxcui": c.rxcui,
                    "name": c.name,
                    "synonym": c.synonym,
                    "tty": c.tty,
                })
            })
            .collect();
        Ok(json!({ "query": query, "results": results }))
    }

    /// The RxCUI for an exact drug name. `rxcui` is null when RxNorm has no match.
    pub async fn find_rxcui(&self, drug_name: &str) -> Result<Value> {
        let drug_name = drug_name.trim();
        if drug_name.is_empty() {
            return Err(Error::Tool("drug_name is required".into()));
        }
        let data: RxcuiResponse = self.get_json("/rxcui.json", &[("name", drug_name)]).await?;
        let ids = data.id_group.rxnorm_id.unwrap_or_default();
        Ok(json!({
            "drug_name": drug_name,
            "rxcui": ids.first(),
            "rxnorm_ids": ids,
        }))
    }

    pub async fn get_drug_properties(&self, rxcui: &str) -> Result<Value> {
        let rxcui = rxcui.trim();
        if rxcui.is_empty() {
            return Err(Error::Tool("rxcui is required".into()));
        }
        if !rxcui.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Tool(format!("rxcui must be numeric, got {rxcui:?}")));
        }
        let data: PropertiesResponse = self
            .get_json(&format!("/rxcui/{rxcui}/properties.json"), &[])
            .await?;
        Ok(json!({
            "rxcui": rxcui,
            "properties": data.properties.unwrap_or_else(|| json!({})),
        }))
    }
}
