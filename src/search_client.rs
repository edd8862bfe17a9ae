//! Remote search service client.
//!
//! Thin REST client over the search service's management and query APIs:
//! index / datasource / indexer provisioning, indexer run triggers, batch
//! document upload, and queries. Every call is a single attempt with an
//! explicit status check; "already exists" conflicts from provisioning are
//! logged as warnings and treated as success, matching how the managed
//! service is operated.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::models::{IndexSchema, SearchHit, UploadDocument};

pub struct SearchClient {
    endpoint: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl SearchClient {
    pub fn new(search: &SearchConfig, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: search.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_version: search.api_version.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.endpoint, path, self.api_version
        )
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("search service request failed: {}", path))
    }

    /// Create the index described by `schema`. An existing index with the
    /// same name is a warning, not a failure.
    pub async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let body = serde_json::to_value(schema)?;
        let resp = self.post("indexes", &body).await?;
        ensure_created(resp, "index", &schema.name).await
    }

    /// Create a blob datasource for the managed indexer.
    pub async fn create_datasource(
        &self,
        name: &str,
        container: &str,
        connection: &str,
    ) -> Result<()> {
        let body = json!({
            "name": name,
            "type": "azureblob",
            "credentials": { "connectionString": connection },
            "container": { "name": container },
        });
        let resp = self.post("datasources", &body).await?;
        ensure_created(resp, "datasource", name).await
    }

    /// Create an indexer feeding `index` from `datasource` on a two-hour
    /// schedule.
    pub async fn create_indexer(&self, name: &str, datasource: &str, index: &str) -> Result<()> {
        let body = json!({
            "name": name,
            "dataSourceName": datasource,
            "targetIndexName": index,
            "schedule": { "interval": "PT2H" },
        });
        let resp = self.post("indexers", &body).await?;
        ensure_created(resp, "indexer", name).await
    }

    /// Trigger one run of the managed indexer.
    pub async fn run_indexer(&self, name: &str) -> Result<()> {
        let resp = self
            .post(&format!("indexers/{}/run", name), &json!({}))
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("indexer run failed (HTTP {}): {}", status, truncate(&body));
        }
        debug!(indexer = name, "indexer run triggered");
        Ok(())
    }

    /// Upload one batch of documents to `index`. Returns the number of
    /// accepted documents; any rejected document fails the whole batch.
    pub async fn upload_documents(&self, index: &str, docs: &[UploadDocument]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let actions: Vec<serde_json::Value> = docs
            .iter()
            .map(|doc| {
                json!({
                    "@search.action": "upload",
                    "id": doc.id,
                    "content": doc.content,
                    "metadata_storage_path": doc.metadata_storage_path,
                })
            })
            .collect();
        let body = json!({ "value": actions });

        let resp = self
            .post(&format!("indexes/{}/docs/index", index), &body)
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("upload failed (HTTP {}): {}", status, truncate(&body));
        }

        // A 207 response carries per-document status; reject the batch if
        // any document failed.
        let result: serde_json::Value = resp.json().await?;
        if let Some(items) = result["value"].as_array() {
            let failed: Vec<&str> = items
                .iter()
                .filter(|item| item["status"] == json!(false))
                .filter_map(|item| item["key"].as_str())
                .collect();
            if !failed.is_empty() {
                bail!(
                    "upload rejected {} of {} documents (keys: {})",
                    failed.len(),
                    docs.len(),
                    failed.join(", ")
                );
            }
        }

        Ok(docs.len())
    }

    /// Run a full-text query against `index`.
    pub async fn search(
        &self,
        index: &str,
        query: &str,
        top: Option<i64>,
    ) -> Result<Vec<SearchHit>> {
        let mut body = json!({ "search": query });
        if let Some(top) = top {
            body["top"] = json!(top);
        }

        let resp = self
            .post(&format!("indexes/{}/docs/search", index), &body)
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("search failed (HTTP {}): {}", status, truncate(&text));
        }

        #[derive(serde::Deserialize)]
        struct SearchResponse {
            value: Vec<SearchHit>,
        }

        let response: SearchResponse = resp.json().await?;
        Ok(response.value)
    }
}

/// 201 is created; 409 means the resource already exists and is treated as
/// success with a warning. Anything else is an error.
async fn ensure_created(resp: reqwest::Response, kind: &str, name: &str) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        debug!(kind, name, "created");
        return Ok(());
    }
    if status == reqwest::StatusCode::CONFLICT {
        warn!(kind, name, "already exists, leaving it in place");
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    bail!(
        "failed to create {} '{}' (HTTP {}): {}",
        kind,
        name,
        status,
        truncate(&body)
    )
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}
