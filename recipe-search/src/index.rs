//! HTTP client for the search index.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::query::{build_query_body, mapping_body, SearchMode, SearchRequest};
use crate::{RecipeDoc, SearchError};

/// Default bulk batch size; small boxes choke on much more, sync jobs may
/// raise it into the 1000–2000 range.
pub const DEFAULT_BULK_BATCH: usize = 100;

/// Per-batch accounting from [`SearchIndex::bulk_upsert`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub indexed: usize,
    pub failed: usize,
}

/// One query hit.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchHit {
    pub identifier: Uuid,
    pub title: String,
    pub score: Option<f64>,
}

/// Client for one named index on one search service.
#[derive(Clone, Debug)]
pub struct SearchIndex {
    http: reqwest::Client,
    base_url: String,
    index: String,
}

impl SearchIndex {
    pub fn new(base_url: &str, index: &str) -> Self {
        SearchIndex {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        }
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    /// Create the index with its mapping if it does not exist. Existing
    /// indexes are never mutated in place; see [`SearchIndex::recreate_index`].
    #[instrument(name = "ensure_index", skip_all)]
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let head = self.http.head(self.index_url()).send().await?;
        if head.status().is_success() {
            debug!(index = %self.index, "index already exists");
            return Ok(());
        }
        self.create_index().await
    }

    /// Destructive refresh: drop and re-create the index. Explicit by
    /// design; nothing in the sync path calls this.
    #[instrument(name = "recreate_index", skip_all)]
    pub async fn recreate_index(&self) -> Result<(), SearchError> {
        let delete = self.http.delete(self.index_url()).send().await?;
        if !delete.status().is_success() && delete.status().as_u16() != 404 {
            return Err(error_from(delete).await);
        }
        self.create_index().await
    }

    async fn create_index(&self) -> Result<(), SearchError> {
        let response = self
            .http
            .put(self.index_url())
            .json(&mapping_body())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        info!(index = %self.index, "created index");
        Ok(())
    }

    /// Bulk upsert a batch of documents, `_id` = recipe identifier.
    /// Per-item failures are counted, not fatal.
    #[instrument(name = "bulk_upsert", skip_all, fields(batch = docs.len()))]
    pub async fn bulk_upsert(&self, docs: &[RecipeDoc]) -> Result<BulkReport, SearchError> {
        if docs.is_empty() {
            return Ok(BulkReport::default());
        }
        let mut ndjson = String::new();
        for doc in docs {
            let action = serde_json::json!({"index": {"_index": self.index, "_id": doc.identifier}});
            ndjson.push_str(&action.to_string());
            ndjson.push('\n');
            ndjson.push_str(&serde_json::to_string(doc).unwrap_or_default());
            ndjson.push('\n');
        }

        let response = self
            .http
            .post(format!("{}/_bulk", self.base_url))
            .header("content-type", "application/x-ndjson")
            .body(ndjson)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let body: Value = response.json().await?;
        let mut report = BulkReport::default();
        if let Some(items) = body["items"].as_array() {
            for item in items {
                let status = item["index"]["status"].as_u64().unwrap_or(0);
                if (200..300).contains(&status) {
                    report.indexed += 1;
                } else {
                    report.failed += 1;
                    error!(
                        id = %item["index"]["_id"],
                        error = %item["index"]["error"],
                        "bulk item rejected"
                    );
                }
            }
        } else {
            report.indexed = docs.len();
        }
        Ok(report)
    }

    /// Run one query; see [`crate::query::build_query_body`] for the exact
    /// shapes per mode.
    #[instrument(name = "search_query", skip_all, fields(mode = ?mode))]
    pub async fn query(
        &self,
        mode: SearchMode,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let body = build_query_body(mode, request);
        let response = self
            .http
            .post(format!("{}/_search", self.index_url()))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        let body: Value = response.json().await?;
        let hits = body["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| {
                        let identifier = hit["_id"].as_str()?.parse().ok()?;
                        Some(SearchHit {
                            identifier,
                            title: hit["_source"]["title"].as_str().unwrap_or_default().to_string(),
                            score: hit["_score"].as_f64(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }
}

async fn error_from(response: reqwest::Response) -> SearchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SearchError::Api { status, body }
}
