use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use adweave_core::config::RetrievalConfig;
use adweave_core::{CandidateProduct, Vertical};

use crate::capabilities::ProductRetriever;

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: usize,
    filter: QueryFilter,
}

#[derive(Debug, Serialize)]
struct QueryFilter {
    target_vertical: &'static str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<QueryHit>,
}

#[derive(Debug, Deserialize)]
struct QueryHit {
    id: String,
    document: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

/// HTTP client for the external vector catalog. Sends the latest user
/// utterance as the query, pre-filtered by vertical, and decodes the ranked
/// hits. Retrieval mechanics (embedding, indexing) live entirely on the
/// other side of this boundary.
pub struct VectorCatalogClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl VectorCatalogClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }
}

#[async_trait]
impl ProductRetriever for VectorCatalogClient {
    async fn search(
        &self,
        query: &str,
        vertical: Vertical,
        top_k: usize,
    ) -> Result<Vec<CandidateProduct>> {
        let url = format!("{}/collections/{}/query", self.base_url, self.collection);
        let body = QueryRequest {
            query,
            top_k,
            filter: QueryFilter { target_vertical: vertical.as_str() },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("catalog query to {url} failed"))?
            .error_for_status()
            .context("catalog query returned an error status")?;

        let payload: QueryResponse =
            response.json().await.context("catalog response body was not valid JSON")?;

        Ok(payload
            .results
            .into_iter()
            .map(|hit| CandidateProduct {
                id: hit.id,
                document: hit.document,
                attributes: hit.attributes,
            })
            .collect())
    }
}
