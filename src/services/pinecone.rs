//! Pinecone REST client
//!
//! Index management goes through the control plane (`/indexes`). Vector
//! operations go to the index's own host, which the control plane reports
//! in the index description and which is cached after the first lookup.

use super::{ServiceError, ServiceResult, VectorIndex, VectorMatch, VectorRecord};
use crate::config::IndexConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const API_VERSION: &str = "2024-07";

/// Polls made while waiting for a new index to become ready
const READY_POLLS: u32 = 30;

/// Client for a single named Pinecone index
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    config: IndexConfig,
    ready_poll: Duration,
    host: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

impl PineconeIndex {
    pub fn new(client: Client, api_key: impl Into<String>, config: &IndexConfig) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            config: config.clone(),
            ready_poll: Duration::from_secs(1),
            host: Mutex::new(None),
        }
    }

    /// Sets the wait between readiness polls after creating an index
    pub fn with_ready_poll(mut self, ready_poll: Duration) -> Self {
        self.ready_poll = ready_poll;
        self
    }

    fn control_url(&self, path: &str) -> String {
        format!("{}{}", self.config.control_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    /// Fetches the index description; `None` if the index does not exist
    async fn describe(&self) -> ServiceResult<Option<IndexDescription>> {
        let url = self.control_url(&format!("/indexes/{}", self.config.index_name));
        let response = self.request(reqwest::Method::GET, url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn create(&self) -> ServiceResult<()> {
        let body = json!({
            "name": self.config.index_name,
            "dimension": self.config.dimension,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": self.config.cloud,
                    "region": self.config.region,
                }
            }
        });

        let response = self
            .request(reqwest::Method::POST, self.control_url("/indexes"))
            .json(&body)
            .send()
            .await?;

        // Someone else created it first
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }
        Ok(())
    }

    /// Returns the data-plane base URL, looking it up once
    async fn data_url(&self) -> ServiceResult<String> {
        let mut host = self.host.lock().await;
        if let Some(url) = host.as_ref() {
            return Ok(url.clone());
        }

        let description = self.describe().await?.ok_or_else(|| {
            ServiceError::UnexpectedResponse(format!(
                "index {} does not exist",
                self.config.index_name
            ))
        })?;
        let url = host_url(&description.host);
        *host = Some(url.clone());
        Ok(url)
    }
}

/// Turns a reported host into a base URL
fn host_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn ensure_index(&self) -> ServiceResult<()> {
        if let Some(description) = self.describe().await? {
            if description.status.ready {
                tracing::debug!("Index {} exists", self.config.index_name);
                return Ok(());
            }
        } else {
            tracing::info!(
                "Creating index {} (dimension {})",
                self.config.index_name,
                self.config.dimension
            );
            self.create().await?;
        }

        for _ in 0..READY_POLLS {
            if let Some(description) = self.describe().await? {
                if description.status.ready {
                    *self.host.lock().await = Some(host_url(&description.host));
                    return Ok(());
                }
            }
            tokio::time::sleep(self.ready_poll).await;
        }

        Err(ServiceError::UnexpectedResponse(format!(
            "index {} did not become ready",
            self.config.index_name
        )))
    }

    async fn delete_index(&self) -> ServiceResult<()> {
        let url = self.control_url(&format!("/indexes/{}", self.config.index_name));
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        *self.host.lock().await = None;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!("Index {} did not exist", self.config.index_name);
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }
        tracing::info!("Deleted index {}", self.config.index_name);
        Ok(())
    }

    async fn upsert(&self, vectors: &[VectorRecord]) -> ServiceResult<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        let url = format!("{}/vectors/upsert", self.data_url().await?);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&UpsertRequest { vectors })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> ServiceResult<Vec<VectorMatch>> {
        let url = format!("{}/query", self.data_url().await?);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&QueryRequest {
                vector,
                top_k,
                include_metadata: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }

        let body: QueryResponse = response.json().await?;
        Ok(body.matches)
    }
}
