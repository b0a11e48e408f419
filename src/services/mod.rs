//! Downstream collaborators: embeddings, vector index, and chat completion
//!
//! The indexer and the agent only see the traits defined here. The bundled
//! implementations talk to the Google Generative Language REST API
//! ([`GeminiClient`]) and to Pinecone ([`PineconeIndex`]).

mod gemini;
mod pinecone;
mod retry;

pub use gemini::GeminiClient;
pub use pinecone::PineconeIndex;
pub use retry::{with_rate_limit_retry, RetryPolicy};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors reported by a downstream service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ServiceError {
    /// Returns true if the error signals a rate limit or exhausted quota
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, body } => *status == 429 || body.contains("RESOURCE_EXHAUSTED"),
            Self::Http(e) => e.status().map_or(false, |s| s.as_u16() == 429),
            Self::UnexpectedResponse(text) => {
                text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
            }
        }
    }

    /// Builds an error from a non-success response
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 429 {
            Self::RateLimited(body)
        } else {
            Self::Api { status, body }
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// String metadata stored next to each vector
pub type Metadata = BTreeMap<String, String>;

/// One vector to store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// One query hit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Turns text into an embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;
}

/// A similarity index over embedded sections
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the index if it does not exist yet
    async fn ensure_index(&self) -> ServiceResult<()>;

    /// Deletes the index; a missing index is not an error
    async fn delete_index(&self) -> ServiceResult<()>;

    async fn upsert(&self, vectors: &[VectorRecord]) -> ServiceResult<()>;

    /// Returns the `top_k` nearest vectors with their metadata
    async fn query(&self, vector: &[f32], top_k: usize) -> ServiceResult<Vec<VectorMatch>>;
}

/// Completes a prompt with a language model
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> ServiceResult<String>;
}
