//! Google Generative Language REST client
//!
//! Used for both embeddings (`:embedContent`) and answer generation
//! (`:generateContent`). The API key travels in the `x-goog-api-key` header.

use super::{ChatModel, Embedder, ServiceError, ServiceResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for one embedding model and one chat model
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_url: String,
    embedding_model: String,
    chat_model: String,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Creates a client
    ///
    /// Model names are used as given, e.g. `models/text-embedding-004`.
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        embedding_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            chat_model: chat_model.into(),
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.api_url, model, method)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(self.endpoint(&self.embedding_model, "embedContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }

        let body: EmbedResponse = response.json().await?;
        Ok(body.embedding.values)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> ServiceResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let response = self
            .client
            .post(self.endpoint(&self.chat_model, "generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::from_response(response).await);
        }

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .ok_or_else(|| ServiceError::UnexpectedResponse("no candidates returned".to_string()))?;

        Ok(text)
    }
}
