//! Integration tests for the downstream service clients
//!
//! wiremock stands in for both the Generative Language API and Pinecone.

use reg_harvest::config::IndexConfig;
use reg_harvest::services::{
    ChatModel, Embedder, GeminiClient, Metadata, PineconeIndex, VectorIndex, VectorRecord,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini(server: &MockServer) -> GeminiClient {
    GeminiClient::new(
        reqwest::Client::new(),
        "google-key",
        server.uri(),
        "models/text-embedding-004",
        "models/gemini-flash-latest",
    )
}

fn pinecone(server: &MockServer) -> PineconeIndex {
    let config = IndexConfig {
        control_url: server.uri(),
        ..Default::default()
    };
    PineconeIndex::new(reqwest::Client::new(), "pinecone-key", &config)
        .with_ready_poll(Duration::from_millis(10))
}

async fn mount_ready_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/indexes/ccr-regulations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ccr-regulations",
            "host": server.uri(),
            "status": { "ready": true, "state": "Ready" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_embed_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:embedContent"))
        .and(header("x-goog-api-key", "google-key"))
        .and(body_partial_json(json!({
            "model": "models/text-embedding-004",
            "content": { "parts": [{ "text": "22 CCR § 1: Text" }] }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embedding": { "values": [0.25, -0.5, 1.0] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let values = gemini(&server).embed("22 CCR § 1: Text").await.unwrap();
    assert_eq!(values, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn test_quota_exhaustion_is_a_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let error = gemini(&server).embed("text").await.unwrap_err();
    assert!(error.is_rate_limit());
}

#[tokio::test]
async fn test_generate_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-flash-latest:generateContent"))
        .and(body_partial_json(json!({
            "generationConfig": { "temperature": 0.5 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Section 1 " }, { "text": "applies." }] }
            }]
        })))
        .mount(&server)
        .await;

    let answer = gemini(&server).complete("prompt", 0.5).await.unwrap();
    assert_eq!(answer, "Section 1 applies.");
}

#[tokio::test]
async fn test_generate_without_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let error = gemini(&server).complete("prompt", 0.3).await.unwrap_err();
    assert!(!error.is_rate_limit());
}

#[tokio::test]
async fn test_ensure_existing_index() {
    let server = MockServer::start().await;
    mount_ready_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    pinecone(&server).ensure_index().await.unwrap();
}

#[tokio::test]
async fn test_ensure_creates_missing_index() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes/ccr-regulations"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_ready_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(header("Api-Key", "pinecone-key"))
        .and(body_partial_json(json!({
            "name": "ccr-regulations",
            "dimension": 768,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    pinecone(&server).ensure_index().await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_index_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/indexes/ccr-regulations"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    pinecone(&server).delete_index().await.unwrap();
}

#[tokio::test]
async fn test_upsert_and_query() {
    let server = MockServer::start().await;
    mount_ready_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(body_partial_json(json!({
            "vectors": [{ "id": "https://a/Document/1", "metadata": { "citation": "22 CCR § 1" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "topK": 3, "includeMetadata": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "https://a/Document/1", "score": 0.9, "metadata": { "text": "Body" } }
            ],
            "namespace": ""
        })))
        .mount(&server)
        .await;

    let index = pinecone(&server);
    let mut metadata = Metadata::new();
    metadata.insert("citation".to_string(), "22 CCR § 1".to_string());
    index
        .upsert(&[VectorRecord {
            id: "https://a/Document/1".to_string(),
            values: vec![0.1, 0.2],
            metadata,
        }])
        .await
        .unwrap();

    let matches = index.query(&[0.1, 0.2], 3).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].metadata["text"], "Body");
}
