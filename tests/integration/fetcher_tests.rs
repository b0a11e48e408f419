//! Integration tests for the HTTP fetcher
//!
//! These tests use wiremock to serve pages and check what the fetcher sends
//! and how it reports each kind of failure.

use reg_harvest::config::UserAgentConfig;
use reg_harvest::crawler::{
    build_http_client, content_ready, fetch_to_file, FetchRequest, HttpFetcher, PageFetcher,
    ReadyCondition,
};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_fetcher(timeout: Duration) -> HttpFetcher {
    let config = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    HttpFetcher::new(build_http_client(&config, timeout).expect("Failed to build client"))
}

fn folder_page(links: usize) -> String {
    let anchors: String = (0..links)
        .map(|i| format!("<a href=\"/calregs/Browse/{}\">{}</a>", i, i))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

#[tokio::test]
async fn test_fetch_ready_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calregs/Browse/Home"))
        .and(header("cache-control", "no-cache"))
        .and(header("user-agent", "TestBot/1.0.0 (+https://example.com/contact; test@example.com)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(folder_page(6))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/calregs/Browse/Home", mock_server.uri());
    let outcome = create_fetcher(Duration::from_secs(5))
        .fetch(FetchRequest::new(url.as_str(), ReadyCondition::MoreAnchorsThan(5)))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.url, url);
    assert!(outcome.html.contains("/calregs/Browse/5"));
}

#[tokio::test]
async fn test_too_few_anchors_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(folder_page(5)))
        .mount(&mock_server)
        .await;

    let outcome = create_fetcher(Duration::from_secs(5))
        .fetch(FetchRequest::new(
            format!("{}/calregs/Browse/Home", mock_server.uri()),
            ReadyCondition::MoreAnchorsThan(5),
        ))
        .await;

    assert!(!outcome.success);
    assert!(outcome.html.is_empty());
}

#[tokio::test]
async fn test_http_error_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string(folder_page(10)))
        .mount(&mock_server)
        .await;

    let outcome = create_fetcher(Duration::from_secs(5))
        .fetch(FetchRequest::new(mock_server.uri(), ReadyCondition::Immediate))
        .await;

    assert!(!outcome.success);
}

#[tokio::test]
async fn test_timeout_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(folder_page(10))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let outcome = create_fetcher(Duration::from_millis(200))
        .fetch(FetchRequest::new(mock_server.uri(), ReadyCondition::Immediate))
        .await;

    assert!(!outcome.success);
}

#[tokio::test]
async fn test_cache_bypass_can_be_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(header_exists("cache-control"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let mut request = FetchRequest::new(mock_server.uri(), ReadyCondition::Immediate);
    request.bypass_cache = false;
    let outcome = create_fetcher(Duration::from_secs(5)).fetch(request).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_fetch_to_file_saves_document() {
    let mock_server = MockServer::start().await;
    let html = "<html><body><div id=\"co_document\"><p>Text</p></div></body></html>";

    Mock::given(method("GET"))
        .and(path("/calregs/Document/I1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("pages").join("debug_page.html");
    let fetcher = create_fetcher(Duration::from_secs(5));

    let written = fetch_to_file(
        &fetcher,
        &format!("{}/calregs/Document/I1", mock_server.uri()),
        &out,
    )
    .await
    .unwrap();

    assert_eq!(written, Some(html.len()));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), html);
}

#[tokio::test]
async fn test_fetch_to_file_reports_unready_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>loading</body></html>"),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("debug_page.html");
    let fetcher = create_fetcher(Duration::from_secs(5));

    let written = fetch_to_file(&fetcher, &mock_server.uri(), &out).await.unwrap();

    assert_eq!(written, None);
    assert!(!out.exists());
    // The content condition is what fetch_to_file waits for
    assert!(!content_ready().is_met("<html><body>loading</body></html>"));
}
