//! Integration tests for batched extraction
//!
//! Document pages are served by in-memory fetchers. One of them holds a
//! fetch open until the test releases it, which makes the per-batch write
//! barrier observable.

use async_trait::async_trait;
use reg_harvest::config::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use reg_harvest::crawler::{
    pending_urls, run_extraction, BatchExtractor, FetchOutcome, FetchRequest, PageFetcher,
};
use reg_harvest::storage::{read_records, ExtractedRecord, LogScan};
use reg_harvest::HarvestError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

const BASE: &str = "https://govt.westlaw.com/calregs/Document/";

fn url(id: &str) -> String {
    format!("{}{}", BASE, id)
}

fn section_page(number: &str, heading: &str) -> String {
    format!(
        r#"<html><head><title>§ {n}. {h} | California Code of Regulations</title></head>
        <body>
          <div id="co_breadcrumb"><ul>
            <li>Home</li>
            <li>Title 22. Social Security</li>
            <li>Division 3. Health Care Services</li>
          </ul></div>
          <div id="co_document">
            <p>§ {n}. {h}</p>
            <p>Text of section {n}.</p>
          </div>
        </body></html>"#,
        n = number,
        h = heading
    )
}

/// Serves fixed pages; anything else fails
#[derive(Default)]
struct FakeDocuments {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
    /// Hand back pages even when the readiness condition is not met
    ignore_ready: bool,
}

impl FakeDocuments {
    fn with(mut self, id: &str, html: String) -> Self {
        self.pages.insert(url(id), html);
        self
    }
}

#[async_trait]
impl PageFetcher for FakeDocuments {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        self.requests.lock().unwrap().push(request.url.clone());
        match self.pages.get(&request.url) {
            Some(html) if self.ignore_ready || request.ready.is_met(html) => {
                FetchOutcome::loaded(request.url, html.clone())
            }
            _ => FetchOutcome::failed(request.url),
        }
    }
}

/// Holds the fetch of one URL open until released
struct GatedFetcher {
    inner: FakeDocuments,
    gated: String,
    arrived: Notify,
    release: Notify,
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        if request.url == self.gated {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        self.inner.fetch(request).await
    }
}

/// Creates a test configuration rooted in a temporary data directory
fn create_test_config(data_dir: &Path, batch_size: usize) -> Config {
    Config {
        site: SiteConfig {
            base_url: "https://govt.westlaw.com".to_string(),
            start_url: "https://govt.westlaw.com/calregs/Browse/Home".to_string(),
            navigation_pattern: "/calregs/Browse/".to_string(),
            document_pattern: "/calregs/Document/".to_string(),
        },
        crawler: CrawlerConfig {
            page_delay_ms: 0,
            batch_size,
            batch_delay_ms: 0,
            ..Default::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            data_dir: data_dir.to_path_buf(),
        },
        index: Default::default(),
        agent: Default::default(),
    }
}

fn write_discovered(data_dir: &Path, ids: &[&str]) {
    let lines: String = ids
        .iter()
        .map(|id| {
            format!(
                "{{\"section_url\":\"{}\",\"source_page\":\"p\",\"status\":\"discovered\",\"retrieved_at\":\"t\"}}\n",
                url(id)
            )
        })
        .collect();
    std::fs::write(data_dir.join("discovered_section_urls.jsonl"), lines).unwrap();
}

fn extracted(data_dir: &Path) -> Vec<ExtractedRecord> {
    let scan: LogScan<ExtractedRecord> =
        read_records(&data_dir.join("extracted_data.jsonl")).unwrap();
    scan.records
}

#[tokio::test]
async fn test_extracts_pending_sections() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 2);
    write_discovered(dir.path(), &["I1", "I2", "I3"]);

    let fetcher = Arc::new(
        FakeDocuments::default()
            .with("I1", section_page("51000", "Definitions"))
            .with("I2", section_page("51001", "Scope"))
            .with("I3", section_page("51002", "Applicability")),
    );
    let urls = pending_urls(
        &config.output.discovered_path(),
        &config.output.extracted_path(),
    )
    .unwrap();
    let summary = BatchExtractor::new(&config, fetcher)
        .unwrap()
        .run(&urls)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.written, 3);

    let records = extracted(dir.path());
    assert_eq!(records[0].citation, "22 CCR § 51000");
    assert_eq!(records[0].source_url, url("I1"));
    assert_eq!(records[0].division.as_deref(), Some("3. Health Care Services"));
    assert_eq!(records[2].section_heading.as_deref(), Some("Applicability"));
    assert!(records.iter().all(ExtractedRecord::is_complete));
}

#[tokio::test]
async fn test_incomplete_records_are_reprocessed() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 3);
    write_discovered(dir.path(), &["I1", "I2"]);

    let complete = ExtractedRecord {
        source_url: url("I1"),
        section_number: Some("51000".to_string()),
        content_markdown: "text".to_string(),
        ..Default::default()
    };
    let incomplete = ExtractedRecord {
        source_url: url("I2"),
        content_markdown: "text".to_string(),
        ..Default::default()
    };
    std::fs::write(
        config.output.extracted_path(),
        format!(
            "{}\n{}\n",
            serde_json::to_string(&complete).unwrap(),
            serde_json::to_string(&incomplete).unwrap()
        ),
    )
    .unwrap();

    let fetcher = Arc::new(
        FakeDocuments::default()
            .with("I1", section_page("51000", "Definitions"))
            .with("I2", section_page("51001", "Scope")),
    );
    let urls = pending_urls(
        &config.output.discovered_path(),
        &config.output.extracted_path(),
    )
    .unwrap();
    assert_eq!(urls, vec![url("I2")]);

    BatchExtractor::new(&config, fetcher.clone())
        .unwrap()
        .run(&urls)
        .await
        .unwrap();

    assert_eq!(*fetcher.requests.lock().unwrap(), vec![url("I2")]);
    let records = extracted(dir.path());
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].section_number.as_deref(), Some("51001"));

    // Now complete, so nothing is left
    let urls = pending_urls(
        &config.output.discovered_path(),
        &config.output.extracted_path(),
    )
    .unwrap();
    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_failures_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 3);

    let fetcher = Arc::new(
        FakeDocuments::default()
            .with("I1", section_page("1", "One"))
            .with(
                "I2",
                "<html><body><div id=\"co_other\">nothing</div></body></html>".to_string(),
            ),
    );
    let urls = vec![url("I1"), url("I2"), url("missing")];
    let summary = BatchExtractor::new(&config, fetcher)
        .unwrap()
        .run(&urls)
        .await
        .unwrap();

    // I2 never becomes ready, so it is a fetch failure like the missing page
    assert_eq!(summary.written, 1);
    assert_eq!(summary.fetch_failures, 2);
    assert_eq!(extracted(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_content_not_found_is_counted() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 3);

    // A fetcher that gave up waiting and returned whatever had rendered
    let html = "<html><body><div id=\"co_other\">text</div></body></html>";
    let fetcher = Arc::new(
        FakeDocuments {
            ignore_ready: true,
            ..Default::default()
        }
        .with("I1", html.to_string()),
    );
    let summary = BatchExtractor::new(&config, fetcher)
        .unwrap()
        .run(&[url("I1")])
        .await
        .unwrap();

    assert_eq!(summary.content_not_found, 1);
    assert_eq!(summary.written, 0);
}

#[tokio::test]
async fn test_no_write_before_batch_completes() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 3);
    let output = config.output.extracted_path();

    let fetcher = Arc::new(GatedFetcher {
        inner: FakeDocuments::default()
            .with("I1", section_page("1", "One"))
            .with("I2", section_page("2", "Two"))
            .with("I3", section_page("3", "Three")),
        gated: url("I2"),
        arrived: Notify::new(),
        release: Notify::new(),
    });

    let mut extractor = BatchExtractor::new(&config, fetcher.clone()).unwrap();
    let urls = vec![url("I1"), url("I2"), url("I3")];
    let task = tokio::spawn(async move { extractor.run(&urls).await });

    fetcher.arrived.notified().await;
    // Give the other two fetches time to finish
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(std::fs::read_to_string(&output).unwrap_or_default(), "");

    fetcher.release.notify_one();
    let summary = task.await.unwrap().unwrap();

    assert_eq!(summary.written, 3);
    let ids: Vec<String> = extracted(dir.path())
        .into_iter()
        .map(|r| r.source_url)
        .collect();
    assert_eq!(ids, vec![url("I1"), url("I2"), url("I3")]);
}

#[tokio::test]
async fn test_missing_discovered_log_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 3);

    let result = run_extraction(&config).await;
    assert!(matches!(result, Err(HarvestError::MissingInput(_))));
}
