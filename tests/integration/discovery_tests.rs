//! Integration tests for the discovery loop
//!
//! The site is an in-memory page graph served by a fake fetcher, so these
//! tests exercise the full loop including the checkpoint files.

use async_trait::async_trait;
use reg_harvest::config::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use reg_harvest::crawler::{Discovery, FetchOutcome, FetchRequest, PageFetcher, Step};
use reg_harvest::storage::{read_records, DiscoveredSection, LogScan};
use reg_harvest::DiscoveryPhase;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BASE: &str = "https://govt.westlaw.com";

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// Serves a fixed set of pages; anything else fails
#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn with_page(mut self, path: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>\n", href))
            .collect();
        let html = format!("<html><body>{}</body></html>", anchors);
        self.pages.insert(url(path), html);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        self.requests.lock().unwrap().push(request.url.clone());
        match self.pages.get(&request.url) {
            Some(html) if request.ready.is_met(html) => {
                FetchOutcome::loaded(request.url, html.clone())
            }
            _ => FetchOutcome::failed(request.url),
        }
    }
}

/// Creates a test configuration rooted in a temporary data directory
fn create_test_config(data_dir: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: BASE.to_string(),
            start_url: url("/calregs/Browse/Home/California/CodeofRegulations"),
            navigation_pattern: "/calregs/Browse/".to_string(),
            document_pattern: "/calregs/Document/".to_string(),
        },
        crawler: CrawlerConfig {
            page_delay_ms: 0,
            batch_delay_ms: 0,
            min_link_count: 0,
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

/// Home links to two titles; title 8 is broken
fn regulations_site() -> FakeSite {
    FakeSite::default()
        .with_page(
            "/calregs/Browse/Home/California/CodeofRegulations",
            &[
                "/calregs/Browse/Home/California/CodeofRegulations",
                "/calregs/Browse/Home/California/CodeofRegulations?guid=T22",
                "/calregs/Browse/Home/California/CodeofRegulations?guid=T8",
                "/calregs/Document/IA",
                "/calregs/Document/IB",
                "/calregs/Help",
                "mailto:help@example.com",
            ],
        )
        .with_page(
            "/calregs/Browse/Home/California/CodeofRegulations?guid=T22",
            &[
                "/calregs/Browse/Home/California/CodeofRegulations",
                "/calregs/Document/IA",
                "/calregs/Document/IC",
                "/calregs/Browse/Home/California/CodeofRegulations?guid=T22D1",
            ],
        )
        .with_page(
            "/calregs/Browse/Home/California/CodeofRegulations?guid=T22D1",
            &["/calregs/Document/IC", "/calregs/Document/ID"],
        )
}

fn discovered(data_dir: &Path) -> Vec<DiscoveredSection> {
    let scan: LogScan<DiscoveredSection> =
        read_records(&data_dir.join("discovered_section_urls.jsonl")).unwrap();
    scan.records
}

#[tokio::test]
async fn test_full_discovery() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let site = Arc::new(regulations_site());

    let summary = Discovery::new(&config, site.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.sections_found, 4);

    // Every leaf recorded once, in discovery order
    let urls: Vec<String> = discovered(dir.path())
        .into_iter()
        .map(|s| s.section_url)
        .collect();
    assert_eq!(
        urls,
        vec![
            url("/calregs/Document/IA"),
            url("/calregs/Document/IB"),
            url("/calregs/Document/IC"),
            url("/calregs/Document/ID"),
        ]
    );

    // Breadth-first: both titles before the division
    let requests = site.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[1].ends_with("guid=T22"));
    assert!(requests[2].ends_with("guid=T8"));
    assert!(requests[3].ends_with("guid=T22D1"));

    // The failed folder is not checkpointed
    let visited = std::fs::read_to_string(dir.path().join("visited_urls.txt")).unwrap();
    assert_eq!(visited.lines().count(), 3);
    assert!(!visited.contains("guid=T8"));
}

#[tokio::test]
async fn test_records_carry_source_page_and_status() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    Discovery::new(&config, Arc::new(regulations_site()))
        .unwrap()
        .run()
        .await
        .unwrap();

    let line = std::fs::read_to_string(dir.path().join("discovered_section_urls.jsonl"))
        .unwrap()
        .lines()
        .last()
        .unwrap()
        .to_string();
    let json: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(json["section_url"], url("/calregs/Document/ID"));
    assert_eq!(
        json["source_page"],
        url("/calregs/Browse/Home/California/CodeofRegulations?guid=T22D1")
    );
    assert_eq!(json["status"], "discovered");
    assert!(json["retrieved_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    Discovery::new(&config, Arc::new(regulations_site()))
        .unwrap()
        .run()
        .await
        .unwrap();
    let before = std::fs::read_to_string(dir.path().join("discovered_section_urls.jsonl")).unwrap();

    let site = Arc::new(regulations_site());
    let summary = Discovery::new(&config, site.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.sections_found, 0);
    assert!(site.requests().is_empty());
    let after = std::fs::read_to_string(dir.path().join("discovered_section_urls.jsonl")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failed_start_page_is_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    let summary = Discovery::new(&config, Arc::new(FakeSite::default()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_visited, 0);

    let summary = Discovery::new(&config, Arc::new(regulations_site()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.sections_found, 4);
}

#[tokio::test]
async fn test_known_sections_are_not_rewritten() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("discovered_section_urls.jsonl"),
        format!(
            "{{\"section_url\":\"{}\",\"source_page\":\"x\",\"status\":\"discovered\",\"retrieved_at\":\"t\"}}\nnot json\n",
            url("/calregs/Document/IA")
        ),
    )
    .unwrap();
    let config = create_test_config(dir.path());

    let summary = Discovery::new(&config, Arc::new(regulations_site()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.sections_found, 3);
    let count_a = discovered(dir.path())
        .iter()
        .filter(|s| s.section_url == url("/calregs/Document/IA"))
        .count();
    assert_eq!(count_a, 1);
}

#[tokio::test]
async fn test_readiness_threshold_applies() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    // Home has seven anchors
    config.crawler.min_link_count = 7;

    let summary = Discovery::new(&config, Arc::new(regulations_site()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 0);
    assert_eq!(summary.pages_failed, 1);
}

#[tokio::test]
async fn test_step_sequence_for_one_page() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let site = Arc::new(
        FakeSite::default().with_page(
            "/calregs/Browse/Home/California/CodeofRegulations",
            &["/calregs/Document/IA"],
        ),
    );
    let mut discovery = Discovery::new(&config, site).unwrap();

    let mut phases = Vec::new();
    let mut step = Step::Idle;
    loop {
        step = discovery.advance(step).await.unwrap();
        phases.push(step.phase());
        if step.phase().is_terminal() {
            break;
        }
    }

    assert_eq!(
        phases,
        vec![
            DiscoveryPhase::Fetching,
            DiscoveryPhase::Classifying,
            DiscoveryPhase::Persisting,
            DiscoveryPhase::Draining,
            DiscoveryPhase::Idle,
            DiscoveryPhase::Done,
        ]
    );
    assert!(discovery
        .state()
        .is_visited(&url("/calregs/Browse/Home/California/CodeofRegulations")));
    assert!(discovery.state().knows_section(&url("/calregs/Document/IA")));
}

#[tokio::test]
async fn test_start_url_is_canonicalized() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.site.start_url = "https://GOVT.westlaw.com:443/calregs/Browse/Home".to_string();

    let site = Arc::new(
        FakeSite::default().with_page(
            "/calregs/Browse/Home",
            &["/calregs/Browse/Home", "/calregs/Document/IA"],
        ),
    );
    let summary = Discovery::new(&config, site.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.folders_enqueued, 0);
    assert_eq!(site.requests(), vec![url("/calregs/Browse/Home")]);

    let visited = std::fs::read_to_string(dir.path().join("visited_urls.txt")).unwrap();
    assert_eq!(visited, format!("{}\n", url("/calregs/Browse/Home")));

    // A rerun recognises the visited start page
    let site = Arc::new(FakeSite::default());
    Discovery::new(&config, site.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert!(site.requests().is_empty());
}
