//! Crawler module for site traversal and section extraction
//!
//! This module contains the two crawl loops and their building blocks:
//! - page fetching behind the [`PageFetcher`] trait
//! - link classification for navigation pages
//! - breadth-first discovery of document links
//! - batched, resumable extraction of document pages

mod batch;
mod discovery;
mod fetcher;
mod parser;

pub use batch::{content_ready, pending_urls, run_extraction, BatchExtractor, ExtractionSummary};
pub use discovery::{run_discovery, Discovery, DiscoverySummary, Step};
pub use fetcher::{
    build_http_client, FetchOutcome, FetchRequest, HttpFetcher, PageFetcher, ReadyCondition,
    SCROLL_SCRIPT,
};
pub use parser::{apply_links, ClassifiedLink, LinkOutcome, PageLinks};

use crate::config::Config;
use std::path::Path;
use std::time::Duration;

/// Fetches a single page and writes its HTML to a file
///
/// Useful for checking what the selectors will see on a given page.
///
/// # Returns
///
/// * `Ok(Some(len))` - The page loaded and `len` bytes were written
/// * `Ok(None)` - The fetch failed or the page never became ready
pub async fn fetch_one(config: &Config, url: &str, out: &Path) -> crate::Result<Option<usize>> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;
    fetch_to_file(&HttpFetcher::new(client), url, out).await
}

/// Same as [`fetch_one`] with an explicit fetcher
pub async fn fetch_to_file(
    fetcher: &dyn PageFetcher,
    url: &str,
    out: &Path,
) -> crate::Result<Option<usize>> {
    let outcome = fetcher.fetch(FetchRequest::new(url, content_ready())).await;
    if !outcome.success {
        tracing::warn!("Failed to load {}", url);
        return Ok(None);
    }

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(out, &outcome.html)?;
    tracing::info!("Saved {} bytes from {} to {}", outcome.html.len(), outcome.url, out.display());
    Ok(Some(outcome.html.len()))
}
