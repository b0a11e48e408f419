//! Batched extraction of discovered sections
//!
//! Sections still missing a complete record are fetched in fixed-size groups.
//! Every fetch of a group runs concurrently on the current task, and nothing
//! from a group is written until all of its fetches have resolved.

use crate::config::Config;
use crate::crawler::fetcher::{
    build_http_client, FetchRequest, HttpFetcher, PageFetcher, ReadyCondition,
};
use crate::extract::{extract_record, CONTENT_SELECTORS};
use crate::storage::{
    read_records, DiscoveredSection, ExtractedRecord, JsonlLog, LogScan, Record,
};
use crate::{HarvestError, Result};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Totals of a finished extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Sections fetched in this run
    pub attempted: usize,
    /// Records appended to the extracted log
    pub written: usize,
    /// Sections whose fetch failed
    pub fetch_failures: usize,
    /// Sections whose page had no content container
    pub content_not_found: usize,
}

/// Readiness condition for document pages
pub fn content_ready() -> ReadyCondition {
    ReadyCondition::AnySelector(CONTENT_SELECTORS.iter().map(|s| s.to_string()).collect())
}

/// Lists the sections that still need extraction, in discovery order
///
/// A section is pending unless the extracted log already holds a complete
/// record for it. Incomplete records do not count, so those pages are
/// fetched again.
///
/// # Arguments
///
/// * `discovered_path` - The discovered-sections log (must exist)
/// * `extracted_path` - The extracted-records log (may be missing)
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Pending section URLs without duplicates
/// * `Err(HarvestError::MissingInput)` - The discovered log does not exist
pub fn pending_urls(discovered_path: &Path, extracted_path: &Path) -> Result<Vec<String>> {
    if !discovered_path.exists() {
        return Err(HarvestError::MissingInput(discovered_path.to_path_buf()));
    }

    let discovered: LogScan<DiscoveredSection> = read_records(discovered_path)?;
    if discovered.malformed > 0 {
        tracing::warn!(
            "Skipped {} malformed lines in {}",
            discovered.malformed,
            discovered_path.display()
        );
    }

    let extracted: LogScan<ExtractedRecord> = read_records(extracted_path)?;
    let complete: HashSet<&str> = extracted
        .records
        .iter()
        .filter(|record| record.is_complete())
        .map(Record::identity)
        .collect();

    let mut seen = HashSet::new();
    let pending: Vec<String> = discovered
        .records
        .iter()
        .map(Record::identity)
        .filter(|url| seen.insert(*url))
        .filter(|url| !complete.contains(url))
        .map(str::to_string)
        .collect();

    tracing::info!(
        "{} sections discovered, {} already complete, {} pending",
        seen.len(),
        seen.len() - pending.len(),
        pending.len()
    );

    Ok(pending)
}

/// Fetches and extracts pending sections in concurrent batches
pub struct BatchExtractor {
    fetcher: Arc<dyn PageFetcher>,
    output: JsonlLog<ExtractedRecord>,
    ready: ReadyCondition,
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchExtractor {
    /// Creates an extractor appending to the configured extracted log
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            output: JsonlLog::open(config.output.extracted_path())?,
            ready: content_ready(),
            batch_size: config.crawler.batch_size.max(1),
            batch_delay: Duration::from_millis(config.crawler.batch_delay_ms),
        })
    }

    /// Processes every URL, one batch at a time
    pub async fn run(&mut self, urls: &[String]) -> Result<ExtractionSummary> {
        let mut summary = ExtractionSummary::default();
        let total_batches = urls.len().div_ceil(self.batch_size);
        let start_time = Instant::now();

        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            tracing::debug!("Batch {}/{}: {} sections", index + 1, total_batches, batch.len());
            let records = self.process_batch(batch, &mut summary).await;
            self.output.append_all(&records)?;
            summary.written += records.len();

            tracing::info!(
                "Progress: {}/{} sections processed, {} written",
                summary.attempted,
                urls.len(),
                summary.written
            );
        }

        tracing::info!(
            "Extraction completed: {} written to {}, {} fetch failures, {} without content in {:?}",
            summary.written,
            self.output.path().display(),
            summary.fetch_failures,
            summary.content_not_found,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Fetches one batch concurrently, then extracts every loaded page
    async fn process_batch(
        &self,
        batch: &[String],
        summary: &mut ExtractionSummary,
    ) -> Vec<ExtractedRecord> {
        let fetches = batch
            .iter()
            .map(|url| self.fetcher.fetch(FetchRequest::new(url.as_str(), self.ready.clone())));
        let outcomes = join_all(fetches).await;
        summary.attempted += batch.len();

        let mut records = Vec::with_capacity(batch.len());
        for (url, outcome) in batch.iter().zip(outcomes) {
            if !outcome.success {
                tracing::warn!("Failed to load section {}", url);
                summary.fetch_failures += 1;
                continue;
            }

            match extract_record(&outcome.html, url) {
                Ok(record) => {
                    tracing::debug!("Extracted {}", record.citation);
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    summary.content_not_found += 1;
                }
            }
        }
        records
    }
}

/// Runs extraction over every pending section with the bundled HTTP fetcher
pub async fn run_extraction(config: &Config) -> Result<ExtractionSummary> {
    let urls = pending_urls(
        &config.output.discovered_path(),
        &config.output.extracted_path(),
    )?;
    if urls.is_empty() {
        tracing::info!("Nothing to extract");
        return Ok(ExtractionSummary::default());
    }

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(client));
    BatchExtractor::new(config, fetcher)?.run(&urls).await
}
