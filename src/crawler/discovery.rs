//! Discovery loop - breadth-first traversal of the navigation tree
//!
//! The loop walks the folder pages of the site one at a time and records
//! every document link it has not seen before. It is driven as an explicit
//! state machine: each [`Step`] carries exactly the data its phase needs, and
//! [`Discovery::advance`] consumes one step and produces the next.
//!
//! Resume works by replaying the checkpoints: visited folders are never
//! fetched again and known sections are never written twice.

use crate::config::{Config, SiteConfig};
use crate::crawler::fetcher::{
    build_http_client, FetchRequest, HttpFetcher, PageFetcher, ReadyCondition,
};
use crate::crawler::parser::{apply_links, PageLinks};
use crate::state::{CrawlState, DiscoveryPhase};
use crate::storage::{DiscoveredSection, JsonlLog};
use crate::url::{canonical_url, parse_base};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// One state of the discovery loop together with its payload
#[derive(Debug)]
pub enum Step {
    Idle,
    Fetching(String),
    Classifying { url: String, html: String },
    Persisting { url: String, sections: Vec<String> },
    Draining(String),
    Done,
}

impl Step {
    /// Returns the phase this step belongs to
    pub fn phase(&self) -> DiscoveryPhase {
        match self {
            Self::Idle => DiscoveryPhase::Idle,
            Self::Fetching(_) => DiscoveryPhase::Fetching,
            Self::Classifying { .. } => DiscoveryPhase::Classifying,
            Self::Persisting { .. } => DiscoveryPhase::Persisting,
            Self::Draining(_) => DiscoveryPhase::Draining,
            Self::Done => DiscoveryPhase::Done,
        }
    }
}

/// Totals of a finished discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Folder pages fetched and marked visited
    pub pages_visited: usize,
    /// Folder pages whose fetch failed
    pub pages_failed: usize,
    /// New sections appended to the discovered log
    pub sections_found: usize,
    /// Navigation links added to the frontier
    pub folders_enqueued: usize,
}

/// Breadth-first discovery over the navigation pages of one site
pub struct Discovery {
    site: SiteConfig,
    base: Url,
    state: CrawlState,
    sections: JsonlLog<DiscoveredSection>,
    fetcher: Arc<dyn PageFetcher>,
    ready: ReadyCondition,
    page_delay: Duration,
    summary: DiscoverySummary,
}

impl Discovery {
    /// Creates a discovery run, loading checkpoints from the data directory
    ///
    /// The start URL is queued unless a previous run already visited it.
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `fetcher` - Page fetcher used for every folder page
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        std::fs::create_dir_all(&config.output.data_dir)?;

        let base = parse_base(&config.site.base_url)?;
        let discovered_path = config.output.discovered_path();
        let mut state = CrawlState::load(&config.output.visited_path(), &discovered_path)?;

        // Links found on pages are canonical, so the start page must be too
        let mut site = config.site.clone();
        site.start_url = canonical_url(&site.start_url)?;

        if !state.enqueue(&site.start_url) {
            tracing::info!(
                "Start page {} already visited, nothing left to discover",
                site.start_url
            );
        }

        Ok(Self {
            site,
            base,
            state,
            sections: JsonlLog::open(discovered_path)?,
            fetcher,
            ready: ReadyCondition::MoreAnchorsThan(config.crawler.min_link_count),
            page_delay: Duration::from_millis(config.crawler.page_delay_ms),
            summary: DiscoverySummary::default(),
        })
    }

    /// Read access to the crawl state
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Runs the loop until the frontier is exhausted
    pub async fn run(mut self) -> Result<DiscoverySummary> {
        let start_time = Instant::now();
        let mut step = Step::Idle;

        loop {
            let current = step.phase();
            let next = self.advance(step).await?;
            debug_assert!(
                current.can_transition_to(next.phase()),
                "illegal discovery transition {} -> {}",
                current,
                next.phase()
            );
            if next.phase().is_terminal() {
                break;
            }
            step = next;
        }

        tracing::info!(
            "Discovery completed: {} pages visited, {} failed, {} new sections in {:?}",
            self.summary.pages_visited,
            self.summary.pages_failed,
            self.summary.sections_found,
            start_time.elapsed()
        );

        Ok(self.summary)
    }

    /// Consumes one step and returns the next one
    pub async fn advance(&mut self, step: Step) -> Result<Step> {
        let next = match step {
            Step::Idle => match self.state.dequeue() {
                Some(url) => Step::Fetching(url),
                None => {
                    tracing::info!("Frontier is empty, discovery complete");
                    Step::Done
                }
            },

            Step::Fetching(url) => {
                tracing::debug!("Visiting folder: {}", url);
                let outcome = self
                    .fetcher
                    .fetch(FetchRequest::new(url.as_str(), self.ready.clone()))
                    .await;

                if outcome.success {
                    Step::Classifying {
                        url,
                        html: outcome.html,
                    }
                } else {
                    tracing::warn!("Failed to load folder {}, skipping", url);
                    self.summary.pages_failed += 1;
                    Step::Idle
                }
            }

            Step::Classifying { url, html } => {
                let links = PageLinks::parse(&html);
                let outcome = apply_links(
                    &mut self.state,
                    &url,
                    links.classify(&self.base, &self.site),
                );

                if outcome.enqueued > 0 {
                    tracing::info!("Added {} new folders from {}", outcome.enqueued, url);
                }
                self.summary.folders_enqueued += outcome.enqueued;

                Step::Persisting {
                    url,
                    sections: outcome.new_sections,
                }
            }

            Step::Persisting { url, sections } => {
                for section_url in sections {
                    self.sections
                        .append(&DiscoveredSection::new(section_url.as_str(), url.as_str()))?;
                    self.state.record_section(&section_url);
                    self.summary.sections_found += 1;
                }
                Step::Draining(url)
            }

            Step::Draining(url) => {
                self.state.mark_visited(&url)?;
                self.summary.pages_visited += 1;

                if self.summary.pages_visited % 10 == 0 {
                    tracing::info!(
                        "Progress: {} folders visited, {} queued, {} sections known",
                        self.state.visited_count(),
                        self.state.frontier_size(),
                        self.state.section_count()
                    );
                }

                if !self.page_delay.is_zero() {
                    tokio::time::sleep(self.page_delay).await;
                }
                Step::Idle
            }

            Step::Done => Step::Done,
        };

        Ok(next)
    }
}

/// Runs discovery with the bundled HTTP fetcher
///
/// # Example
///
/// ```no_run
/// use reg_harvest::config::load_config;
/// use reg_harvest::crawler::run_discovery;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_discovery(&config).await?;
/// println!("{} new sections", summary.sections_found);
/// # Ok(())
/// # }
/// ```
pub async fn run_discovery(config: &Config) -> Result<DiscoverySummary> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(client));
    Discovery::new(config, fetcher)?.run().await
}
