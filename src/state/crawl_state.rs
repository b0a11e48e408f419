//! Frontier and checkpoint state owned by a discovery run

use crate::storage::{read_records, DiscoveredSection, LineLog, LogScan, StorageResult};
use std::collections::{HashSet, VecDeque};
use std::path::Path;

/// Everything the discovery loop knows about the site so far
///
/// - a FIFO frontier of navigation URLs with a pending set guarding against
///   duplicate queueing
/// - the visited set, written through to `visited_urls.txt` on every mark
/// - the set of leaf URLs already present in the discovered-sections log
pub struct CrawlState {
    frontier: VecDeque<String>,
    pending: HashSet<String>,
    visited: HashSet<String>,
    existing_sections: HashSet<String>,
    visited_log: LineLog,
}

impl CrawlState {
    /// Loads the visited checkpoint and the known sections
    ///
    /// Malformed lines in the sections log are skipped.
    ///
    /// # Arguments
    ///
    /// * `visited_path` - The visited-page checkpoint
    /// * `sections_path` - The discovered-sections log
    pub fn load(visited_path: &Path, sections_path: &Path) -> StorageResult<Self> {
        let visited = LineLog::load(visited_path)?;
        let scan: LogScan<DiscoveredSection> = read_records(sections_path)?;
        let existing_sections: HashSet<String> = scan
            .records
            .into_iter()
            .map(|section| section.section_url)
            .collect();

        if !existing_sections.is_empty() {
            tracing::info!(
                "{} sections already saved, skipping these",
                existing_sections.len()
            );
        }
        tracing::info!("Resuming... {} folders visited", visited.len());

        Ok(Self {
            frontier: VecDeque::new(),
            pending: HashSet::new(),
            visited,
            existing_sections,
            visited_log: LineLog::open(visited_path)?,
        })
    }

    /// Adds a URL to the tail of the frontier
    ///
    /// Returns false if the URL was already visited or already queued.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.visited.contains(url) || self.pending.contains(url) {
            return false;
        }
        self.pending.insert(url.to_string());
        self.frontier.push_back(url.to_string());
        true
    }

    /// Pops the next URL in breadth-first order
    ///
    /// Returns None once the frontier is exhausted.
    pub fn dequeue(&mut self) -> Option<String> {
        while let Some(url) = self.frontier.pop_front() {
            self.pending.remove(&url);
            if !self.visited.contains(&url) {
                return Some(url);
            }
        }
        None
    }

    /// Records a page as visited, in memory and in the durable checkpoint
    pub fn mark_visited(&mut self, url: &str) -> StorageResult<()> {
        if self.visited.insert(url.to_string()) {
            self.visited_log.append(url)?;
        }
        Ok(())
    }

    /// Remembers a section URL; returns false if it was already known
    pub fn record_section(&mut self, url: &str) -> bool {
        self.existing_sections.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn is_queued(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    pub fn knows_section(&self, url: &str) -> bool {
        self.existing_sections.contains(url)
    }

    /// Returns the number of URLs waiting in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn section_count(&self) -> usize {
        self.existing_sections.len()
    }
}
