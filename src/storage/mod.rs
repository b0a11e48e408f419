//! Storage module for persisting crawl data
//!
//! Everything the pipeline remembers lives in append-only files:
//! - `visited_urls.txt`: one navigation URL per line
//! - `discovered_section_urls.jsonl`: one [`DiscoveredSection`] per line
//! - `extracted_data.jsonl`: one [`ExtractedRecord`] per line
//! - `indexed_ids.txt`: one vector id per line
//!
//! Records are never rewritten in place, so a crashed run resumes by
//! replaying these files and skipping the identities they already contain.

mod checkpoint;
mod jsonl;
mod traits;

pub use checkpoint::LineLog;
pub use jsonl::{read_records, try_parse_record, JsonlLog, LogScan};
pub use traits::{Record, StorageError, StorageResult};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Returns the current UTC time in the format stored in every record
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lifecycle marker written with each discovered section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    #[default]
    Discovered,
}

/// A leaf URL found during discovery, not yet extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSection {
    pub section_url: String,
    #[serde(default)]
    pub source_page: String,
    #[serde(default)]
    pub status: SectionStatus,
    #[serde(default)]
    pub retrieved_at: String,
}

impl DiscoveredSection {
    pub fn new(section_url: impl Into<String>, source_page: impl Into<String>) -> Self {
        Self {
            section_url: section_url.into(),
            source_page: source_page.into(),
            status: SectionStatus::Discovered,
            retrieved_at: timestamp_now(),
        }
    }
}

impl Record for DiscoveredSection {
    fn identity(&self) -> &str {
        &self.section_url
    }
}

/// A regulation section extracted from its document page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedRecord {
    pub citation: String,
    pub source_url: String,
    pub retrieved_at: String,
    pub title_number: Option<String>,
    pub title_name: Option<String>,
    pub division: Option<String>,
    pub chapter: Option<String>,
    pub subchapter: Option<String>,
    pub article: Option<String>,
    pub section_number: Option<String>,
    pub section_heading: Option<String>,
    pub content_markdown: String,
}

impl ExtractedRecord {
    /// Returns true if the record should never be extracted again
    ///
    /// A record is complete when it carries body text and at least one of the
    /// title number or section number.
    pub fn is_complete(&self) -> bool {
        !self.content_markdown.trim().is_empty()
            && (is_filled(&self.title_number) || is_filled(&self.section_number))
    }
}

impl Record for ExtractedRecord {
    fn identity(&self) -> &str {
        &self.source_url
    }
}

fn is_filled(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.trim().is_empty())
}
