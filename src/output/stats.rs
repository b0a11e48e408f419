//! Statistics gathered from the checkpoint files
//!
//! Everything here is derived by replaying the logs in the data directory,
//! so it can run at any time, including while a crawl is paused.

use crate::config::OutputConfig;
use crate::storage::{read_records, DiscoveredSection, ExtractedRecord, LineLog, LogScan};
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Pipeline progress summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStatistics {
    /// Folder pages in the visited checkpoint
    pub visited_pages: usize,

    /// Distinct sections in the discovered log
    pub discovered_sections: usize,

    /// Parsed lines in the extracted log, duplicates included
    pub extracted_lines: usize,

    /// Distinct sections with at least one complete record
    pub complete_records: usize,

    /// Distinct sections whose records are all incomplete
    pub incomplete_records: usize,

    /// Unparseable lines across both record logs
    pub malformed_lines: usize,

    /// Discovered sections still lacking a complete record
    pub pending_sections: usize,

    /// Ids in the indexed checkpoint
    pub indexed_ids: usize,

    /// Field names of the first extracted record
    pub first_record_keys: Vec<String>,
}

/// Loads statistics from the data directory
///
/// Missing files count as empty.
pub fn load_statistics(output: &OutputConfig) -> Result<HarvestStatistics> {
    let visited = LineLog::load(&output.visited_path())?;
    let indexed = LineLog::load(&output.indexed_path())?;

    let discovered: LogScan<DiscoveredSection> = read_records(&output.discovered_path())?;
    let discovered_urls: HashSet<String> = discovered
        .records
        .into_iter()
        .map(|section| section.section_url)
        .collect();

    let extracted: LogScan<ExtractedRecord> = read_records(&output.extracted_path())?;
    let mut complete = HashSet::new();
    let mut seen = HashSet::new();
    for record in &extracted.records {
        seen.insert(record.source_url.as_str());
        if record.is_complete() {
            complete.insert(record.source_url.as_str());
        }
    }

    let pending_sections = discovered_urls
        .iter()
        .filter(|url| !complete.contains(url.as_str()))
        .count();

    Ok(HarvestStatistics {
        visited_pages: visited.len(),
        discovered_sections: discovered_urls.len(),
        extracted_lines: extracted.records.len(),
        complete_records: complete.len(),
        incomplete_records: seen.len() - complete.len(),
        malformed_lines: discovered.malformed + extracted.malformed,
        pending_sections,
        indexed_ids: indexed.len(),
        first_record_keys: first_record_keys(&output.extracted_path())?,
    })
}

/// Returns the field names of the first parseable line, sorted
fn first_record_keys(path: &Path) -> Result<Vec<String>> {
    let scan: LogScan<serde_json::Map<String, serde_json::Value>> = read_records(path)?;
    Ok(scan
        .records
        .into_iter()
        .next()
        .map(|object| object.keys().cloned().collect())
        .unwrap_or_default())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Discovery:");
    println!("  Folders visited: {}", stats.visited_pages);
    println!("  Sections discovered: {}", stats.discovered_sections);
    println!();

    println!("Extraction:");
    println!("  Records written: {}", stats.extracted_lines);
    println!("  Complete sections: {}", stats.complete_records);
    println!("  Incomplete sections: {}", stats.incomplete_records);
    println!("  Pending sections: {}", stats.pending_sections);
    if stats.malformed_lines > 0 {
        println!("  Malformed lines: {}", stats.malformed_lines);
    }
    println!();

    println!("Index:");
    println!("  Sections indexed: {}", stats.indexed_ids);
    println!();

    if stats.first_record_keys.is_empty() {
        println!("No extracted records yet");
    } else {
        println!("Record fields: {}", stats.first_record_keys.join(", "));
    }

    let completion = if stats.discovered_sections > 0 {
        (stats.complete_records as f64 / stats.discovered_sections as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Completion: {:.1}% ({} / {} sections extracted)",
        completion, stats.complete_records, stats.discovered_sections
    );
}
