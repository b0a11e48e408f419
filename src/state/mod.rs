//! State module for tracking discovery progress
//!
//! # Components
//!
//! - `CrawlState`: frontier queue, visited set, and known sections for one run
//! - `DiscoveryPhase`: the phases a page moves through in the discovery loop

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::DiscoveryPhase;
