//! Output module for reporting harvest progress
//!
//! Statistics are derived from the checkpoint files alone; there is no
//! separate results database to query.

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
