//! Reg-Harvest: a resumable regulations crawler
//!
//! This crate crawls a legal-regulations website breadth-first, extracts one
//! structured record per regulation section, and feeds those records to an
//! embedding index that a question-answering agent retrieves from.
//!
//! Every stage checkpoints into append-only files so that an interrupted run
//! resumes by replaying its logs and skipping identities it already knows.

pub mod agent;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod index;
pub mod output;
pub mod services;
pub mod state;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Reg-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Required input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Service error: {0}")]
    Service(#[from] services::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable {0}")]
    MissingCredential(&'static str),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for Reg-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{extract_record, ExtractError};
pub use state::{CrawlState, DiscoveryPhase};
pub use storage::{DiscoveredSection, ExtractedRecord};
pub use url::{classify_url, resolve_href, LinkKind};
