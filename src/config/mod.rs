//! Configuration module for Reg-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading collaborator credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use reg_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl starts at: {}", config.site.start_url);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

// Re-export types
pub use credentials::Credentials;
pub use types::{
    AgentConfig, Config, CrawlerConfig, IndexConfig, OutputConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
