use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Reg-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin that relative hrefs are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Root of the browse tree; the first page the frontier visits
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Path fragment identifying folder (navigation) pages
    #[serde(rename = "navigation-pattern", default = "default_navigation_pattern")]
    pub navigation_pattern: String,

    /// Path fragment identifying document (leaf) pages
    #[serde(rename = "document-pattern", default = "default_document_pattern")]
    pub document_pattern: String,
}

/// Crawler pacing and batching
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Politeness delay after each navigation page (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_delay_ms")]
    pub page_delay_ms: u64,

    /// Number of leaf pages fetched concurrently per extraction batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Politeness delay between extraction batches (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_delay_ms")]
    pub batch_delay_ms: u64,

    /// A navigation page counts as loaded once it has more anchors than this
    #[serde(rename = "min-link-count", default = "default_min_link_count")]
    pub min_link_count: usize,

    /// Per-request timeout handed to the fetcher (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_delay_ms(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_delay_ms(),
            min_link_count: default_min_link_count(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding every checkpoint and record log
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl OutputConfig {
    pub fn discovered_path(&self) -> PathBuf {
        self.data_dir.join("discovered_section_urls.jsonl")
    }

    pub fn extracted_path(&self) -> PathBuf {
        self.data_dir.join("extracted_data.jsonl")
    }

    pub fn visited_path(&self) -> PathBuf {
        self.data_dir.join("visited_urls.txt")
    }

    pub fn indexed_path(&self) -> PathBuf {
        self.data_dir.join("indexed_ids.txt")
    }
}

/// Vector index settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    #[serde(rename = "index-name")]
    pub index_name: String,

    /// Embedding dimension the index is created with
    pub dimension: usize,

    /// Records per upsert request
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    #[serde(rename = "embedding-model")]
    pub embedding_model: String,

    /// Pinecone control plane endpoint
    #[serde(rename = "control-url")]
    pub control_url: String,

    pub cloud: String,
    pub region: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_name: "ccr-regulations".to_string(),
            dimension: 768,
            batch_size: 50,
            embedding_model: "models/text-embedding-004".to_string(),
            control_url: "https://api.pinecone.io".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Question-answering agent settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    #[serde(rename = "chat-model")]
    pub chat_model: String,

    pub temperature: f32,

    /// Number of sections retrieved per question
    #[serde(rename = "top-k")]
    pub top_k: usize,

    /// Attempts made when a collaborator reports a rate limit
    #[serde(rename = "rate-limit-retries")]
    pub rate_limit_retries: u32,

    #[serde(rename = "rate-limit-wait-secs")]
    pub rate_limit_wait_secs: u64,

    /// Google Generative Language endpoint
    #[serde(rename = "api-url")]
    pub api_url: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            chat_model: "models/gemini-flash-latest".to_string(),
            temperature: 0.3,
            top_k: 3,
            rate_limit_retries: 3,
            rate_limit_wait_secs: 10,
            api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

fn default_navigation_pattern() -> String {
    "/calregs/Browse/".to_string()
}

fn default_document_pattern() -> String {
    "/calregs/Document/".to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    3
}

fn default_min_link_count() -> usize {
    5
}

fn default_request_timeout() -> u64 {
    30
}
