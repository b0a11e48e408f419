//! Reg-Harvest main entry point
//!
//! This is the command-line interface for the Reg-Harvest regulations crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reg_harvest::agent::build_agent;
use reg_harvest::config::{load_config_with_hash, Config};
use reg_harvest::crawler::{fetch_one, pending_urls, run_discovery, run_extraction};
use reg_harvest::index::run_index;
use reg_harvest::output::{load_statistics, print_statistics};
use reg_harvest::HarvestError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Reg-Harvest: a resumable regulations crawler
///
/// Reg-Harvest walks a regulations website breadth-first, extracts one
/// structured record per section, indexes the records as embeddings, and
/// answers questions over them. Every stage resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "reg-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable regulations crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the navigation tree and record every section link
    Discover,

    /// Fetch discovered sections and extract their records
    Extract,

    /// Embed extracted records and upload them to the vector index
    Index {
        /// Delete and recreate the index, then upload everything again
        #[arg(long)]
        reset: bool,
    },

    /// Answer a question, or start an interactive session without one
    Ask {
        #[arg(long)]
        question: Option<String>,
    },

    /// Show statistics from the checkpoint files and exit
    Stats,

    /// Validate config and show what would run without fetching anything
    Check,

    /// Fetch one page and save its HTML for inspection
    FetchOne {
        url: String,

        /// Where to write the HTML
        #[arg(long, default_value = "debug_page.html")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    match cli.command {
        Command::Discover => handle_discover(&config).await,
        Command::Extract => handle_extract(&config).await,
        Command::Index { reset } => handle_index(&config, reset).await,
        Command::Ask { question } => handle_ask(&config, question).await,
        Command::Stats => handle_stats(&config),
        Command::Check => handle_check(&config),
        Command::FetchOne { url, out } => handle_fetch_one(&config, &url, out).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reg_harvest=info,warn"),
            1 => EnvFilter::new("reg_harvest=debug,info"),
            2 => EnvFilter::new("reg_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn handle_discover(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting discovery at {}", config.site.start_url);
    let summary = run_discovery(config).await.context("Discovery failed")?;

    println!("Folders visited: {}", summary.pages_visited);
    println!("Folders failed: {}", summary.pages_failed);
    println!("New sections: {}", summary.sections_found);
    println!("Saved to {}", config.output.discovered_path().display());
    Ok(())
}

async fn handle_extract(config: &Config) -> anyhow::Result<()> {
    let summary = run_extraction(config).await.context("Extraction failed")?;

    println!("Sections attempted: {}", summary.attempted);
    println!("Records written: {}", summary.written);
    println!("Fetch failures: {}", summary.fetch_failures);
    println!("Pages without content: {}", summary.content_not_found);
    Ok(())
}

async fn handle_index(config: &Config, reset: bool) -> anyhow::Result<()> {
    let summary = run_index(config, reset).await.context("Indexing failed")?;

    println!("Vectors uploaded: {}", summary.upserted);
    println!("Already indexed: {}", summary.already_indexed);
    println!("Embedding failures: {}", summary.embed_failures);
    println!("Failed batches: {}", summary.batch_failures);
    Ok(())
}

async fn handle_ask(config: &Config, question: Option<String>) -> anyhow::Result<()> {
    let agent = build_agent(config).context("Failed to set up the agent")?;

    match question {
        Some(question) => {
            let answer = agent.answer(&question).await?;
            println!("{}", answer);
        }
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            agent.interactive(stdin, tokio::io::stdout()).await?;
        }
    }
    Ok(())
}

/// Handles the stats command: shows statistics from the checkpoint files
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Data directory: {}\n", config.output.data_dir.display());
    let stats = load_statistics(&config.output)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the check command: validates config and shows what would run
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== Reg-Harvest Check ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Start URL: {}", config.site.start_url);
    println!("  Navigation pattern: {}", config.site.navigation_pattern);
    println!("  Document pattern: {}", config.site.document_pattern);

    println!("\nCrawler Configuration:");
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Batch delay: {}ms", config.crawler.batch_delay_ms);
    println!("  Minimum links per folder: {}", config.crawler.min_link_count);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Discovered: {}", config.output.discovered_path().display());
    println!("  Extracted: {}", config.output.extracted_path().display());
    println!("  Visited: {}", config.output.visited_path().display());
    println!("  Indexed: {}", config.output.indexed_path().display());

    println!("\nIndex:");
    println!(
        "  {} (dimension {}, {} per batch)",
        config.index.index_name, config.index.dimension, config.index.batch_size
    );
    println!("  Embedding model: {}", config.index.embedding_model);
    println!("  Chat model: {}", config.agent.chat_model);

    println!("\n✓ Configuration is valid");
    match pending_urls(
        &config.output.discovered_path(),
        &config.output.extracted_path(),
    ) {
        Ok(pending) => println!("✓ {} sections waiting for extraction", pending.len()),
        Err(HarvestError::MissingInput(_)) => {
            println!("✓ Would start discovery at {}", config.site.start_url)
        }
        Err(e) => return Err(e).context("Failed to read the checkpoint files"),
    }

    Ok(())
}

async fn handle_fetch_one(config: &Config, url: &str, out: PathBuf) -> anyhow::Result<()> {
    match fetch_one(config, url, &out).await? {
        Some(len) => println!("Saved {} bytes to {}", len, out.display()),
        None => anyhow::bail!("Failed to load {}", url),
    }
    Ok(())
}
