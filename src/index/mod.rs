//! Embedding and upload of extracted sections
//!
//! Each extracted section becomes one vector whose id is its source URL.
//! Uploaded ids are appended to `indexed_ids.txt` after every successful
//! batch, so an interrupted run resumes with the first batch that did not
//! make it.

use crate::config::{Config, Credentials};
use crate::services::{
    with_rate_limit_retry, Embedder, GeminiClient, Metadata, PineconeIndex, RetryPolicy,
    VectorIndex, VectorRecord,
};
use crate::storage::{read_records, ExtractedRecord, LineLog, LogScan, Record};
use crate::{HarvestError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Characters of section text stored as vector metadata
pub const METADATA_TEXT_LIMIT: usize = 20_000;

/// Totals of an indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Distinct sections with content
    pub candidates: usize,
    /// Sections skipped because a previous run uploaded them
    pub already_indexed: usize,
    pub embedded: usize,
    pub embed_failures: usize,
    /// Vectors confirmed by the index
    pub upserted: usize,
    pub batch_failures: usize,
}

/// Loads the records worth indexing
///
/// Records without content are dropped. When a section was extracted more
/// than once, the last record wins but keeps the position of the first.
pub fn indexable_records(extracted_path: &Path) -> Result<Vec<ExtractedRecord>> {
    if !extracted_path.exists() {
        return Err(HarvestError::MissingInput(extracted_path.to_path_buf()));
    }

    let scan: LogScan<ExtractedRecord> = read_records(extracted_path)?;
    if scan.malformed > 0 {
        tracing::warn!("Skipped {} malformed records", scan.malformed);
    }

    let mut records: Vec<ExtractedRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for record in scan.records {
        if record.content_markdown.trim().is_empty() {
            continue;
        }
        match positions.get(record.identity()) {
            Some(&at) => records[at] = record,
            None => {
                positions.insert(record.identity().to_string(), records.len());
                records.push(record);
            }
        }
    }
    Ok(records)
}

/// Text sent to the embedding model for one section
pub fn embedding_text(record: &ExtractedRecord) -> String {
    format!("{}: {}", record.citation, record.content_markdown)
}

/// Metadata stored next to a section's vector
pub fn vector_metadata(record: &ExtractedRecord) -> Metadata {
    let text_or_empty = |value: &Option<String>| value.clone().unwrap_or_default();

    let mut metadata = Metadata::new();
    metadata.insert("citation".to_string(), record.citation.clone());
    metadata.insert("title_number".to_string(), text_or_empty(&record.title_number));
    metadata.insert("chapter".to_string(), text_or_empty(&record.chapter));
    metadata.insert("section_number".to_string(), text_or_empty(&record.section_number));
    metadata.insert("heading".to_string(), text_or_empty(&record.section_heading));
    metadata.insert("url".to_string(), record.source_url.clone());
    metadata.insert(
        "text".to_string(),
        record.content_markdown.chars().take(METADATA_TEXT_LIMIT).collect(),
    );
    metadata
}

/// Uploads sections that are not in the checkpoint yet
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    checkpoint: LineLog,
    indexed: HashSet<String>,
    batch_size: usize,
    retry: RetryPolicy,
}

impl Indexer {
    /// Creates an indexer, loading the checkpoint
    ///
    /// # Arguments
    ///
    /// * `checkpoint_path` - The indexed-ids checkpoint
    /// * `reset` - Start over: truncate the checkpoint instead of loading it
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        checkpoint_path: &Path,
        batch_size: usize,
        retry: RetryPolicy,
        reset: bool,
    ) -> Result<Self> {
        let mut checkpoint = LineLog::open(checkpoint_path)?;
        let indexed = if reset {
            checkpoint.truncate()?;
            HashSet::new()
        } else {
            LineLog::load(checkpoint_path)?
        };
        tracing::info!("Resuming... {} items already in the index", indexed.len());

        Ok(Self {
            embedder,
            index,
            checkpoint,
            indexed,
            batch_size: batch_size.max(1),
            retry,
        })
    }

    pub fn is_indexed(&self, id: &str) -> bool {
        self.indexed.contains(id)
    }

    /// Embeds and uploads every record not uploaded before
    ///
    /// Failed embeddings and failed batches are logged and left out of the
    /// checkpoint, so the next run picks them up again.
    pub async fn run(&mut self, records: &[ExtractedRecord]) -> Result<IndexSummary> {
        let mut summary = IndexSummary {
            candidates: records.len(),
            ..Default::default()
        };
        let mut batch: Vec<VectorRecord> = Vec::with_capacity(self.batch_size);

        for record in records {
            if self.indexed.contains(&record.source_url) {
                summary.already_indexed += 1;
                continue;
            }

            let text = embedding_text(record);
            let embedder = &self.embedder;
            let values = match with_rate_limit_retry(self.retry, "embedding", || {
                embedder.embed(&text)
            })
            .await
            {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!("Failed to embed {}: {}", record.source_url, e);
                    summary.embed_failures += 1;
                    continue;
                }
            };
            summary.embedded += 1;

            batch.push(VectorRecord {
                id: record.source_url.clone(),
                values,
                metadata: vector_metadata(record),
            });

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut summary).await?;
            }
        }
        self.flush(&mut batch, &mut summary).await?;

        tracing::info!(
            "Indexing completed: {} uploaded, {} already indexed, {} embedding failures, {} failed batches",
            summary.upserted,
            summary.already_indexed,
            summary.embed_failures,
            summary.batch_failures
        );
        Ok(summary)
    }

    /// Uploads the pending batch and checkpoints its ids on success
    async fn flush(
        &mut self,
        batch: &mut Vec<VectorRecord>,
        summary: &mut IndexSummary,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let index = &self.index;
        let vectors = batch.as_slice();
        let upload = with_rate_limit_retry(self.retry, "upsert", || index.upsert(vectors)).await;

        match upload {
            Ok(()) => {
                tracing::info!("Uploaded batch of {} vectors", batch.len());
                self.checkpoint
                    .append_all(batch.iter().map(|vector| vector.id.as_str()))?;
                for vector in batch.iter() {
                    self.indexed.insert(vector.id.clone());
                }
                summary.upserted += batch.len();
            }
            Err(e) => {
                tracing::warn!("Upload error for batch of {}: {}", batch.len(), e);
                summary.batch_failures += 1;
            }
        }

        batch.clear();
        Ok(())
    }
}

/// Runs the indexer against the configured services
///
/// With `reset`, the index is deleted and recreated and the checkpoint is
/// truncated before anything is uploaded.
pub async fn run_index(config: &Config, reset: bool) -> Result<IndexSummary> {
    let records = indexable_records(&config.output.extracted_path())?;
    tracing::info!("Processing {} sections", records.len());

    let credentials = Credentials::from_env()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .build()?;

    let embedder: Arc<dyn Embedder> = Arc::new(GeminiClient::new(
        client.clone(),
        credentials.google_api_key.as_str(),
        config.agent.api_url.as_str(),
        config.index.embedding_model.as_str(),
        config.agent.chat_model.as_str(),
    ));
    let index: Arc<dyn VectorIndex> = Arc::new(PineconeIndex::new(
        client,
        credentials.pinecone_api_key.as_str(),
        &config.index,
    ));

    if reset {
        tracing::info!("Resetting index {}", config.index.index_name);
        index.delete_index().await?;
    }
    index.ensure_index().await?;

    let mut indexer = Indexer::new(
        embedder,
        index,
        &config.output.indexed_path(),
        config.index.batch_size,
        RetryPolicy::from_config(&config.agent),
        reset,
    )?;
    indexer.run(&records).await
}
