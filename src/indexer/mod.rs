//! Ingestion pipeline orchestration: load documents, clean them, pick a
//! chunking strategy per document, assemble chunk metadata, embed in
//! batches, and persist the resulting index.

#[cfg(test)]
mod tests;

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{info, warn};

use crate::Result;
use crate::chunking::{
    ChunkingConfig, RecursiveChunker, SlidingWindowChunker, detect_qna_in_pages,
};
use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::index::{ChunkMetadata, VectorStore};
use crate::ingestion::DocumentLoader;
use crate::ingestion::cleaner::clean_with_metadata;

/// One chunk ready for embedding, with its assembled metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Counters reported after an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub embedded: usize,
}

/// Load, clean, and chunk every document under `docs_dir`. Chunk ids are
/// 1-based and restart per source document.
#[inline]
pub fn process_documents(docs_dir: &Path, chunking: &ChunkingConfig) -> Result<Vec<ChunkRecord>> {
    let loader = DocumentLoader::new(docs_dir);
    let documents = loader.load_documents()?;

    let sliding = SlidingWindowChunker::from(chunking);
    let recursive = RecursiveChunker::from(chunking);

    let mut records = Vec::new();
    for document in &documents {
        let cleaned = clean_with_metadata(&document.text);

        // Q&A-formatted documents get the sliding window so question and
        // answer stay in one window; prose gets the recursive splitter
        let use_qna = detect_qna_in_pages(&cleaned.pages);
        let strategy = if use_qna { "qna" } else { "recursive" };

        let mut chunk_count: i64 = 1;
        for page in &cleaned.pages {
            if page.text.is_empty() {
                continue;
            }

            let chunks = if use_qna {
                sliding.chunk(&page.text)
            } else {
                recursive.chunk(&page.text)
            };

            for chunk_text in chunks {
                let mut metadata = ChunkMetadata::new();
                metadata.insert("chunk_id".to_string(), json!(chunk_count));
                metadata.insert(
                    "page_number".to_string(),
                    page.metadata.get("page_number").cloned().unwrap_or(json!("N/A")),
                );
                metadata.insert("filename".to_string(), json!(document.filename));
                metadata.insert("source_document".to_string(), json!(document.filename));
                metadata.insert("chunking_strategy".to_string(), json!(strategy));
                for (key, value) in &page.metadata {
                    metadata.insert(key.clone(), value.clone());
                }

                records.push(ChunkRecord {
                    text: chunk_text,
                    metadata,
                });
                chunk_count += 1;
            }
        }

        if cleaned.pages.is_empty() {
            warn!("Document {} produced no usable pages", document.filename);
        }
    }

    info!(
        "Processed {} documents into {} chunks",
        documents.len(),
        records.len()
    );
    Ok(records)
}

/// Builds a [`VectorStore`] from a document directory and persists it.
pub struct Indexer {
    config: Config,
    client: OllamaClient,
}

impl Indexer {
    #[inline]
    pub fn new(config: Config) -> Result<Self> {
        let client = OllamaClient::new(&config)?;
        Ok(Self { config, client })
    }

    #[inline]
    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Run the full pipeline: documents -> chunks -> embeddings -> store,
    /// then save under the configured index directory.
    #[inline]
    pub fn build_index(
        &self,
        docs_dir: &Path,
        index_name: &str,
    ) -> Result<(VectorStore, IngestReport)> {
        let records = process_documents(docs_dir, &self.config.chunking)?;
        let documents = count_documents(&records);

        let mut store = VectorStore::new(self.config.index);
        if records.is_empty() {
            warn!("No chunks produced; saving an empty index");
            store.save(&Config::index_dir()?, index_name)?;
            return Ok((store, IngestReport::default()));
        }

        let (texts, metadata): (Vec<String>, Vec<ChunkMetadata>) =
            records.into_iter().map(|r| (r.text, r.metadata)).unzip();

        let embeddings = self.embed_with_progress(&texts)?;
        let embedded = embeddings.len();

        store.add(embeddings, metadata, texts)?;
        store.save(&Config::index_dir()?, index_name)?;

        let report = IngestReport {
            documents,
            chunks: embedded,
            embedded,
        };
        info!(
            "Built index '{}': {} documents, {} chunks",
            index_name, report.documents, report.chunks
        );
        Ok((store, report))
    }

    /// Embed all chunk texts batch by batch with a progress bar.
    fn embed_with_progress(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let bar = ProgressBar::new(texts.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} Embedding chunks [{bar:40}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let batch_size = self.config.ollama.batch_size as usize;
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let batch_embeddings = self.client.embed_batch(batch)?;
            bar.inc(batch_embeddings.len() as u64);
            embeddings.extend(batch_embeddings);
        }
        bar.finish_and_clear();

        Ok(embeddings)
    }
}

fn count_documents(records: &[ChunkRecord]) -> usize {
    let mut seen = std::collections::HashSet::new();
    for record in records {
        if let Some(filename) = record
            .metadata
            .get("filename")
            .and_then(serde_json::Value::as_str)
        {
            seen.insert(filename.to_string());
        }
    }
    seen.len()
}
