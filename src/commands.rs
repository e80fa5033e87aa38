use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crate::config::Config;
use crate::generation::Generator;
use crate::index::{SearchHit, VectorStore};
use crate::indexer::Indexer;
use crate::query::QueryProcessor;
use crate::retriever::Retriever;

/// Ingest a directory of documents into a named index
#[inline]
pub fn ingest(docs_dir: &Path, index_name: &str) -> Result<()> {
    let config = Config::load()?;
    let indexer = Indexer::new(config).context("Failed to initialize indexer")?;

    indexer
        .client()
        .health_check()
        .context("Ollama is not reachable; run 'docs-rag config' to set it up")?;

    info!("Ingesting documents from {}", docs_dir.display());
    let (store, report) = indexer
        .build_index(docs_dir, index_name)
        .context("Failed to build index")?;

    let stats = store.stats();
    println!("{}", style("Ingestion complete").bold().green());
    println!("  Documents: {}", report.documents);
    println!("  Chunks embedded: {}", report.embedded);
    println!();
    println!("{}", style("Index statistics").bold());
    println!("  Total vectors: {}", stats.total_vectors);
    println!("  Dimension: {}", stats.dimension);
    println!("  Distance metric: {}", stats.distance_metric);
    println!("  M: {}", stats.m);
    println!("  ef_construction: {}", stats.ef_construction);
    println!("  ef_search: {}", stats.ef_search);
    println!("  Graph max level: {}", stats.max_level);
    match stats.entry_point {
        Some(id) => println!("  Entry point: {}", id),
        None => println!("  Entry point: none (empty index)"),
    }

    Ok(())
}

/// Answer a question against a named index
#[inline]
pub fn query(
    question: &str,
    index_name: &str,
    k: usize,
    max_distance: f32,
    retrieve_only: bool,
) -> Result<()> {
    let config = Config::load()?;
    let store = VectorStore::load(&Config::index_dir()?, index_name, config.index)
        .with_context(|| format!("Failed to load index '{}'", index_name))?;

    let indexer = Indexer::new(config.clone()).context("Failed to initialize Ollama client")?;
    let processor = QueryProcessor::new(indexer.client());
    let ctx = processor
        .process(question)
        .context("Failed to process query")?;

    let retriever = Retriever::new(&store);
    let hits = retriever.retrieve(&ctx, k, max_distance)?;

    if hits.is_empty() {
        println!("No passages matched the query.");
        return Ok(());
    }

    println!("{}", style(format!("Top {} passages", hits.len())).bold());
    for hit in &hits {
        print_hit(hit);
    }

    if !retrieve_only {
        let generator = Generator::new(&config).context("Failed to initialize generator")?;
        let answer = generator
            .generate(question, &hits)
            .context("Failed to generate answer")?;
        println!();
        println!("{}", style("Answer").bold().cyan());
        println!("{}", answer);
    }

    Ok(())
}

/// Find passages similar to an already-indexed chunk
#[inline]
pub fn similar(chunk_id: i64, index_name: &str, k: usize) -> Result<()> {
    let config = Config::load()?;
    let store = VectorStore::load(&Config::index_dir()?, index_name, config.index)
        .with_context(|| format!("Failed to load index '{}'", index_name))?;

    let hits = store.find_similar_by_id(chunk_id, k)?;
    if hits.is_empty() {
        println!("No chunk with id {} in index '{}'.", chunk_id, index_name);
        return Ok(());
    }

    println!("{}", style(format!("Chunks similar to {}", chunk_id)).bold());
    for hit in &hits {
        print_hit(hit);
    }
    Ok(())
}

/// Show statistics for a named index
#[inline]
pub fn stats(index_name: &str) -> Result<()> {
    let config = Config::load()?;
    let store = VectorStore::load(&Config::index_dir()?, index_name, config.index)
        .with_context(|| format!("Failed to load index '{}'", index_name))?;

    let stats = store.stats();
    println!("{}", style(format!("Index '{}'", index_name)).bold());
    println!("  Total vectors: {}", stats.total_vectors);
    println!("  Dimension: {}", stats.dimension);
    println!("  Distance metric: {}", stats.distance_metric);
    println!("  M: {}", stats.m);
    println!("  ef_construction: {}", stats.ef_construction);
    println!("  ef_search: {}", stats.ef_search);
    println!("  Graph max level: {}", stats.max_level);
    match stats.entry_point {
        Some(id) => println!("  Entry point: {}", id),
        None => println!("  Entry point: none (empty index)"),
    }
    Ok(())
}

fn print_hit(hit: &SearchHit) {
    let source = hit
        .metadata
        .get("filename")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");
    let page = hit
        .metadata
        .get("page_number")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    println!();
    println!(
        "{} {}",
        style(format!("#{}", hit.rank)).bold(),
        style(format!("(distance {:.4}, score {:.4})", hit.distance, hit.score)).dim()
    );
    if hit.final_score > 0.0 {
        println!(
            "   final score {:.4} (intent {}, metadata {:.2})",
            hit.final_score, hit.intent_score, hit.meta_score
        );
    }
    println!("   Source: {} (page {})", source, page);

    let preview: String = hit.text.chars().take(160).collect();
    if hit.text.chars().count() > 160 {
        println!("   {}...", preview);
    } else {
        println!("   {}", preview);
    }
}
