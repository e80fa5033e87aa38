//! Multi-stage retrieval pipeline: over-fetch, distance gate, metadata soft
//! scoring, intent scoring, weighted fusion, final ranking.


use std::cmp::Ordering;
use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::debug;

use crate::Result;
use crate::index::{ChunkMetadata, SearchHit, VectorStore, intent_match_count};

/// Hard distance cutoff applied before any re-ranking.
pub const DEFAULT_MAX_DISTANCE: f32 = 10.0;

/// Fusion weights. Similarity dominates; intent and metadata are secondary
/// signals. `intent_score` is a raw match count while `meta_score` is
/// normalized to [0,1], so several matching intent flags can outweigh the
/// similarity term. Intentional; do not normalize.
const SIMILARITY_WEIGHT: f32 = 0.7;
const INTENT_WEIGHT: f32 = 0.2;
const META_WEIGHT: f32 = 0.1;

/// Everything the retriever needs to know about one query. Built by the
/// query processor, consumed once per retrieval.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub original_query: String,
    pub cleaned_query: String,
    pub embedding: Vec<f32>,
    pub metadata_filters: ChunkMetadata,
    pub query_intent: BTreeMap<String, bool>,
}

pub struct Retriever<'a> {
    store: &'a VectorStore,
}

impl<'a> Retriever<'a> {
    #[inline]
    pub fn new(store: &'a VectorStore) -> Self {
        Self { store }
    }

    /// Produce the final top-`k` ranked passage list for a query context.
    /// Removing every candidate at the distance gate yields an empty list,
    /// never an error.
    #[inline]
    pub fn retrieve(
        &self,
        ctx: &QueryContext,
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<SearchHit>> {
        // Stage 1: over-fetch so downstream filtering can still yield k
        let mut hits = self.store.search(&ctx.embedding, k * 3)?;

        // Stage 2: hard distance cutoff, not a soft penalty
        hits.retain(|h| h.distance <= max_distance);

        // Stage 3: metadata soft scoring. Matching is advisory here, unlike
        // the store's hard-filtered search. No filters means 0.0 for every
        // candidate; an empty map must not inflate scores or divide by zero.
        for hit in &mut hits {
            hit.meta_score = if ctx.metadata_filters.is_empty() {
                0.0
            } else {
                let matched = ctx
                    .metadata_filters
                    .iter()
                    .filter(|(key, val)| hit.metadata.get(*key) == Some(*val))
                    .count();
                matched as f32 / ctx.metadata_filters.len() as f32
            };
        }

        // Stage 4: intent match count, unbounded
        for hit in &mut hits {
            hit.intent_score = if ctx.query_intent.is_empty() {
                0
            } else {
                intent_match_count(&hit.metadata, &ctx.query_intent)
            };
        }

        // Stage 5: weighted fusion
        for hit in &mut hits {
            hit.final_score = SIMILARITY_WEIGHT * hit.score
                + INTENT_WEIGHT * hit.intent_score as f32
                + META_WEIGHT * hit.meta_score;
        }

        debug!(
            "Retrieval pipeline: {} candidates survived the distance gate (k={})",
            hits.len(),
            k
        );

        // Stage 6: final ordering
        Ok(hits
            .into_iter()
            .sorted_by(|a, b| {
                b.final_score
                    .partial_cmp(&a.final_score)
                    .unwrap_or(Ordering::Equal)
            })
            .take(k)
            .collect())
    }
}
