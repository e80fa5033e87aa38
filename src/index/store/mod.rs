//! `VectorStore`: the HNSW graph plus parallel text/metadata arrays keyed by
//! the same dense insertion-order ids. Append-only; correction requires
//! rebuilding the index.


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::index::hnsw::l2_sq;
use crate::index::{ChunkMetadata, HnswIndex, IndexConfig, IndexStats, intent_match_count};
use crate::{RagError, Result};

/// A single search result. Constructed per query, never persisted. The
/// `meta_score`/`intent_score`/`final_score` fields are zero until the
/// retrieval pipeline fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 1-based position in the result list this hit was returned in
    pub rank: usize,
    /// Squared L2 distance to the query (exact Euclidean norm on the
    /// metadata-filtered path)
    pub distance: f32,
    /// Similarity in (0,1], derived as 1/(1+distance)
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub meta_score: f32,
    pub intent_score: u32,
    pub final_score: f32,
}

pub struct VectorStore {
    index: HnswIndex,
    config: IndexConfig,
    metadata: Vec<ChunkMetadata>,
    chunk_texts: Vec<String>,
}

/// Sidecar shape written next to the graph blob.
#[derive(Serialize)]
struct Sidecar<'a> {
    metadata: &'a [ChunkMetadata],
    chunk_texts: &'a [String],
    hnsw_params: SidecarParams,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct SidecarParams {
    #[serde(rename = "M")]
    m: Option<usize>,
    ef_construction: Option<usize>,
    ef_search: Option<usize>,
    distance_metric: Option<String>,
}

#[derive(Deserialize)]
struct SidecarOwned {
    metadata: Vec<ChunkMetadata>,
    chunk_texts: Vec<String>,
    #[serde(default)]
    hnsw_params: SidecarParams,
}

impl VectorStore {
    #[inline]
    pub fn new(config: IndexConfig) -> Self {
        Self {
            index: HnswIndex::new(&config),
            config,
            metadata: Vec::new(),
            chunk_texts: Vec::new(),
        }
    }

    /// Number of indexed records.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Append a batch of (vector, metadata, text) triples. The three lists
    /// must be aligned and every vector must match the index dimension; a
    /// violation rejects the whole batch before anything is inserted.
    /// Not safe to call concurrently with `search` or another `add`.
    #[inline]
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        texts: Vec<String>,
    ) -> Result<()> {
        if vectors.is_empty() && metadata.is_empty() && texts.is_empty() {
            return Ok(());
        }
        if vectors.len() != metadata.len() || vectors.len() != texts.len() {
            return Err(RagError::Index(format!(
                "misaligned batch: {} vectors, {} metadata entries, {} texts",
                vectors.len(),
                metadata.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dimension) {
            return Err(RagError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.config.dimension,
                bad.len()
            )));
        }

        let batch_size = vectors.len();
        for vector in vectors {
            self.index.insert(vector)?;
        }
        self.metadata.extend(metadata);
        self.chunk_texts.extend(texts);

        debug_assert_eq!(self.metadata.len(), self.index.len());
        debug_assert_eq!(self.chunk_texts.len(), self.index.len());

        info!(
            "Added {} embeddings to HNSW index (total {})",
            batch_size,
            self.index.len()
        );
        Ok(())
    }

    /// Approximate similarity search. Returns up to `k` hits ascending by
    /// distance; an empty index yields an empty list. The candidate list
    /// size is widened to `max(ef_search, 2k)` for this call only, so large
    /// `k` requests get a proportionally wide pool without changing the
    /// instance default.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let ef = self.config.ef_search.max(k * 2);
        let neighbors = self.index.search(query, k, ef)?;

        Ok(neighbors
            .into_iter()
            .enumerate()
            .map(|(i, (id, distance))| self.hit(i + 1, id, distance))
            .collect())
    }

    /// As [`search`](Self::search), then drop hits farther than
    /// `max_distance`.
    #[inline]
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = self.search(query, k)?;
        hits.retain(|h| h.distance <= max_distance);
        Ok(hits)
    }

    /// Batch variant: one result list per query, no partial-result contract.
    #[inline]
    pub fn batch_search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<SearchHit>>> {
        queries.iter().map(|q| self.search(q, k)).collect()
    }

    /// Hybrid search: hard-filter candidates on metadata equality, then rank
    /// the surviving subset by exact L2 distance. The graph cannot traverse
    /// under a filter, so this path is brute force over the candidates and
    /// bypasses the graph's recall trade-offs entirely. `None` filters fall
    /// through to the plain graph search.
    #[inline]
    pub fn search_with_metadata(
        &self,
        query: &[f32],
        filters: Option<&ChunkMetadata>,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let Some(filters) = filters else {
            return self.search(query, k);
        };

        if query.len() != self.config.dimension {
            return Err(RagError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.config.dimension,
                query.len()
            )));
        }

        let candidates: Vec<usize> = self
            .metadata
            .iter()
            .enumerate()
            .filter(|(_, m)| filters.iter().all(|(key, val)| m.get(key) == Some(val)))
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = candidates
            .into_iter()
            .filter_map(|i| {
                self.index
                    .reconstruct(i as u32)
                    .map(|v| (i, l2_sq(v, query).sqrt()))
            })
            .sorted_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .take(k);

        Ok(ranked
            .enumerate()
            .map(|(rank, (id, distance))| self.hit(rank + 1, id as u32, distance))
            .collect())
    }

    /// Re-rank an unfiltered search by query intent: fetch `2k` candidates,
    /// count matching intent flags per hit, then sort by
    /// `(intent_score, score)` descending and truncate to `k`. Ranks from
    /// the base search are retained on the hits.
    #[inline]
    pub fn search_with_intent(
        &self,
        query: &[f32],
        intent: &BTreeMap<String, bool>,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = self.search(query, k * 2)?;

        for hit in &mut hits {
            hit.intent_score = intent_match_count(&hit.metadata, intent);
        }

        hits.sort_by(|a, b| {
            b.intent_score.cmp(&a.intent_score).then_with(|| {
                b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
            })
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// "More like this": resolve the first record whose metadata `chunk_id`
    /// equals the argument and search with its stored vector. An unknown id
    /// yields an empty list, not an error. The record itself is expected to
    /// appear as its own nearest neighbor.
    #[inline]
    pub fn find_similar_by_id(&self, chunk_id: i64, k: usize) -> Result<Vec<SearchHit>> {
        let target = self.metadata.iter().position(|m| {
            m.get("chunk_id").and_then(serde_json::Value::as_i64) == Some(chunk_id)
        });
        let Some(target) = target else {
            return Ok(Vec::new());
        };

        let Some(vector) = self.index.reconstruct(target as u32).map(|v| v.to_vec()) else {
            return Ok(Vec::new());
        };
        self.search(&vector, k)
    }

    /// Configuration plus live graph statistics. The index is graph-backed
    /// by construction, so this cannot fail; corrupt persisted state
    /// surfaces at `load` instead.
    #[inline]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_vectors: self.index.len(),
            dimension: self.config.dimension,
            distance_metric: "euclidean",
            m: self.config.m,
            ef_construction: self.config.ef_construction,
            ef_search: self.config.ef_search,
            max_level: self.index.max_level(),
            entry_point: self.index.entry_point(),
        }
    }

    /// Persist the graph blob and the JSON sidecar (`<name>.index` and
    /// `<name>_metadata.json` under `dir`).
    #[inline]
    pub fn save(&self, dir: &Path, name: &str) -> Result<()> {
        fs::create_dir_all(dir)?;

        self.index.save(&dir.join(format!("{name}.index")))?;

        let sidecar_path = dir.join(format!("{name}_metadata.json"));
        let file = File::create(&sidecar_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(
            writer,
            &Sidecar {
                metadata: &self.metadata,
                chunk_texts: &self.chunk_texts,
                hnsw_params: SidecarParams {
                    m: Some(self.config.m),
                    ef_construction: Some(self.config.ef_construction),
                    ef_search: Some(self.config.ef_search),
                    distance_metric: Some("euclidean".to_string()),
                },
            },
        )
        .map_err(|e| RagError::Index(format!("failed to write sidecar: {}", e)))?;

        info!(
            "Saved index '{}' ({} vectors) to {}",
            name,
            self.index.len(),
            dir.display()
        );
        Ok(())
    }

    /// Restore a named index. A missing or malformed file is fatal; missing
    /// individual parameter fields in the sidecar fall back to the supplied
    /// `defaults`.
    #[inline]
    pub fn load(dir: &Path, name: &str, defaults: IndexConfig) -> Result<Self> {
        let index = HnswIndex::load(&dir.join(format!("{name}.index")))?;

        let sidecar_path = dir.join(format!("{name}_metadata.json"));
        let file = File::open(&sidecar_path)?;
        let reader = BufReader::new(file);
        let sidecar: SidecarOwned = serde_json::from_reader(reader)
            .map_err(|e| RagError::Index(format!("failed to parse sidecar: {}", e)))?;

        if sidecar.metadata.len() != index.len() || sidecar.chunk_texts.len() != index.len() {
            return Err(RagError::Index(format!(
                "sidecar out of sync with graph: {} metadata entries, {} texts, {} vectors",
                sidecar.metadata.len(),
                sidecar.chunk_texts.len(),
                index.len()
            )));
        }

        let config = IndexConfig {
            dimension: index.dimension(),
            m: sidecar.hnsw_params.m.unwrap_or(defaults.m),
            ef_construction: sidecar
                .hnsw_params
                .ef_construction
                .unwrap_or(defaults.ef_construction),
            ef_search: sidecar.hnsw_params.ef_search.unwrap_or(defaults.ef_search),
        };

        info!(
            "Loaded index '{}' ({} vectors, dimension {})",
            name,
            index.len(),
            config.dimension
        );

        Ok(Self {
            index,
            config,
            metadata: sidecar.metadata,
            chunk_texts: sidecar.chunk_texts,
        })
    }

    fn hit(&self, rank: usize, id: u32, distance: f32) -> SearchHit {
        SearchHit {
            rank,
            distance,
            score: 1.0 / (1.0 + distance),
            text: self.chunk_texts[id as usize].clone(),
            metadata: self.metadata[id as usize].clone(),
            meta_score: 0.0,
            intent_score: 0,
            final_score: 0.0,
        }
    }
}
