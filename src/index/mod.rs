// Vector index module
// Owns the HNSW graph and the record store built on top of it

pub mod hnsw;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use hnsw::HnswIndex;
pub use store::{SearchHit, VectorStore};

/// Metadata attached to an indexed chunk. Carries `chunk_id`, `page_number`,
/// `filename`, `source_document`, `chunking_strategy`, page/document fields
/// (`header`, `footer`, `title`, `author`, `year`, `section_title`) and
/// optionally an `intent` sub-object of boolean flags.
pub type ChunkMetadata = serde_json::Map<String, Value>;

/// Construction parameters for the HNSW graph. Fixed for the lifetime of an
/// index instance and persisted alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Vector dimension; every vector added to the index must match
    pub dimension: usize,
    /// Graph connectivity (max neighbors per node per layer)
    pub m: usize,
    /// Candidate list size while building the graph
    pub ef_construction: usize,
    /// Default candidate list size while querying
    pub ef_search: usize,
}

impl Default for IndexConfig {
    #[inline]
    fn default() -> Self {
        Self {
            dimension: 768,
            m: 32,
            ef_construction: 200,
            ef_search: 50,
        }
    }
}

/// Snapshot of index configuration and live graph statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub distance_metric: &'static str,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_level: u8,
    pub entry_point: Option<u32>,
}

/// Count how many intent flags are requested by the query and set true in
/// the chunk's `metadata.intent` sub-object.
#[inline]
pub fn intent_match_count(metadata: &ChunkMetadata, intent: &BTreeMap<String, bool>) -> u32 {
    let Some(chunk_intent) = metadata.get("intent").and_then(Value::as_object) else {
        return 0;
    };

    intent
        .iter()
        .filter(|&(ref key, &want)| {
            want && chunk_intent.get(*key).and_then(Value::as_bool) == Some(true)
        })
        .count() as u32
}
