//! From-scratch HNSW (Hierarchical Navigable Small World) graph.
//!
//! Multi-layer graph where higher layers hold exponentially fewer nodes.
//! Search greedily descends from the top layer, then runs a beam search at
//! layer 0 with a tunable candidate list size (`ef`). Distances are squared
//! Euclidean (L2); lower is closer.

#[cfg(test)]
mod tests;

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::IndexConfig;
use crate::{RagError, Result};

/// Hard cap on layer assignment; with M >= 4 this covers billions of nodes.
const LEVEL_CAP: u8 = 16;

/// Squared Euclidean distance between two equal-length vectors.
#[inline]
pub(crate) fn l2_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Graph node: owned vector plus per-layer neighbor lists.
/// `neighbors.len() == level + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    level: u8,
    vector: Vec<f32>,
    neighbors: Vec<Vec<u32>>,
}

/// Heap entry ordered by distance. NaN compares equal; vectors are finite by
/// the time they reach the graph.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist: f32,
    id: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.partial_cmp(&other.dist).unwrap_or(Ordering::Equal)
    }
}

/// The HNSW graph. Ids are dense and assigned in insertion order; records
/// are never removed or reassigned.
#[derive(Debug, Serialize, Deserialize)]
pub struct HnswIndex {
    dimension: usize,
    m: usize,
    m_max0: usize,
    ef_construction: usize,
    level_mult: f64,
    nodes: Vec<Node>,
    entry_point: Option<u32>,
    max_level: u8,
    rng_state: u64,
}

impl HnswIndex {
    #[inline]
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            dimension: config.dimension,
            m: config.m,
            m_max0: config.m * 2,
            ef_construction: config.ef_construction,
            level_mult: 1.0 / (config.m as f64).ln(),
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            rng_state: 42,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    #[inline]
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Stored vector for `id`, if the id has been assigned.
    #[inline]
    pub fn reconstruct(&self, id: u32) -> Option<&[f32]> {
        self.nodes.get(id as usize).map(|n| n.vector.as_slice())
    }

    /// Insert a vector and return its assigned id (dense, insertion order).
    #[inline]
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<u32> {
        if vector.len() != self.dimension {
            return Err(RagError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        let id = self.nodes.len() as u32;
        let level = self.select_level();
        self.nodes.push(Node {
            level,
            vector,
            neighbors: vec![Vec::new(); level as usize + 1],
        });

        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return Ok(id);
        };

        let query = self.nodes[id as usize].vector.clone();

        // Greedy descent through layers above the new node's level
        let mut layer = self.max_level;
        while layer > level {
            ep = self.greedy_closest(ep, &query, layer as usize);
            layer -= 1;
        }

        // Connect at each shared layer, top down
        for lc in (0..=level.min(self.max_level)).rev() {
            let found = self.search_layer(ep, &query, self.ef_construction, lc as usize);

            let m_limit = if lc == 0 { self.m_max0 } else { self.m };
            let selected: Vec<u32> = found.iter().take(m_limit).map(|c| c.id).collect();

            for &neighbor in &selected {
                self.link(neighbor, id, lc as usize);
                self.link(id, neighbor, lc as usize);
            }
            for &neighbor in &selected {
                self.prune(neighbor, lc as usize, m_limit);
            }

            if let Some(best) = found.first() {
                ep = best.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }

        Ok(id)
    }

    /// Approximate k-nearest-neighbor search with a per-call candidate list
    /// size. Returns up to `k` `(id, squared L2 distance)` pairs, ascending
    /// by distance. An empty graph yields an empty list.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<(u32, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::Index(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let Some(mut ep) = self.entry_point else {
            return Ok(Vec::new());
        };

        for layer in (1..=self.max_level as usize).rev() {
            ep = self.greedy_closest(ep, query, layer);
        }

        let found = self.search_layer(ep, query, ef.max(k), 0);
        Ok(found.into_iter().take(k).map(|c| (c.id, c.dist)).collect())
    }

    /// Persist the full graph (vectors + connectivity) as a binary blob.
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)
            .map_err(|e| RagError::Index(format!("failed to serialize graph: {}", e)))?;
        debug!("Persisted HNSW graph with {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Restore a graph previously written by [`save`](Self::save).
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let index: Self = bincode::deserialize_from(reader)
            .map_err(|e| RagError::Index(format!("failed to deserialize graph: {}", e)))?;
        debug!("Loaded HNSW graph with {} vectors from {}", index.len(), path.display());
        Ok(index)
    }

    /// Geometric layer assignment via a deterministic LCG, so index builds
    /// are reproducible.
    fn select_level(&mut self) -> u8 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        let r = ((self.rng_state >> 33) as f64 / f64::from(u32::MAX)).max(1e-12);
        let level = (-r.ln() * self.level_mult).floor() as u8;
        level.min(LEVEL_CAP)
    }

    /// Greedy single-step descent: follow improving neighbors at `layer`
    /// until no neighbor is closer.
    fn greedy_closest(&self, entry: u32, query: &[f32], layer: usize) -> u32 {
        let mut current = entry;
        let mut current_dist = l2_sq(&self.nodes[current as usize].vector, query);

        loop {
            let mut changed = false;
            let node = &self.nodes[current as usize];
            if let Some(neighbors) = node.neighbors.get(layer) {
                for &nb in neighbors {
                    let d = l2_sq(&self.nodes[nb as usize].vector, query);
                    if d < current_dist {
                        current = nb;
                        current_dist = d;
                        changed = true;
                    }
                }
            }
            if !changed {
                return current;
            }
        }
    }

    /// Beam search at a single layer. Returns up to `ef` candidates sorted
    /// ascending by distance.
    fn search_layer(&self, entry: u32, query: &[f32], ef: usize, layer: usize) -> Vec<Candidate> {
        let mut visited: HashSet<u32> = HashSet::new();
        // to_visit: min-heap by distance; results: max-heap keeping the ef closest
        let mut to_visit: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
        let mut results: BinaryHeap<Candidate> = BinaryHeap::new();

        let entry_dist = l2_sq(&self.nodes[entry as usize].vector, query);
        visited.insert(entry);
        to_visit.push(Reverse(Candidate {
            dist: entry_dist,
            id: entry,
        }));
        results.push(Candidate {
            dist: entry_dist,
            id: entry,
        });

        while let Some(Reverse(candidate)) = to_visit.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |w| w.dist);
            if candidate.dist > worst && results.len() >= ef {
                break;
            }

            let node = &self.nodes[candidate.id as usize];
            let Some(neighbors) = node.neighbors.get(layer) else {
                continue;
            };
            for &nb in neighbors {
                if !visited.insert(nb) {
                    continue;
                }
                let d = l2_sq(&self.nodes[nb as usize].vector, query);
                let worst = results.peek().map_or(f32::INFINITY, |w| w.dist);
                if d < worst || results.len() < ef {
                    to_visit.push(Reverse(Candidate { dist: d, id: nb }));
                    results.push(Candidate { dist: d, id: nb });
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    fn link(&mut self, from: u32, to: u32, layer: usize) {
        let node = &mut self.nodes[from as usize];
        if let Some(neighbors) = node.neighbors.get_mut(layer) {
            if !neighbors.contains(&to) {
                neighbors.push(to);
            }
        }
    }

    /// Drop the farthest connections once a node exceeds its per-layer cap.
    fn prune(&mut self, id: u32, layer: usize, max_neighbors: usize) {
        let over = self.nodes[id as usize]
            .neighbors
            .get(layer)
            .is_some_and(|n| n.len() > max_neighbors);
        if !over {
            return;
        }

        let vector = self.nodes[id as usize].vector.clone();
        let neighbors = self.nodes[id as usize].neighbors[layer].clone();

        let mut scored: Vec<(u32, f32)> = neighbors
            .into_iter()
            .map(|nb| (nb, l2_sq(&self.nodes[nb as usize].vector, &vector)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(max_neighbors);

        self.nodes[id as usize].neighbors[layer] = scored.into_iter().map(|(nb, _)| nb).collect();
    }
}
