//! In-memory vector index
//!
//! Built once from a set of [`IndexedItem`]s and immutable afterwards, so any
//! number of threads can search it without locking. Distances are cosine
//! distances (`1 - cos`), nearest first, ties in insertion order.
//!
//! Small corpora are always scanned exhaustively. Above
//! [`IndexConfig::exact_threshold`] the default [`SearchStrategy::Auto`]
//! switches to an HNSW graph, and results say so via
//! [`SearchResult::exact`].

mod distance;
mod hnsw;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Result, SemsearchError};
use crate::item::{IndexedItem, SearchNeighbor, SearchResult};
use hnsw::HnswGraph;

pub use distance::{cosine_distance, cosine_similarity, l2_norm, normalize};
use distance::unit_distance;

/// How the index answers queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Always scan every item
    Exact,
    /// Always traverse an HNSW graph
    Approximate,
    /// Exact up to `exact_threshold` items, HNSW above
    #[default]
    Auto,
}

/// Index configuration
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub strategy: SearchStrategy,
    /// Largest corpus `Auto` still scans exactly (default: 4096)
    pub exact_threshold: usize,
    /// HNSW build beam width (default: 100)
    pub ef_construction: usize,
    /// HNSW query beam width; larger `k` falls back to a scan (default: 100)
    pub ef_search: usize,
    /// HNSW level assignment seed
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Auto,
            exact_threshold: 4096,
            ef_construction: 100,
            ef_search: 100,
            seed: 0x5eed,
        }
    }
}

impl IndexConfig {
    pub fn exact() -> Self {
        Self {
            strategy: SearchStrategy::Exact,
            ..Self::default()
        }
    }

    pub fn approximate() -> Self {
        Self {
            strategy: SearchStrategy::Approximate,
            ..Self::default()
        }
    }
}

struct Entry {
    item: IndexedItem,
    unit: Vec<f32>,
}

/// Ranking key: distance first, then insertion order
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    ordinal: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Immutable nearest-neighbor index
pub struct VectorIndex {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
    dimension: Option<usize>,
    hnsw: Option<HnswGraph>,
}

impl VectorIndex {
    /// Build with the default configuration
    pub fn build(items: Vec<IndexedItem>) -> Result<Self> {
        Self::build_with_config(items, IndexConfig::default())
    }

    /// Take ownership of `items` and index them.
    ///
    /// Fails on mixed dimensionality, empty or non-finite embeddings, and
    /// duplicate ids (duplicates are rejected, never overwritten).
    pub fn build_with_config(items: Vec<IndexedItem>, config: IndexConfig) -> Result<Self> {
        let mut entries = Vec::with_capacity(items.len());
        let mut positions = HashMap::with_capacity(items.len());
        let mut dimension = None;

        for item in items {
            let got = item.embedding.len();
            match dimension {
                None => dimension = Some(got),
                Some(expected) if expected != got => {
                    return Err(SemsearchError::dimension_mismatch(expected, got));
                }
                Some(_) => {}
            }

            if got == 0 {
                return Err(SemsearchError::invalid_input(format!(
                    "item {} has an empty embedding",
                    item.id
                )));
            }
            if item.embedding.iter().any(|x| !x.is_finite()) {
                return Err(SemsearchError::invalid_input(format!(
                    "item {} has a non-finite component",
                    item.id
                )));
            }
            if positions.insert(item.id.clone(), entries.len()).is_some() {
                return Err(SemsearchError::DuplicateId(item.id));
            }

            let unit = normalize(&item.embedding);
            entries.push(Entry { item, unit });
        }

        let use_hnsw = match config.strategy {
            SearchStrategy::Exact => false,
            SearchStrategy::Approximate => !entries.is_empty(),
            SearchStrategy::Auto => entries.len() > config.exact_threshold,
        };
        let hnsw = use_hnsw
            .then(|| HnswGraph::build(entries.iter().map(|e| e.unit.clone()).collect(), &config));

        log::info!(
            "Built vector index: {} items, {}d, {}",
            entries.len(),
            dimension.unwrap_or(0),
            if hnsw.is_some() { "hnsw" } else { "exact scan" }
        );

        Ok(Self {
            entries,
            positions,
            dimension,
            hnsw,
        })
    }

    /// The `k` nearest items to `query`, nearest first.
    ///
    /// Returns every item when the index holds fewer than `k`, and nothing
    /// when it is empty.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchResult> {
        if k == 0 {
            return Err(SemsearchError::invalid_input("k must be at least 1"));
        }
        let Some(dimension) = self.dimension else {
            return Ok(SearchResult::empty());
        };
        if query.len() != dimension {
            return Err(SemsearchError::dimension_mismatch(dimension, query.len()));
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(SemsearchError::invalid_input("query has a non-finite component"));
        }

        let unit = normalize(query);
        if let Some(graph) = self.hnsw.as_ref().filter(|g| k <= g.ef_search()) {
            if let Some(result) = self.approximate(graph, &unit, k) {
                return Ok(result);
            }
            log::debug!("HNSW returned too few candidates, scanning");
        }

        Ok(self.exact(&unit, k))
    }

    /// Bounded max-heap scan over every entry
    fn exact(&self, unit: &[f32], k: usize) -> SearchResult {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

        for (ordinal, entry) in self.entries.iter().enumerate() {
            let candidate = Candidate {
                distance: unit_distance(unit, &entry.unit),
                ordinal,
            };

            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        self.to_result(heap.into_sorted_vec(), true)
    }

    fn approximate(&self, graph: &HnswGraph, unit: &[f32], k: usize) -> Option<SearchResult> {
        let mut candidates: Vec<Candidate> = graph
            .search(unit, k)
            .into_iter()
            .map(|ordinal| Candidate {
                distance: unit_distance(unit, &self.entries[ordinal].unit),
                ordinal,
            })
            .collect();

        if candidates.len() < k.min(self.entries.len()) {
            return None;
        }

        candidates.sort();
        Some(self.to_result(candidates, false))
    }

    fn to_result(&self, ranked: Vec<Candidate>, exact: bool) -> SearchResult {
        let neighbors = ranked
            .into_iter()
            .map(|c| {
                let item = &self.entries[c.ordinal].item;
                SearchNeighbor {
                    id: item.id.clone(),
                    title: item.title.clone(),
                    url: item.url.clone(),
                    distance: c.distance,
                }
            })
            .collect();

        SearchResult { neighbors, exact }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding width, or `None` for an empty index
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// True unless queries may go through the HNSW graph
    pub fn is_exact(&self) -> bool {
        self.hnsw.is_none()
    }

    pub fn get(&self, id: &str) -> Option<&IndexedItem> {
        self.positions.get(id).map(|&i| &self.entries[i].item)
    }

    /// Items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &IndexedItem> {
        self.entries.iter().map(|e| &e.item)
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("len", &self.len())
            .field("dimension", &self.dimension)
            .field("exact", &self.is_exact())
            .finish()
    }
}
