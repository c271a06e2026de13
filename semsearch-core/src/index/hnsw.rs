//! HNSW graph for approximate search over large corpora

use instant_distance::{Builder, HnswMap, Point, Search};

use super::distance::unit_distance;
use super::IndexConfig;

/// Unit-length vector as an HNSW point
#[derive(Clone)]
struct UnitPoint(Vec<f32>);

impl Point for UnitPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance = 1 - similarity (HNSW finds minimum)
        unit_distance(&self.0, &other.0)
    }
}

/// HNSW graph whose values are insertion ordinals
pub(crate) struct HnswGraph {
    map: HnswMap<UnitPoint, usize>,
    ef_search: usize,
}

impl HnswGraph {
    /// Build over unit vectors; seeded so rebuilds give the same graph
    pub(crate) fn build(units: Vec<Vec<f32>>, config: &IndexConfig) -> Self {
        let ordinals: Vec<usize> = (0..units.len()).collect();
        let points: Vec<UnitPoint> = units.into_iter().map(UnitPoint).collect();

        let map = Builder::default()
            .ef_construction(config.ef_construction)
            .ef_search(config.ef_search)
            .seed(config.seed)
            .build(points, ordinals);

        Self {
            map,
            ef_search: config.ef_search,
        }
    }

    /// Most candidates one traversal can yield
    pub(crate) fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Ordinals of up to `k` approximate nearest neighbors
    pub(crate) fn search(&self, unit_query: &[f32], k: usize) -> Vec<usize> {
        let query = UnitPoint(unit_query.to_vec());
        let mut search = Search::default();
        self.map
            .search(&query, &mut search)
            .take(k)
            .map(|item| *item.value)
            .collect()
    }
}
