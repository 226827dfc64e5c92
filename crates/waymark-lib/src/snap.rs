//! Nearest-vertex lookup for query points that are not exactly on the network.

use geo::Coord;
use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::coord::VertexKey;
use crate::graph::SourceGraph;

const BUCKET_SIZE: usize = 256;

/// KD-tree over the routable vertices of a source graph.
///
/// Only vertices with at least one passable outgoing edge are indexed, so a
/// snapped point can always leave its vertex.
pub struct SnapIndex {
    tree: KdTree<f64, usize, 2, BUCKET_SIZE, u32>,
    keys: Vec<VertexKey>,
}

impl SnapIndex {
    pub fn build<D>(source: &SourceGraph<D>) -> Self {
        let mut tree: KdTree<f64, usize, 2, BUCKET_SIZE, u32> = KdTree::new();
        let mut keys = Vec::new();

        for (key, edges) in &source.vertices {
            if !edges.values().any(|weight| weight.is_passable()) {
                continue;
            }
            let Some(coord) = source.coordinates.get(key) else {
                continue;
            };
            tree.add(&[coord.x, coord.y], keys.len());
            keys.push(key.clone());
        }

        debug!(indexed = keys.len(), "built snap index");
        Self { tree, keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Closest indexed vertex and its planar distance to `coord`.
    pub fn nearest(&self, coord: Coord<f64>) -> Option<(VertexKey, f64)> {
        if self.keys.is_empty() {
            return None;
        }

        self.tree
            .nearest_n::<SquaredEuclidean>(&[coord.x, coord.y], 1)
            .into_iter()
            .next()
            .map(|neighbour| (self.keys[neighbour.item].clone(), neighbour.distance.sqrt()))
    }
}

impl std::fmt::Debug for SnapIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapIndex")
            .field("len", &self.keys.len())
            .finish()
    }
}
