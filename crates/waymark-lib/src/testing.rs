//! Small graph builders shared by the unit tests.

use std::collections::BTreeMap;

use geo::Coord;

use crate::coord::VertexKey;
use crate::graph::{Adjacency, SourceGraph};
use crate::weight::EdgeWeight;

pub(crate) fn key(k: &str) -> VertexKey {
    VertexKey::from(k)
}

/// Parse an `"x,y"` key back into its coordinate.
pub(crate) fn coord_of(k: &str) -> Coord<f64> {
    let mut parts = k.split(',').map(|p| p.parse::<f64>().expect("numeric key"));
    Coord {
        x: parts.next().expect("x"),
        y: parts.next().expect("y"),
    }
}

/// Source graph from directed `(from, to, weight)` triples; weight 0 is impassable.
///
/// Each edge carries its position in `edges` as auxiliary data.
pub(crate) fn source(edges: &[(&str, &str, f64)]) -> SourceGraph<Vec<u32>> {
    let mut vertices: Adjacency<EdgeWeight> = BTreeMap::new();
    let mut edge_data: Adjacency<Vec<u32>> = BTreeMap::new();
    let mut coordinates = BTreeMap::new();
    for (index, (from, to, weight)) in edges.iter().enumerate() {
        for k in [from, to] {
            vertices.entry(key(k)).or_default();
            edge_data.entry(key(k)).or_default();
            coordinates.insert(key(k), coord_of(k));
        }
        vertices
            .get_mut(&key(from))
            .expect("registered")
            .insert(key(to), EdgeWeight::from_cost(Some(*weight)));
        edge_data
            .get_mut(&key(from))
            .expect("registered")
            .insert(key(to), vec![index as u32]);
    }
    SourceGraph {
        vertices,
        edge_data: Some(edge_data),
        coordinates,
    }
}

/// Expand undirected edges into both directions.
pub(crate) fn both(
    edges: &[(&'static str, &'static str, f64)],
) -> Vec<(&'static str, &'static str, f64)> {
    edges
        .iter()
        .flat_map(|&(a, b, w)| [(a, b, w), (b, a, w)])
        .collect()
}

#[allow(clippy::ptr_arg)]
pub(crate) fn merge(accumulated: &Vec<u32>, next: &Vec<u32>) -> Vec<u32> {
    let mut merged = accumulated.clone();
    merged.extend(next.iter().copied());
    merged
}
