use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coord::VertexKey;
use crate::error::{Error, Result};
use crate::options::{GraphOptions, ProgressStage};
use crate::topology::Topology;
use crate::weight::{EdgeWeight, WeightFn};

/// Directed per-edge values: `map[from][to]`.
pub type Adjacency<T> = BTreeMap<VertexKey, BTreeMap<VertexKey, T>>;

/// Full directed graph with one vertex per distinct network coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceGraph<D> {
    pub vertices: Adjacency<EdgeWeight>,
    /// Seed value of every stored edge, present only when edge data is tracked.
    pub edge_data: Option<Adjacency<D>>,
    pub coordinates: BTreeMap<VertexKey, Coord<f64>>,
}

impl<D> SourceGraph<D> {
    pub fn contains(&self, key: &VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    pub fn neighbours(&self, key: &VertexKey) -> Option<&BTreeMap<VertexKey, EdgeWeight>> {
        self.vertices.get(key)
    }

    pub fn coordinate(&self, key: &VertexKey) -> Result<Coord<f64>> {
        self.coordinates
            .get(key)
            .copied()
            .ok_or_else(|| Error::MissingCoordinate { key: key.clone() })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.vertices.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn edge_datum(&self, from: &VertexKey, to: &VertexKey) -> Option<&D> {
        self.edge_data.as_ref()?.get(from)?.get(to)
    }
}

/// Graph reduced to forks, with the geometry of the chains between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactedGraph<D> {
    pub vertices: Adjacency<EdgeWeight>,
    /// Polyline of each compacted edge, starting at the source vertex and
    /// excluding the target vertex.
    pub coordinates: Adjacency<Vec<Coord<f64>>>,
    pub edge_data: Option<Adjacency<D>>,
}

impl<D> CompactedGraph<D> {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, key: &VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.vertices.values().map(BTreeMap::len).sum()
    }

    pub fn weight(&self, from: &VertexKey, to: &VertexKey) -> Option<EdgeWeight> {
        self.vertices.get(from)?.get(to).copied()
    }

    /// Polyline stored for the compacted edge `from -> to`.
    pub fn segment(&self, from: &VertexKey, to: &VertexKey) -> Result<&[Coord<f64>]> {
        self.coordinates
            .get(from)
            .and_then(|targets| targets.get(to))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::invariant(format!("compacted edge {from} -> {to} has no coordinates"))
            })
    }

    /// Reduced edge value stored for `from -> to`, if edge data is tracked.
    pub fn segment_data(&self, from: &VertexKey, to: &VertexKey) -> Option<&D> {
        self.edge_data.as_ref()?.get(from)?.get(to)
    }
}

/// Complete persistent routing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingGraph<D> {
    pub source: SourceGraph<D>,
    pub compacted: CompactedGraph<D>,
}

impl<D> RoutingGraph<D> {
    pub fn has_edge_data(&self) -> bool {
        self.source.edge_data.is_some()
    }
}

/// Apply `weight` to every topology edge and build the directed source graph.
///
/// Both endpoints of every edge are registered even when the edge itself is
/// dropped. When `seed` is given, every stored edge also records
/// `seed(properties)`. Duplicate edges keep the cheaper direction weight.
pub fn assign_weights<P, D>(
    topology: &Topology<'_, P>,
    weight: &dyn WeightFn<P>,
    seed: Option<&dyn Fn(&P) -> D>,
    options: &GraphOptions,
) -> SourceGraph<D> {
    let mut vertices: Adjacency<EdgeWeight> = BTreeMap::new();
    let mut edge_data: Option<Adjacency<D>> = seed.map(|_| BTreeMap::new());
    let total = topology.edges.len();

    for (index, edge) in topology.edges.iter().enumerate() {
        options.report(ProgressStage::EdgeWeights, index, total);

        for key in [&edge.from, &edge.to] {
            vertices.entry(key.clone()).or_default();
            if let Some(data) = edge_data.as_mut() {
                data.entry(key.clone()).or_default();
            }
        }

        let (Some(&from_coord), Some(&to_coord)) = (
            topology.vertices.get(&edge.from),
            topology.vertices.get(&edge.to),
        ) else {
            continue;
        };
        let Some(result) = weight.weight(from_coord, to_coord, edge.properties) else {
            continue;
        };
        let (forward, backward) = result.directions();
        if !forward.is_passable() && !backward.is_passable() {
            continue;
        }

        let directions = [
            (&edge.from, &edge.to, forward),
            (&edge.to, &edge.from, backward),
        ];
        for (from, to, cost) in directions {
            let targets = vertices.entry(from.clone()).or_default();
            let replaced = match targets.entry(to.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(cost);
                    true
                }
                Entry::Occupied(mut slot) => {
                    if cost < *slot.get() {
                        slot.insert(cost);
                        true
                    } else {
                        false
                    }
                }
            };

            if replaced {
                if let (Some(data), Some(seed)) = (edge_data.as_mut(), seed) {
                    data.entry(from.clone())
                        .or_default()
                        .insert(to.clone(), seed(edge.properties));
                }
            }
        }
    }

    let graph = SourceGraph {
        vertices,
        edge_data,
        coordinates: topology.vertices.clone(),
    };

    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "assigned edge weights"
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{build_topology, LineFeature, Network};
    use crate::weight::{euclidean_weight, Weight};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn key(k: &str) -> VertexKey {
        VertexKey::from(k)
    }

    fn two_segments() -> Network<u32> {
        Network::new(vec![
            LineFeature::new([c(0.0, 0.0), c(1.0, 0.0)], 7),
            LineFeature::new([c(1.0, 0.0), c(1.0, 1.0)], 8),
        ])
    }

    #[test]
    fn symmetric_weights_create_both_directions() {
        let network = two_segments();
        let options = GraphOptions::default();
        let topology = build_topology(&network, &options);
        let graph: SourceGraph<()> =
            assign_weights(&topology, &euclidean_weight::<u32>, None, &options);

        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.vertices[&key("0,0")][&key("1,0")], EdgeWeight::Passable(1.0));
        assert_eq!(graph.vertices[&key("1,0")][&key("0,0")], EdgeWeight::Passable(1.0));
        assert!(graph.edge_data.is_none());
    }

    #[test]
    fn forward_only_weight_marks_backward_impassable() {
        let network = two_segments();
        let options = GraphOptions::default();
        let topology = build_topology(&network, &options);
        let forward = |a: Coord<f64>, b: Coord<f64>, _: &u32| {
            Some(Weight::forward((b.x - a.x).hypot(b.y - a.y)))
        };
        let graph: SourceGraph<()> = assign_weights(&topology, &forward, None, &options);

        assert!(graph.vertices[&key("0,0")][&key("1,0")].is_passable());
        assert_eq!(graph.vertices[&key("1,0")][&key("0,0")], EdgeWeight::Impassable);
    }

    #[test]
    fn unusable_edges_still_register_vertices() {
        let network = two_segments();
        let options = GraphOptions::default();
        let topology = build_topology(&network, &options);
        let blocked = |_: Coord<f64>, _: Coord<f64>, p: &u32| {
            if *p == 8 {
                Some(Weight::Symmetric(0.0))
            } else {
                Some(Weight::Symmetric(1.0))
            }
        };
        let graph: SourceGraph<()> = assign_weights(&topology, &blocked, None, &options);

        assert!(graph.contains(&key("1,1")));
        assert!(graph.neighbours(&key("1,1")).expect("registered").is_empty());
        assert!(!graph.vertices[&key("1,0")].contains_key(&key("1,1")));
    }

    #[test]
    fn seeds_are_stored_per_edge() {
        let network = two_segments();
        let options = GraphOptions::default();
        let topology = build_topology(&network, &options);
        let seed: &dyn Fn(&u32) -> Vec<u32> = &|p: &u32| vec![*p];
        let graph = assign_weights(&topology, &euclidean_weight::<u32>, Some(seed), &options);

        let data = graph.edge_data.as_ref().expect("edge data");
        assert_eq!(data[&key("0,0")][&key("1,0")], vec![7]);
        assert_eq!(data[&key("1,1")][&key("1,0")], vec![8]);
    }

    #[test]
    fn duplicate_edges_keep_cheaper_weight() {
        let network = Network::new(vec![
            LineFeature::new([c(0.0, 0.0), c(1.0, 0.0)], 5.0),
            LineFeature::new([c(0.0, 0.0), c(1.0, 0.0)], 2.0),
        ]);
        let options = GraphOptions::default();
        let topology = build_topology(&network, &options);
        let by_property = |_: Coord<f64>, _: Coord<f64>, p: &f64| Some(Weight::Symmetric(*p));
        let graph: SourceGraph<()> = assign_weights(&topology, &by_property, None, &options);

        assert_eq!(graph.vertices[&key("0,0")][&key("1,0")], EdgeWeight::Passable(2.0));
    }
}
