//! Line network input and its vertex/edge topology.
//!
//! The topology step is deliberately simple: each coordinate of each line is
//! snapped to a vertex key and consecutive coordinates become an edge carrying
//! a reference to the line's properties. No geometry is split or merged.

use std::collections::BTreeMap;

use geo::Coord;

use crate::coord::VertexKey;
use crate::options::{GraphOptions, ProgressStage};

/// A line-shaped feature of the input network.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature<P> {
    pub coordinates: Vec<Coord<f64>>,
    pub properties: P,
}

impl<P> LineFeature<P> {
    pub fn new(coordinates: impl IntoIterator<Item = Coord<f64>>, properties: P) -> Self {
        Self {
            coordinates: coordinates.into_iter().collect(),
            properties,
        }
    }
}

/// A collection of line features.
#[derive(Debug, Clone, PartialEq)]
pub struct Network<P> {
    pub features: Vec<LineFeature<P>>,
}

impl<P> Network<P> {
    pub fn new(features: Vec<LineFeature<P>>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<P> FromIterator<LineFeature<P>> for Network<P> {
    fn from_iter<I: IntoIterator<Item = LineFeature<P>>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Undirected edge between two consecutive line coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyEdge<'a, P> {
    pub from: VertexKey,
    pub to: VertexKey,
    pub properties: &'a P,
}

/// Deduplicated vertices and the raw edges between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology<'a, P> {
    /// First coordinate seen for each vertex key.
    pub vertices: BTreeMap<VertexKey, Coord<f64>>,
    pub edges: Vec<TopologyEdge<'a, P>>,
}

/// Build the vertex/edge topology of a network.
///
/// Segments whose two ends snap to the same vertex are dropped.
pub fn build_topology<'a, P>(network: &'a Network<P>, options: &GraphOptions) -> Topology<'a, P> {
    let total: usize = network.features.iter().map(|f| f.coordinates.len()).sum();
    let mut vertices = BTreeMap::new();
    let mut edges = Vec::with_capacity(total);
    let mut seen = 0;

    for (index, feature) in network.features.iter().enumerate() {
        let mut previous: Option<VertexKey> = None;
        for &coord in &feature.coordinates {
            let key = options.vertex_key(coord);
            vertices.entry(key.clone()).or_insert(coord);
            options.report(ProgressStage::TopologyVertices, seen, total);
            seen += 1;

            if let Some(from) = previous.take() {
                if from != key {
                    edges.push(TopologyEdge {
                        from,
                        to: key.clone(),
                        properties: &feature.properties,
                    });
                }
            }
            previous = Some(key);
        }
        options.report(ProgressStage::TopologyEdges, index, network.features.len());
    }

    Topology { vertices, edges }
}
