//! Waymark library entry points.
//!
//! This crate turns a network of line features into a routable graph, shrinks
//! that graph down to its intersections and dead ends, and answers
//! shortest-path queries between arbitrary network coordinates. Higher-level
//! consumers (the CLI, embedding applications) should only depend on the
//! items exported here instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod compactor;
pub mod coord;
pub mod error;
pub mod finder;
pub mod geojson_io;
pub mod graph;
pub mod options;
pub mod phantom;
pub mod search;
pub mod snap;
pub mod storage;
#[cfg(test)]
mod testing;
pub mod topology;
pub mod weight;

pub use compactor::{compact_graph, compact_node, reverse_polyline, CompactedNode};
pub use coord::{default_key, round_coord, KeyFn, VertexKey};
pub use error::{Error, Result};
pub use finder::{Path, PathFinder, PathFinderBuilder};
pub use geojson_io::{network_from_geojson, read_network};
pub use graph::{assign_weights, Adjacency, CompactedGraph, RoutingGraph, SourceGraph};
pub use options::{DegeneratePolicy, GraphOptions, Progress, ProgressStage, TracingProgress};
pub use phantom::PhantomGuard;
pub use search::{find_shortest_path, SearchResult};
pub use snap::SnapIndex;
pub use storage::{load_graph, save_graph};
pub use topology::{build_topology, LineFeature, Network, Topology, TopologyEdge};
pub use weight::{
    euclidean_weight, haversine_weight, EdgeReducer, EdgeWeight, Weight, WeightFn,
};
