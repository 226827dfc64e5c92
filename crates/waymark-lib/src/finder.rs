//! Query façade.
//!
//! [`PathFinderBuilder`] runs the whole preprocessing pipeline (topology,
//! weights, compaction) over a [`Network`]; the resulting [`PathFinder`] answers
//! shortest-path queries between network coordinates.
//!
//! A `PathFinder` mutates its compacted graph while a query runs, so queries
//! take `&mut self`. Independent finders can be cloned for parallel use.

use std::fmt;
use std::sync::Arc;

use geo::{Coord, LineString};
use geojson::{Feature, Geometry, JsonObject};
use serde::Serialize;
use tracing::{debug, info};

use crate::compactor::{check_degenerate, compact_graph};
use crate::coord::VertexKey;
use crate::error::{Error, Result};
use crate::graph::{assign_weights, CompactedGraph, RoutingGraph, SourceGraph};
use crate::options::GraphOptions;
use crate::search::{find_shortest_path, SearchResult};
use crate::snap::SnapIndex;
use crate::topology::{build_topology, Network};
use crate::weight::{haversine_weight, EdgeReducer, Weight, WeightFn};

type SeedFn<P, D> = Arc<dyn Fn(&P) -> D + Send + Sync>;

/// A route between two network coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path<D> {
    /// Full geometry from start to finish, both included.
    pub coordinates: Vec<Coord<f64>>,
    pub weight: f64,
    /// One reduced value per compacted edge, when edge data is tracked.
    pub edge_data: Option<Vec<D>>,
    /// Compacted-graph vertices the route passes, start and finish included.
    pub vertices: Vec<VertexKey>,
}

impl<D: Serialize> Path<D> {
    /// Render the route as a GeoJSON `LineString` feature.
    pub fn to_feature(&self) -> Result<Feature> {
        let geometry = Geometry::from(&LineString::new(self.coordinates.clone()));
        let mut properties = JsonObject::new();
        properties.insert("weight".to_string(), serde_json::to_value(self.weight)?);
        if let Some(edge_data) = &self.edge_data {
            properties.insert("edge_data".to_string(), serde_json::to_value(edge_data)?);
        }

        Ok(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

/// Configures how a [`Network`] is turned into a [`PathFinder`].
pub struct PathFinderBuilder<P, D = ()> {
    options: GraphOptions,
    weight: Arc<dyn WeightFn<P>>,
    seed: Option<SeedFn<P, D>>,
    reducer: Option<Arc<dyn EdgeReducer<D>>>,
}

impl<P: 'static> PathFinderBuilder<P, ()> {
    /// Builder weighing edges by great-circle length in kilometres.
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            weight: Arc::new(haversine_weight::<P>),
            seed: None,
            reducer: None,
        }
    }
}

impl<P, D> PathFinderBuilder<P, D> {
    /// Replace the weight function.
    pub fn weight<F>(mut self, weight: F) -> Self
    where
        F: Fn(Coord<f64>, Coord<f64>, &P) -> Option<Weight> + Send + Sync + 'static,
    {
        self.weight = Arc::new(weight);
        self
    }

    /// Track auxiliary data per edge.
    ///
    /// `seed` derives the value of one topology edge from its line's
    /// properties; `reducer` folds values along compacted chains.
    pub fn edge_data<E, S, R>(self, seed: S, reducer: R) -> PathFinderBuilder<P, E>
    where
        S: Fn(&P) -> E + Send + Sync + 'static,
        R: Fn(&E, &E) -> E + Send + Sync + 'static,
    {
        PathFinderBuilder {
            options: self.options,
            weight: self.weight,
            seed: Some(Arc::new(seed)),
            reducer: Some(Arc::new(reducer)),
        }
    }

    /// Preprocess `network` into a ready-to-query path finder.
    pub fn build(&self, network: &Network<P>) -> Result<PathFinder<D>>
    where
        D: Clone,
    {
        info!(features = network.len(), "building routing graph");

        let topology = build_topology(network, &self.options);
        let seed = self.seed.as_deref().map(|seed| seed as &dyn Fn(&P) -> D);
        let source = assign_weights(&topology, self.weight.as_ref(), seed, &self.options);
        let compacted = compact_graph(&source, self.reducer.as_deref(), &self.options)?;

        Ok(PathFinder::assemble(
            RoutingGraph { source, compacted },
            self.options.clone(),
            self.reducer.clone(),
        ))
    }
}

impl<P, D> fmt::Debug for PathFinderBuilder<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFinderBuilder")
            .field("options", &self.options)
            .field("edge_data", &self.seed.is_some())
            .finish()
    }
}

/// Answers shortest-path queries over a preprocessed network.
#[derive(Clone)]
pub struct PathFinder<D> {
    graph: RoutingGraph<D>,
    options: GraphOptions,
    reducer: Option<Arc<dyn EdgeReducer<D>>>,
    snap: Arc<SnapIndex>,
}

impl<D: Clone> PathFinder<D> {
    /// Resume from a stored graph without preprocessing again.
    ///
    /// `options` must use the tolerance and key function the graph was built
    /// with. Without a `reducer`, paths carry no edge data.
    pub fn from_graph<R>(
        graph: RoutingGraph<D>,
        options: GraphOptions,
        reducer: Option<R>,
    ) -> Result<Self>
    where
        R: Fn(&D, &D) -> D + Send + Sync + 'static,
    {
        check_degenerate(&graph.compacted, graph.source.vertex_count(), options.degenerate)?;
        let reducer = reducer.map(|r| Arc::new(r) as Arc<dyn EdgeReducer<D>>);
        Ok(Self::assemble(graph, options, reducer))
    }

    fn assemble(
        graph: RoutingGraph<D>,
        options: GraphOptions,
        reducer: Option<Arc<dyn EdgeReducer<D>>>,
    ) -> Self {
        let snap = Arc::new(SnapIndex::build(&graph.source));
        Self {
            graph,
            options,
            reducer,
            snap,
        }
    }

    /// Find the cheapest path between two coordinates of the network.
    ///
    /// Both coordinates are snapped with the graph's tolerance. Returns
    /// `Ok(None)` when either is not a network vertex or no route exists.
    pub fn find_path(&mut self, start: Coord<f64>, finish: Coord<f64>) -> Result<Option<Path<D>>> {
        let start = self.options.vertex_key(start);
        let finish = self.options.vertex_key(finish);
        for key in [&start, &finish] {
            if !self.graph.source.contains(key) {
                debug!(vertex = %key, "query endpoint is not a network vertex");
                return Ok(None);
            }
        }

        self.route(&start, &finish)
    }

    /// Like [`find_path`](Self::find_path), but first moves both coordinates to
    /// their nearest routable vertex.
    pub fn find_path_snapped(
        &mut self,
        start: Coord<f64>,
        finish: Coord<f64>,
    ) -> Result<Option<Path<D>>> {
        let (Some((start, _)), Some((finish, _))) =
            (self.snap.nearest(start), self.snap.nearest(finish))
        else {
            return Ok(None);
        };

        self.route(&start, &finish)
    }

    /// Nearest vertex with a passable outgoing edge, and its planar distance.
    pub fn nearest_vertex(&self, coord: Coord<f64>) -> Option<(VertexKey, Coord<f64>, f64)> {
        let (key, distance) = self.snap.nearest(coord)?;
        let position = self.graph.source.coordinates.get(&key).copied()?;
        Some((key, position, distance))
    }

    pub fn graph(&self) -> &RoutingGraph<D> {
        &self.graph
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    fn route(&mut self, start: &VertexKey, finish: &VertexKey) -> Result<Option<Path<D>>> {
        let source = &self.graph.source;
        let reducer = self.reducer.as_deref();

        let mut start_guard = self
            .graph
            .compacted
            .insert_phantom(source, reducer, start)?;
        let finish_guard = start_guard.insert_phantom(source, reducer, finish)?;

        let Some(result) = find_shortest_path(&finish_guard.vertices, start, finish)? else {
            debug!(%start, %finish, "no route between vertices");
            return Ok(None);
        };

        let tracks_data = reducer.is_some() && finish_guard.edge_data.is_some();
        expand_path(&finish_guard, source, result, tracks_data).map(Some)
    }
}

impl<D> fmt::Debug for PathFinder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFinder")
            .field("vertices", &self.graph.source.vertex_count())
            .field("forks", &self.graph.compacted.vertex_count())
            .field("options", &self.options)
            .field("snap", &self.snap)
            .finish()
    }
}

/// Turn a vertex sequence into full geometry and per-edge data.
fn expand_path<D: Clone>(
    compacted: &CompactedGraph<D>,
    source: &SourceGraph<D>,
    result: SearchResult,
    tracks_data: bool,
) -> Result<Path<D>> {
    let finish = result
        .vertices
        .last()
        .ok_or_else(|| Error::invariant("search returned an empty vertex sequence"))?;

    let mut coordinates = Vec::new();
    let mut edge_data = tracks_data.then(|| Vec::with_capacity(result.vertices.len()));
    for pair in result.vertices.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        coordinates.extend_from_slice(compacted.segment(from, to)?);
        if let Some(values) = edge_data.as_mut() {
            let value = compacted.segment_data(from, to).ok_or_else(|| {
                Error::invariant(format!("no edge data recorded for {from} -> {to}"))
            })?;
            values.push(value.clone());
        }
    }
    coordinates.push(source.coordinate(finish)?);

    Ok(Path {
        coordinates,
        weight: result.cost,
        edge_data,
        vertices: result.vertices,
    })
}
