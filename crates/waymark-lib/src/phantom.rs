//! Temporary vertices for query endpoints.
//!
//! A query may start or finish on a vertex that compaction absorbed into a
//! chain. Such a vertex is spliced into the compacted graph for the duration of
//! the query: it gets edges to the forks at both ends of its chain, and those
//! forks get edges back to it. The splice is owned by a [`PhantomGuard`] and
//! undone when the guard is dropped, so the compacted graph always returns to
//! its prior state, whether the query succeeded or bailed out with an error.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::compactor::compact_node;
use crate::coord::VertexKey;
use crate::error::{Error, Result};
use crate::graph::{CompactedGraph, SourceGraph};
use crate::weight::EdgeReducer;

/// What a phantom insertion added to the graph.
#[derive(Debug)]
struct Splice {
    key: VertexKey,
    /// Forks that received an edge towards `key`.
    incoming: Vec<VertexKey>,
}

/// Scoped access to a compacted graph with one phantom vertex spliced in.
///
/// Dereferences to the graph, so further phantoms can be inserted through the
/// guard; they are then removed first.
#[derive(Debug)]
pub struct PhantomGuard<'a, D> {
    graph: &'a mut CompactedGraph<D>,
    splice: Option<Splice>,
}

impl<D> PhantomGuard<'_, D> {
    /// Whether a vertex was actually added (false when the key was already a fork).
    pub fn is_spliced(&self) -> bool {
        self.splice.is_some()
    }
}

impl<D: Clone> CompactedGraph<D> {
    /// Splice `key` into the graph until the returned guard is dropped.
    ///
    /// `key` must be a vertex of `source`. When it is already part of the
    /// compacted graph nothing is changed.
    pub fn insert_phantom(
        &mut self,
        source: &SourceGraph<D>,
        reducer: Option<&dyn EdgeReducer<D>>,
        key: &VertexKey,
    ) -> Result<PhantomGuard<'_, D>> {
        if self.contains(key) {
            return Ok(PhantomGuard {
                graph: self,
                splice: None,
            });
        }
        if !source.contains(key) {
            return Err(Error::invariant(format!(
                "phantom vertex {key} is not part of the source graph"
            )));
        }

        let reducer = reducer.filter(|_| self.edge_data.is_some());
        let mut node = compact_node(source, reducer, key, |k| self.contains(k), true)?;

        let mut incoming = Vec::with_capacity(node.incoming_edges.len());
        for (fork, weight) in node.incoming_edges {
            let Some(targets) = self.vertices.get_mut(&fork) else {
                continue;
            };
            targets.insert(key.clone(), weight);
            if let Some(polyline) = node.incoming_coordinates.remove(&fork) {
                self.coordinates
                    .entry(fork.clone())
                    .or_default()
                    .insert(key.clone(), polyline);
            }
            if let (Some(edge_data), Some(datum)) = (
                self.edge_data.as_mut(),
                node.incoming_edge_data.remove(&fork),
            ) {
                edge_data
                    .entry(fork.clone())
                    .or_default()
                    .insert(key.clone(), datum);
            }
            incoming.push(fork);
        }

        debug!(
            phantom = %key,
            outgoing = node.edges.len(),
            incoming = incoming.len(),
            "inserted phantom vertex"
        );
        self.vertices.insert(key.clone(), node.edges);
        self.coordinates.insert(key.clone(), node.coordinates);
        if let Some(edge_data) = self.edge_data.as_mut() {
            edge_data.insert(key.clone(), node.edge_data);
        }

        Ok(PhantomGuard {
            graph: self,
            splice: Some(Splice {
                key: key.clone(),
                incoming,
            }),
        })
    }
}

impl<D> Drop for PhantomGuard<'_, D> {
    fn drop(&mut self) {
        let Some(splice) = self.splice.take() else {
            return;
        };

        let graph = &mut *self.graph;
        graph.vertices.remove(&splice.key);
        graph.coordinates.remove(&splice.key);
        if let Some(edge_data) = graph.edge_data.as_mut() {
            edge_data.remove(&splice.key);
        }
        for fork in &splice.incoming {
            if let Some(targets) = graph.vertices.get_mut(fork) {
                targets.remove(&splice.key);
            }
            if let Some(polylines) = graph.coordinates.get_mut(fork) {
                polylines.remove(&splice.key);
            }
            if let Some(values) = graph.edge_data.as_mut().and_then(|data| data.get_mut(fork)) {
                values.remove(&splice.key);
            }
        }
        debug!(phantom = %splice.key, "removed phantom vertex");
    }
}

impl<D> Deref for PhantomGuard<'_, D> {
    type Target = CompactedGraph<D>;

    fn deref(&self) -> &Self::Target {
        self.graph
    }
}

impl<D> DerefMut for PhantomGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.graph
    }
}
