//! Graph compaction.
//!
//! The source graph has one vertex per network coordinate, so most vertices
//! merely continue a line. Compaction keeps only the vertices where a route can
//! actually change (forks, dead ends, asymmetric links) and replaces every
//! chain between them by a single weighted edge that remembers its polyline
//! and, optionally, a reduced auxiliary value.
//!
//! The same chain walk is used at query time to splice a phantom vertex into
//! the compacted graph (see [`crate::phantom`]); with `track_incoming` set it
//! also accumulates the cost of walking each chain backwards.

use std::collections::{BTreeMap, BTreeSet};

use geo::Coord;
use tracing::{info, warn};

use crate::coord::VertexKey;
use crate::error::{Error, Result};
use crate::graph::{Adjacency, CompactedGraph, SourceGraph};
use crate::options::{DegeneratePolicy, GraphOptions, ProgressStage};
use crate::weight::{EdgeReducer, EdgeWeight};

/// Compacted edges leaving (and optionally entering) one vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactedNode<D> {
    pub edges: BTreeMap<VertexKey, EdgeWeight>,
    pub coordinates: BTreeMap<VertexKey, Vec<Coord<f64>>>,
    pub edge_data: BTreeMap<VertexKey, D>,
    /// Cost of reaching this vertex from each fork, when tracked.
    pub incoming_edges: BTreeMap<VertexKey, EdgeWeight>,
    /// Polyline from each fork to this vertex, excluding this vertex.
    pub incoming_coordinates: BTreeMap<VertexKey, Vec<Coord<f64>>>,
    pub incoming_edge_data: BTreeMap<VertexKey, D>,
}

impl<D> Default for CompactedNode<D> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
            coordinates: BTreeMap::new(),
            edge_data: BTreeMap::new(),
            incoming_edges: BTreeMap::new(),
            incoming_coordinates: BTreeMap::new(),
            incoming_edge_data: BTreeMap::new(),
        }
    }
}

/// One walk from a vertex to the next fork.
struct Chain<'g, D> {
    end: VertexKey,
    weight: EdgeWeight,
    /// `None` when the first step has no way back.
    reverse_weight: Option<EdgeWeight>,
    /// Coordinates of the pass-through vertices, in walk order.
    coordinates: Vec<Coord<f64>>,
    data: Option<D>,
    /// Back-edge values in walk order, only collected when tracking incoming.
    back_data: Vec<&'g D>,
}

/// Reduce `source` to its forks and the chains connecting them.
pub fn compact_graph<D: Clone>(
    source: &SourceGraph<D>,
    reducer: Option<&dyn EdgeReducer<D>>,
    options: &GraphOptions,
) -> Result<CompactedGraph<D>> {
    let mut ends = if options.compact {
        find_forks(&source.vertices, options)
    } else {
        source.vertices.keys().cloned().collect()
    };
    let artificial = break_cycles(&source.vertices, &mut ends);
    if artificial > 0 {
        info!(artificial, "broke fork-free cycles with artificial forks");
    }

    let tracks_data = reducer.is_some() && source.edge_data.is_some();
    let mut compacted = CompactedGraph {
        vertices: Adjacency::new(),
        coordinates: Adjacency::new(),
        edge_data: tracks_data.then(Adjacency::new),
    };

    let total = ends.len();
    for (index, key) in ends.iter().enumerate() {
        options.report(ProgressStage::CompactNodes, index, total);

        let node = compact_node(source, reducer, key, |k| ends.contains(k), false)?;
        compacted.vertices.insert(key.clone(), node.edges);
        compacted.coordinates.insert(key.clone(), node.coordinates);
        if let Some(edge_data) = compacted.edge_data.as_mut() {
            edge_data.insert(key.clone(), node.edge_data);
        }
    }

    info!(
        source_vertices = source.vertex_count(),
        forks = compacted.vertex_count(),
        edges = compacted.edge_count(),
        "compacted graph"
    );

    check_degenerate(&compacted, source.vertex_count(), options.degenerate)?;
    Ok(compacted)
}

/// Apply the degenerate-topology policy to a compacted graph.
pub(crate) fn check_degenerate<D>(
    compacted: &CompactedGraph<D>,
    source_vertices: usize,
    policy: DegeneratePolicy,
) -> Result<()> {
    if !compacted.is_empty() {
        return Ok(());
    }

    match policy {
        DegeneratePolicy::Reject => Err(Error::DegenerateTopology {
            vertices: source_vertices,
        }),
        DegeneratePolicy::Allow => {
            warn!(
                vertices = source_vertices,
                "compacted graph has no forks; every query will return no path"
            );
            Ok(())
        }
    }
}

/// Walk every edge leaving `key` up to the nearest vertex accepted by `is_end`.
///
/// Parallel chains reaching the same end keep the cheaper one; chains that
/// loop back to `key` are dropped. With `track_incoming`, the reverse cost,
/// polyline and reduced value of each chain are recorded as well.
pub fn compact_node<D, F>(
    source: &SourceGraph<D>,
    reducer: Option<&dyn EdgeReducer<D>>,
    key: &VertexKey,
    is_end: F,
    track_incoming: bool,
) -> Result<CompactedNode<D>>
where
    D: Clone,
    F: Fn(&VertexKey) -> bool,
{
    let neighbours = source.neighbours(key).ok_or_else(|| {
        Error::invariant(format!("vertex {key} is not part of the source graph"))
    })?;
    let origin = source.coordinate(key)?;
    let mut node = CompactedNode::default();

    for first in neighbours.keys() {
        let chain = walk_chain(source, reducer, key, first, &is_end, track_incoming)?;
        if chain.end == *key {
            continue;
        }

        let mut forward = Vec::with_capacity(chain.coordinates.len() + 1);
        forward.push(origin);
        forward.extend_from_slice(&chain.coordinates);

        if track_incoming {
            if let Some(reverse_weight) = chain.reverse_weight {
                let cheaper = node
                    .incoming_edges
                    .get(&chain.end)
                    .is_none_or(|existing| reverse_weight < *existing);
                if cheaper {
                    let from = source.coordinate(&chain.end)?;
                    node.incoming_edges.insert(chain.end.clone(), reverse_weight);
                    node.incoming_coordinates
                        .insert(chain.end.clone(), reverse_polyline(&forward, from));
                    match reducer.and_then(|r| fold(r, chain.back_data.iter().rev().copied())) {
                        Some(data) => {
                            node.incoming_edge_data.insert(chain.end.clone(), data);
                        }
                        None => {
                            node.incoming_edge_data.remove(&chain.end);
                        }
                    }
                }
            }
        }

        let cheaper = node
            .edges
            .get(&chain.end)
            .is_none_or(|existing| chain.weight < *existing);
        if cheaper {
            node.edges.insert(chain.end.clone(), chain.weight);
            node.coordinates.insert(chain.end.clone(), forward);
            match chain.data {
                Some(data) => {
                    node.edge_data.insert(chain.end, data);
                }
                None => {
                    node.edge_data.remove(&chain.end);
                }
            }
        }
    }

    Ok(node)
}

/// Build the polyline of the reverse of a compacted edge.
///
/// `forward` is the stored polyline of `n -> m` (starting at `n`, excluding
/// `m`); `from` is the coordinate of `m`. The result starts at `m` and lists
/// the pass-through coordinates back towards `n`, excluding `n`.
pub fn reverse_polyline(forward: &[Coord<f64>], from: Coord<f64>) -> Vec<Coord<f64>> {
    let mut reversed = Vec::with_capacity(forward.len().max(1));
    reversed.push(from);
    reversed.extend(forward.iter().skip(1).rev().copied());
    reversed
}

fn walk_chain<'g, D, F>(
    source: &'g SourceGraph<D>,
    reducer: Option<&dyn EdgeReducer<D>>,
    origin: &VertexKey,
    first: &VertexKey,
    is_end: &F,
    track_incoming: bool,
) -> Result<Chain<'g, D>>
where
    D: Clone,
    F: Fn(&VertexKey) -> bool,
{
    let mut weight = source
        .vertices
        .get(origin)
        .and_then(|targets| targets.get(first))
        .copied()
        .ok_or_else(|| Error::invariant(format!("missing source edge {origin} -> {first}")))?;
    let mut reverse_weight = None;
    let mut back_data = Vec::new();
    if track_incoming {
        reverse_weight = back_edge(source, first, origin);
        back_data.extend(source.edge_datum(first, origin));
    }
    let mut data = reducer.and(source.edge_datum(origin, first).cloned());
    let mut coordinates = Vec::new();
    let mut visited = BTreeSet::new();
    let mut previous = origin.clone();
    let mut current = first.clone();

    while current != *origin && !is_end(&current) {
        let edges = source.neighbours(&current).ok_or_else(|| {
            Error::invariant(format!(
                "chain from {origin} reached {current}, which is not in the source graph"
            ))
        })?;
        if !visited.insert(current.clone()) {
            return Err(Error::invariant(format!(
                "chain from {origin} revisited {current} without reaching a fork"
            )));
        }
        let (next, step) = edges
            .iter()
            .find(|(key, _)| **key != previous)
            .map(|(key, step)| (key.clone(), *step))
            .ok_or_else(|| {
                Error::invariant(format!("chain from {origin} stalled at pass-through {current}"))
            })?;

        weight = weight + step;
        if let Some(reverse) = reverse_weight.as_mut() {
            *reverse = *reverse + back_edge(source, &next, &current).unwrap_or(EdgeWeight::Impassable);
            back_data.extend(source.edge_datum(&next, &current));
        }
        if let (Some(reducer), Some(accumulated), Some(value)) =
            (reducer, data.as_ref(), source.edge_datum(&current, &next))
        {
            data = Some(reducer.reduce(accumulated, value));
        }

        coordinates.push(source.coordinate(&current)?);
        previous = current;
        current = next;
    }

    Ok(Chain {
        end: current,
        weight,
        reverse_weight,
        coordinates,
        data,
        back_data,
    })
}

fn back_edge<D>(source: &SourceGraph<D>, from: &VertexKey, to: &VertexKey) -> Option<EdgeWeight> {
    source.vertices.get(from)?.get(to).copied()
}

fn fold<'a, D: Clone + 'a>(
    reducer: &dyn EdgeReducer<D>,
    mut values: impl Iterator<Item = &'a D>,
) -> Option<D> {
    let first = values.next()?.clone();
    Some(values.fold(first, |accumulated, value| reducer.reduce(&accumulated, value)))
}

/// Classify the vertices that must survive compaction.
///
/// A vertex can be absorbed into a chain only when it has exactly two
/// neighbours, both link back to it, and nothing else links to it.
fn find_forks(vertices: &Adjacency<EdgeWeight>, options: &GraphOptions) -> BTreeSet<VertexKey> {
    let mut in_degree: BTreeMap<&VertexKey, usize> = BTreeMap::new();
    for targets in vertices.values() {
        for target in targets.keys() {
            *in_degree.entry(target).or_default() += 1;
        }
    }

    let total = vertices.len();
    let mut forks = BTreeSet::new();
    for (index, (key, targets)) in vertices.iter().enumerate() {
        options.report(ProgressStage::CompactEnds, index, total);

        let pass_through = targets.len() == 2
            && in_degree.get(key).copied() == Some(2)
            && targets.keys().all(|neighbour| {
                vertices
                    .get(neighbour)
                    .is_some_and(|back| back.contains_key(key))
            });
        if !pass_through {
            forks.insert(key.clone());
        }
    }

    forks
}

/// Promote one vertex of every fork-free cycle to a fork.
///
/// Without this a closed loop with no branch would compact to nothing. The
/// promoted vertex is the smallest key of its cycle. Returns how many
/// vertices were promoted.
fn break_cycles(vertices: &Adjacency<EdgeWeight>, ends: &mut BTreeSet<VertexKey>) -> usize {
    let mut seen: BTreeSet<&VertexKey> = BTreeSet::new();
    let mut promoted = Vec::new();

    for key in vertices.keys() {
        if ends.contains(key) || !seen.insert(key) {
            continue;
        }

        let mut touches_fork = false;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            for neighbour in vertices.get(current).into_iter().flat_map(BTreeMap::keys) {
                if ends.contains(neighbour) {
                    touches_fork = true;
                } else if seen.insert(neighbour) {
                    stack.push(neighbour);
                }
            }
        }

        if !touches_fork {
            promoted.push(key.clone());
        }
    }

    let count = promoted.len();
    ends.extend(promoted);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{both, coord_of, key, merge, source};

    fn compact(graph: &SourceGraph<Vec<u32>>) -> CompactedGraph<Vec<u32>> {
        compact_graph(graph, None, &GraphOptions::default()).expect("compacts")
    }

    #[test]
    fn removes_pass_through_vertices() {
        let graph = source(&both(&[("0,0", "1,0", 1.0), ("1,0", "2,0", 1.0)]));
        let compacted = compact(&graph);

        assert_eq!(compacted.vertex_count(), 2);
        assert_eq!(compacted.weight(&key("0,0"), &key("2,0")), Some(EdgeWeight::Passable(2.0)));
        assert_eq!(compacted.weight(&key("2,0"), &key("0,0")), Some(EdgeWeight::Passable(2.0)));
        assert_eq!(
            compacted.segment(&key("0,0"), &key("2,0")).expect("segment"),
            &[coord_of("0,0"), coord_of("1,0")]
        );
    }

    #[test]
    fn keeps_forks_untouched() {
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "2,0", 1.0),
            ("1,0", "1,1", 1.0),
        ]));
        let compacted = compact(&graph);

        assert_eq!(compacted.vertices, graph.vertices);
    }

    #[test]
    fn long_chain_sums_weights() {
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "2,0", 2.0),
            ("2,0", "3,0", 3.0),
            ("3,0", "4,0", 4.0),
        ]));
        let compacted = compact(&graph);

        assert_eq!(compacted.vertex_count(), 2);
        assert_eq!(compacted.weight(&key("0,0"), &key("4,0")), Some(EdgeWeight::Passable(10.0)));
        assert_eq!(compacted.segment(&key("4,0"), &key("0,0")).expect("segment").len(), 4);
    }

    #[test]
    fn oneway_chain_keeps_asymmetry() {
        let graph = source(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "0,0", 0.0),
            ("1,0", "2,0", 1.0),
            ("2,0", "1,0", 0.0),
        ]);
        let compacted = compact(&graph);

        assert_eq!(compacted.vertex_count(), 2);
        assert_eq!(compacted.weight(&key("0,0"), &key("2,0")), Some(EdgeWeight::Passable(2.0)));
        assert_eq!(compacted.weight(&key("2,0"), &key("0,0")), Some(EdgeWeight::Impassable));
    }

    #[test]
    fn closed_loop_keeps_an_artificial_fork() {
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "1,1", 1.0),
            ("1,1", "0,1", 1.0),
            ("0,1", "0,0", 1.0),
        ]));
        let compacted = compact(&graph);

        assert_eq!(compacted.vertex_count(), 1);
        assert!(compacted.contains(&key("0,0")));
        assert_eq!(compacted.edge_count(), 0, "the loop back to itself is dropped");
    }

    #[test]
    fn parallel_chains_keep_the_cheaper_one() {
        // Two routes between the forks 1,0 and 3,0: direct-ish via 2,0 (cost 2)
        // and around via 2,1 (cost 10).
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "2,0", 1.0),
            ("2,0", "3,0", 1.0),
            ("1,0", "2,1", 5.0),
            ("2,1", "3,0", 5.0),
            ("3,0", "4,0", 1.0),
        ]));
        let compacted = compact(&graph);

        assert_eq!(compacted.weight(&key("1,0"), &key("3,0")), Some(EdgeWeight::Passable(2.0)));
        assert_eq!(
            compacted.segment(&key("1,0"), &key("3,0")).expect("segment"),
            &[coord_of("1,0"), coord_of("2,0")]
        );
    }

    #[test]
    fn dead_end_loop_is_dropped() {
        // 1,0 is a fork with a loop 1,0 -> 2,0 -> 2,1 -> 1,0 hanging off it.
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "2,0", 1.0),
            ("2,0", "2,1", 1.0),
            ("2,1", "1,0", 1.0),
        ]));
        let compacted = compact(&graph);

        assert_eq!(compacted.vertex_count(), 2);
        let edges = &compacted.vertices[&key("1,0")];
        assert_eq!(edges.len(), 1);
        assert!(edges.contains_key(&key("0,0")));
    }

    #[test]
    fn disabled_compaction_keeps_every_vertex() {
        let graph = source(&both(&[("0,0", "1,0", 1.0), ("1,0", "2,0", 1.0)]));
        let options = GraphOptions::default().with_compact(false);
        let compacted = compact_graph(&graph, None, &options).expect("compacts");

        assert_eq!(compacted.vertices, graph.vertices);
        assert_eq!(
            compacted.segment(&key("1,0"), &key("2,0")).expect("segment"),
            &[coord_of("1,0")]
        );
    }

    #[test]
    fn empty_graph_is_rejected_by_default() {
        let graph = source(&[]);
        let error = compact_graph(&graph, None, &GraphOptions::default()).expect_err("degenerate");
        assert!(matches!(error, Error::DegenerateTopology { vertices: 0 }));

        let options = GraphOptions::default().with_degenerate(DegeneratePolicy::Allow);
        let compacted = compact_graph(&graph, None, &options).expect("allowed");
        assert!(compacted.is_empty());
    }

    #[test]
    fn edge_data_is_folded_along_chains() {
        let graph = source(&both(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "2,0", 1.0),
            ("2,0", "3,0", 1.0),
        ]));
        let reducer: &dyn EdgeReducer<Vec<u32>> = &merge;
        let compacted =
            compact_graph(&graph, Some(reducer), &GraphOptions::default()).expect("compacts");

        // Forward edges were inserted with even indices 0, 2, 4.
        assert_eq!(compacted.segment_data(&key("0,0"), &key("3,0")), Some(&vec![0, 2, 4]));
        assert_eq!(compacted.segment_data(&key("3,0"), &key("0,0")), Some(&vec![5, 3, 1]));
    }

    #[test]
    fn compact_node_tracks_incoming_chains() {
        let graph = source(&[
            ("0,0", "1,0", 1.0),
            ("1,0", "0,0", 1.0),
            ("1,0", "2,0", 2.0),
            ("2,0", "1,0", 3.0),
            ("2,0", "3,0", 4.0),
            ("3,0", "2,0", 5.0),
        ]);
        let ends: BTreeSet<VertexKey> = [key("0,0"), key("3,0")].into_iter().collect();
        let reducer: &dyn EdgeReducer<Vec<u32>> = &merge;
        let node = compact_node(&graph, Some(reducer), &key("1,0"), |k| ends.contains(k), true)
            .expect("walks");

        assert_eq!(node.edges[&key("0,0")], EdgeWeight::Passable(1.0));
        assert_eq!(node.edges[&key("3,0")], EdgeWeight::Passable(6.0));
        assert_eq!(node.incoming_edges[&key("0,0")], EdgeWeight::Passable(1.0));
        assert_eq!(node.incoming_edges[&key("3,0")], EdgeWeight::Passable(8.0));
        assert_eq!(
            node.incoming_coordinates[&key("3,0")],
            vec![coord_of("3,0"), coord_of("2,0")]
        );
        assert_eq!(node.incoming_coordinates[&key("0,0")], vec![coord_of("0,0")]);
        // 3,0 -> 2,0 is edge 5, 2,0 -> 1,0 is edge 3.
        assert_eq!(node.incoming_edge_data[&key("3,0")], vec![5, 3]);
        assert_eq!(node.edge_data[&key("3,0")], vec![2, 4]);
    }

    #[test]
    fn compact_node_without_way_back_has_no_incoming_edge() {
        let graph = source(&[("0,0", "1,0", 1.0), ("1,0", "2,0", 1.0), ("2,0", "1,0", 1.0)]);
        let ends: BTreeSet<VertexKey> = [key("2,0")].into_iter().collect();
        let node = compact_node(&graph, None, &key("0,0"), |k| ends.contains(k), true)
            .expect("walks");

        assert_eq!(node.edges[&key("2,0")], EdgeWeight::Passable(2.0));
        assert!(node.incoming_edges.is_empty());
    }

    #[test]
    fn walking_into_unknown_vertex_is_an_invariant_violation() {
        let mut graph = source(&both(&[("0,0", "1,0", 1.0), ("1,0", "2,0", 1.0)]));
        graph.vertices.remove(&key("2,0"));
        let ends: BTreeSet<VertexKey> = [key("0,0")].into_iter().collect();

        let error = compact_node(&graph, None, &key("1,0"), |k| ends.contains(k), true)
            .expect_err("dangling");
        assert!(matches!(error, Error::InvariantViolation { .. }));
    }

    #[test]
    fn reverse_polyline_fixtures() {
        let n = Coord { x: 0.0, y: 0.0 };
        let a = Coord { x: 1.0, y: 0.0 };
        let b = Coord { x: 2.0, y: 0.0 };
        let m = Coord { x: 3.0, y: 0.0 };

        assert_eq!(reverse_polyline(&[n, a, b], m), vec![m, b, a]);
        assert_eq!(reverse_polyline(&[n, a], m), vec![m, a]);
        assert_eq!(reverse_polyline(&[n], m), vec![m]);
        assert_eq!(reverse_polyline(&[], m), vec![m]);
    }
}
