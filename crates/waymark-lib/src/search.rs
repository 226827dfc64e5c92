use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::coord::VertexKey;
use crate::error::{Error, Result};
use crate::graph::Adjacency;
use crate::weight::EdgeWeight;

/// Lowest-cost route between two compacted-graph vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub cost: f64,
    /// Visited vertices from start to finish, both included.
    pub vertices: Vec<VertexKey>,
}

/// Run Dijkstra's algorithm from `start` to `finish`.
///
/// Returns `Ok(None)` when `finish` cannot be reached. Impassable edges are
/// never relaxed. Reaching a vertex that has no adjacency entry means the graph
/// was corrupted and is reported as [`Error::InvariantViolation`].
pub fn find_shortest_path(
    graph: &Adjacency<EdgeWeight>,
    start: &VertexKey,
    finish: &VertexKey,
) -> Result<Option<SearchResult>> {
    if !graph.contains_key(start) {
        return Err(Error::invariant(format!(
            "search start {start} is not part of the graph"
        )));
    }

    let mut costs: BTreeMap<&VertexKey, f64> = BTreeMap::new();
    let mut parents: BTreeMap<&VertexKey, &VertexKey> = BTreeMap::new();
    let mut queue = BinaryHeap::new();

    costs.insert(start, 0.0);
    queue.push(QueueEntry::new(start, 0.0));

    while let Some(entry) = queue.pop() {
        match costs.get(entry.node) {
            Some(cost) if *cost < entry.cost.0 => continue,
            Some(_) => {}
            None => continue,
        }

        if entry.node == finish {
            return Ok(Some(SearchResult {
                cost: entry.cost.0,
                vertices: reconstruct_path(&parents, start, finish),
            }));
        }

        let edges = graph.get(entry.node).ok_or_else(|| {
            Error::invariant(format!(
                "search reached {}, which is not part of the graph",
                entry.node
            ))
        })?;
        for (next, weight) in edges {
            let Some(step) = weight.cost() else {
                continue;
            };

            let next_cost = entry.cost.0 + step;
            if costs.get(next).is_some_and(|known| *known <= next_cost) {
                continue;
            }
            costs.insert(next, next_cost);
            parents.insert(next, entry.node);
            queue.push(QueueEntry::new(next, next_cost));
        }
    }

    Ok(None)
}

fn reconstruct_path(
    parents: &BTreeMap<&VertexKey, &VertexKey>,
    start: &VertexKey,
    finish: &VertexKey,
) -> Vec<VertexKey> {
    let mut path = Vec::new();
    let mut current = Some(finish);
    while let Some(node) = current {
        path.push(node.clone());
        if node == start {
            break;
        }
        current = parents.get(node).copied();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct QueueEntry<'a> {
    node: &'a VertexKey,
    cost: FloatOrd,
}

impl<'a> QueueEntry<'a> {
    fn new(node: &'a VertexKey, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(self.node))
    }
}

impl PartialOrd for QueueEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{both, key, source};

    fn graph(edges: &[(&str, &str, f64)]) -> Adjacency<EdgeWeight> {
        source(edges).vertices
    }

    fn keys(path: &[&str]) -> Vec<VertexKey> {
        path.iter().map(|k| key(k)).collect()
    }

    #[test]
    fn prefers_cheaper_detour() {
        let graph = graph(&both(&[
            ("0,0", "1,0", 10.0),
            ("0,0", "0,1", 1.0),
            ("0,1", "1,1", 1.0),
            ("1,1", "1,0", 1.0),
        ]));

        let result = find_shortest_path(&graph, &key("0,0"), &key("1,0"))
            .expect("search")
            .expect("route");
        assert_eq!(result.cost, 3.0);
        assert_eq!(result.vertices, keys(&["0,0", "0,1", "1,1", "1,0"]));
    }

    #[test]
    fn start_equals_finish() {
        let graph = graph(&both(&[("0,0", "1,0", 1.0)]));
        let result = find_shortest_path(&graph, &key("0,0"), &key("0,0"))
            .expect("search")
            .expect("route");
        assert_eq!(result.cost, 0.0);
        assert_eq!(result.vertices, keys(&["0,0"]));
    }

    #[test]
    fn impassable_edges_are_not_followed() {
        let graph = graph(&[("0,0", "1,0", 1.0), ("1,0", "0,0", 0.0)]);

        assert!(find_shortest_path(&graph, &key("0,0"), &key("1,0"))
            .expect("search")
            .is_some());
        assert!(find_shortest_path(&graph, &key("1,0"), &key("0,0"))
            .expect("search")
            .is_none());
    }

    #[test]
    fn disconnected_components_have_no_path() {
        let graph = graph(&both(&[("0,0", "1,0", 1.0), ("5,5", "6,5", 1.0)]));
        let result = find_shortest_path(&graph, &key("0,0"), &key("6,5")).expect("search");
        assert!(result.is_none());
    }

    #[test]
    fn dangling_edge_is_an_invariant_violation() {
        let mut graph = graph(&both(&[("0,0", "1,0", 1.0), ("1,0", "2,0", 1.0)]));
        graph.remove(&key("1,0"));

        let error = find_shortest_path(&graph, &key("0,0"), &key("2,0")).expect_err("corrupt");
        assert!(matches!(error, Error::InvariantViolation { .. }));
    }

    #[test]
    fn unknown_start_is_an_invariant_violation() {
        let graph = graph(&both(&[("0,0", "1,0", 1.0)]));
        let error = find_shortest_path(&graph, &key("9,9"), &key("0,0")).expect_err("unknown");
        assert!(matches!(error, Error::InvariantViolation { .. }));
    }
}
