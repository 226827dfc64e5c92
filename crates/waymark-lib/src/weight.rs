//! Edge costs and the pluggable functions that produce and fold them.

use std::cmp::Ordering;
use std::ops::Add;

use geo::{Coord, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Cost returned by a weight function for one topology edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weight {
    /// Same cost in both directions.
    Symmetric(f64),
    /// Independent costs; a missing direction is impassable.
    Directional {
        forward: Option<f64>,
        backward: Option<f64>,
    },
}

impl Weight {
    /// Cost only in the direction of the line's coordinates.
    pub fn forward(cost: f64) -> Self {
        Weight::Directional {
            forward: Some(cost),
            backward: None,
        }
    }

    /// Split into (forward, backward) edge weights.
    pub fn directions(self) -> (EdgeWeight, EdgeWeight) {
        match self {
            Weight::Symmetric(cost) => {
                let weight = EdgeWeight::from_cost(Some(cost));
                (weight, weight)
            }
            Weight::Directional { forward, backward } => {
                (EdgeWeight::from_cost(forward), EdgeWeight::from_cost(backward))
            }
        }
    }
}

impl From<f64> for Weight {
    fn from(cost: f64) -> Self {
        Weight::Symmetric(cost)
    }
}

/// Cost of traversing a stored directed edge.
///
/// Impassable directions stay in the graph so that chains through oneway
/// segments can still be compacted; search never relaxes them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum EdgeWeight {
    Passable(f64),
    Impassable,
}

impl EdgeWeight {
    /// Zero, negative, missing and non-finite costs are impassable.
    pub fn from_cost(cost: Option<f64>) -> Self {
        match cost {
            Some(cost) if cost > 0.0 && cost.is_finite() => EdgeWeight::Passable(cost),
            _ => EdgeWeight::Impassable,
        }
    }

    pub fn cost(self) -> Option<f64> {
        match self {
            EdgeWeight::Passable(cost) => Some(cost),
            EdgeWeight::Impassable => None,
        }
    }

    pub fn is_passable(self) -> bool {
        matches!(self, EdgeWeight::Passable(_))
    }
}

impl Add for EdgeWeight {
    type Output = EdgeWeight;

    fn add(self, other: EdgeWeight) -> EdgeWeight {
        match (self, other) {
            (EdgeWeight::Passable(a), EdgeWeight::Passable(b)) => EdgeWeight::Passable(a + b),
            _ => EdgeWeight::Impassable,
        }
    }
}

impl PartialEq for EdgeWeight {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EdgeWeight {}

impl PartialOrd for EdgeWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeWeight {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (EdgeWeight::Passable(a), EdgeWeight::Passable(b)) => a.total_cmp(b),
            (EdgeWeight::Passable(_), EdgeWeight::Impassable) => Ordering::Less,
            (EdgeWeight::Impassable, EdgeWeight::Passable(_)) => Ordering::Greater,
            (EdgeWeight::Impassable, EdgeWeight::Impassable) => Ordering::Equal,
        }
    }
}

/// Cost function applied to every topology edge.
///
/// Returning `None` drops the edge entirely.
pub trait WeightFn<P>: Send + Sync {
    fn weight(&self, from: Coord<f64>, to: Coord<f64>, properties: &P) -> Option<Weight>;
}

impl<P, F> WeightFn<P> for F
where
    F: Fn(Coord<f64>, Coord<f64>, &P) -> Option<Weight> + Send + Sync,
{
    fn weight(&self, from: Coord<f64>, to: Coord<f64>, properties: &P) -> Option<Weight> {
        self(from, to, properties)
    }
}

/// Associative fold of per-edge auxiliary values along a chain.
pub trait EdgeReducer<D>: Send + Sync {
    fn reduce(&self, accumulated: &D, next: &D) -> D;
}

impl<D, F> EdgeReducer<D> for F
where
    F: Fn(&D, &D) -> D + Send + Sync,
{
    fn reduce(&self, accumulated: &D, next: &D) -> D {
        self(accumulated, next)
    }
}

/// Great-circle distance in kilometres between two lon/lat coordinates.
pub fn haversine_weight<P>(from: Coord<f64>, to: Coord<f64>, _properties: &P) -> Option<Weight> {
    let metres = Haversine.distance(Point::from(from), Point::from(to));
    Some(Weight::Symmetric(metres / 1000.0))
}

/// Planar distance between two coordinates.
pub fn euclidean_weight<P>(from: Coord<f64>, to: Coord<f64>, _properties: &P) -> Option<Weight> {
    Some(Weight::Symmetric((to.x - from.x).hypot(to.y - from.y)))
}
