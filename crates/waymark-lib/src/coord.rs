//! Vertex identity derived from coordinates.
//!
//! Every coordinate of the input network is snapped to a grid whose cell size
//! is the configured tolerance; the snapped coordinate is then turned into an
//! opaque [`VertexKey`]. Two coordinates that snap to the same grid point are
//! the same vertex.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use geo::Coord;
use serde::{Deserialize, Serialize};

/// Opaque, totally ordered identifier of a graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexKey(String);

impl VertexKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for VertexKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for VertexKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Function turning a snapped coordinate into a vertex key.
pub type KeyFn = Arc<dyn Fn(Coord<f64>) -> VertexKey + Send + Sync>;

/// Snap a coordinate to the nearest multiple of `tolerance` on each axis.
///
/// A non-positive tolerance disables snapping.
pub fn round_coord(coord: Coord<f64>, tolerance: f64) -> Coord<f64> {
    if tolerance <= 0.0 || !tolerance.is_finite() {
        return coord;
    }

    // Dividing by an integral scale keeps keys such as `3` instead of
    // `3.0000000000000004` for decimal tolerances.
    let scale = 1.0 / tolerance;
    let integral = scale.round();
    let snap = |value: f64| {
        let snapped = if (scale - integral).abs() < 1e-9 * scale {
            (value * integral).round() / integral
        } else {
            (value / tolerance).round() * tolerance
        };
        // `+ 0.0` folds negative zero into zero so both sides of an axis share a key.
        snapped + 0.0
    };

    Coord {
        x: snap(coord.x),
        y: snap(coord.y),
    }
}

/// Default key: the snapped axes joined with a comma.
pub fn default_key(coord: Coord<f64>) -> VertexKey {
    VertexKey(format!("{},{}", coord.x, coord.y))
}

/// Key function used when none is configured.
pub fn default_key_fn() -> KeyFn {
    Arc::new(default_key)
}
