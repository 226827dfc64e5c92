use std::path::PathBuf;

use thiserror::Error;

use crate::coord::VertexKey;

/// Convenient result alias for the waymark library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// A query that simply has no answer (unknown endpoint, disconnected network)
/// is reported as `Ok(None)` by the query functions and never through this
/// type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when compaction leaves no forks and the policy rejects it.
    #[error("compacted graph contains no forks (topology of {vertices} vertices has no intersections)")]
    DegenerateTopology { vertices: usize },

    /// Raised when graph structures reference each other inconsistently.
    ///
    /// This always indicates a bug or a corrupted stored graph.
    #[error("graph invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Raised when a vertex has no recorded coordinate.
    #[error("no coordinate recorded for vertex {key}")]
    MissingCoordinate { key: VertexKey },

    /// Raised when a GeoJSON document is not a feature collection of lines.
    #[error("unsupported GeoJSON input: {kind}")]
    UnsupportedGeometry { kind: String },

    /// Wrapper for GeoJSON parsing errors.
    #[error(transparent)]
    GeoJson(#[from] ::geojson::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Raised when encoding a graph for storage fails.
    #[error("failed to serialize graph: {message}")]
    GraphSerialize { message: String },

    /// Raised when loading a stored graph fails.
    #[error("failed to load graph from {path}: {message}")]
    GraphLoad { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Error::InvariantViolation {
            message: message.into(),
        }
    }
}
