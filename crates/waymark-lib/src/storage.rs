//! Persisting preprocessed routing graphs.
//!
//! Building a graph from a large network dominates the cost of a routing
//! session, so the result can be written to disk and reloaded later.
//!
//! # Binary format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"WMRG" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte) - bit 0: has edge data
//!   - Source vertex count: u32 LE (4 bytes)
//!   - Reserved: 6 bytes
//!
//! Body:
//!   - postcard-serialized RoutingGraph
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```
//!
//! A JSON rendition is also available through [`RoutingGraph::to_json`] for
//! inspection and interchange.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::RoutingGraph;

const GRAPH_MAGIC: &[u8; 4] = b"WMRG";

const GRAPH_VERSION: u8 = 1;

const FLAG_HAS_EDGE_DATA: u8 = 0x01;

const HEADER_SIZE: usize = 16;

/// SHA-256
const CHECKSUM_SIZE: usize = 32;

const COMPRESSION_LEVEL: i32 = 3;

/// Write `graph` to `path`, returning the checksum of the stored body.
pub fn save_graph<D: Serialize>(graph: &RoutingGraph<D>, path: &Path) -> Result<[u8; 32]> {
    info!(
        path = %path.display(),
        vertices = graph.source.vertex_count(),
        forks = graph.compacted.vertex_count(),
        "saving routing graph"
    );

    let serialized = postcard::to_allocvec(graph).map_err(|e| Error::GraphSerialize {
        message: format!("postcard serialization failed: {}", e),
    })?;
    let compressed = zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
        Error::GraphSerialize {
            message: format!("zstd compression failed: {}", e),
        }
    })?;
    let checksum: [u8; 32] = Sha256::digest(&compressed).into();

    let flags = if graph.has_edge_data() {
        FLAG_HAS_EDGE_DATA
    } else {
        0
    };
    let vertex_count = u32::try_from(graph.source.vertex_count()).map_err(|_| {
        Error::GraphSerialize {
            message: "graph has more vertices than the format can record".to_string(),
        }
    })?;

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(GRAPH_MAGIC);
    header[4] = GRAPH_VERSION;
    header[5] = flags;
    header[6..10].copy_from_slice(&vertex_count.to_le_bytes());

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header)?;
    writer.write_all(&compressed)?;
    writer.write_all(&checksum)?;
    writer.flush()?;

    info!(
        file_size = HEADER_SIZE + compressed.len() + CHECKSUM_SIZE,
        compressed_size = compressed.len(),
        "routing graph saved"
    );

    Ok(checksum)
}

/// Load a graph written by [`save_graph`].
///
/// Validates the header and checksum, and checks that every compacted vertex
/// is also a source vertex.
pub fn load_graph<D: DeserializeOwned>(path: &Path) -> Result<RoutingGraph<D>> {
    debug!(path = %path.display(), "loading routing graph");

    let load_error = |message: String| Error::GraphLoad {
        path: path.to_path_buf(),
        message,
    };

    let bytes = std::fs::read(path).map_err(|e| load_error(format!("failed to read file: {}", e)))?;
    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(load_error(format!(
            "file is {} bytes, too short for a graph",
            bytes.len()
        )));
    }

    let (header, rest) = bytes.split_at(HEADER_SIZE);
    if &header[0..4] != GRAPH_MAGIC {
        return Err(load_error("invalid magic bytes".to_string()));
    }
    let version = header[4];
    if version != GRAPH_VERSION {
        return Err(load_error(format!(
            "unsupported version {} (expected {})",
            version, GRAPH_VERSION
        )));
    }
    let flags = header[5];
    let vertex_count = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);

    let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);
    let computed_checksum = Sha256::digest(compressed);
    if computed_checksum.as_slice() != stored_checksum {
        return Err(load_error(
            "checksum mismatch - file may be corrupted".to_string(),
        ));
    }

    let decompressed = zstd::decode_all(compressed)
        .map_err(|e| load_error(format!("zstd decompression failed: {}", e)))?;
    let graph: RoutingGraph<D> = postcard::from_bytes(&decompressed)
        .map_err(|e| load_error(format!("postcard deserialization failed: {}", e)))?;

    if graph.source.vertex_count() != vertex_count as usize {
        warn!(
            expected = vertex_count,
            actual = graph.source.vertex_count(),
            "vertex count mismatch in routing graph"
        );
    }
    if (flags & FLAG_HAS_EDGE_DATA != 0) != graph.has_edge_data() {
        warn!(flags, "edge data flag does not match stored graph");
    }
    if let Some(orphan) = graph
        .compacted
        .vertices
        .keys()
        .find(|key| !graph.source.contains(key))
    {
        return Err(load_error(format!(
            "compacted vertex {orphan} is missing from the source graph"
        )));
    }

    info!(
        vertices = graph.source.vertex_count(),
        forks = graph.compacted.vertex_count(),
        "loaded routing graph"
    );
    Ok(graph)
}

impl<D: Serialize> RoutingGraph<D> {
    /// Pretty-printed JSON rendition of the whole graph.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<D: DeserializeOwned> RoutingGraph<D> {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
