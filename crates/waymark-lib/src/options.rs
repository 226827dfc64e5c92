//! Build-time configuration shared by topology, weighting and compaction.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::coord::{default_key_fn, round_coord, KeyFn, VertexKey};

/// Default snapping tolerance, in coordinate units.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Progress is reported once every this many processed items.
pub const PROGRESS_INTERVAL: usize = 1000;

/// What to do when compaction leaves a graph without any forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegeneratePolicy {
    /// Fail construction with [`crate::Error::DegenerateTopology`].
    #[default]
    Reject,
    /// Keep the empty compacted graph; every query will return no path.
    Allow,
}

/// Preprocessing phase named in progress reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    TopologyVertices,
    TopologyEdges,
    EdgeWeights,
    CompactEnds,
    CompactNodes,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ProgressStage::TopologyVertices => "topo:vertices",
            ProgressStage::TopologyEdges => "topo:edges",
            ProgressStage::EdgeWeights => "edgeweights",
            ProgressStage::CompactEnds => "compact:ends",
            ProgressStage::CompactNodes => "compact:nodes",
        };
        f.write_str(value)
    }
}

/// Receiver for preprocessing progress.
pub trait Progress: Send + Sync {
    fn report(&self, stage: ProgressStage, completed: usize, total: usize);
}

impl<F> Progress for F
where
    F: Fn(ProgressStage, usize, usize) + Send + Sync,
{
    fn report(&self, stage: ProgressStage, completed: usize, total: usize) {
        self(stage, completed, total)
    }
}

/// Progress sink that emits `debug` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn report(&self, stage: ProgressStage, completed: usize, total: usize) {
        debug!(%stage, completed, total, "preprocessing progress");
    }
}

/// Options controlling how a network becomes a routing graph.
#[derive(Clone)]
pub struct GraphOptions {
    /// Coordinates closer than this (per axis, on a grid) share a vertex.
    pub tolerance: f64,
    /// Turns a snapped coordinate into a vertex key.
    pub key: KeyFn,
    /// When `false`, every vertex is kept as a fork.
    pub compact: bool,
    pub degenerate: DegeneratePolicy,
    pub progress: Option<Arc<dyn Progress>>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            key: default_key_fn(),
            compact: true,
            degenerate: DegeneratePolicy::default(),
            progress: None,
        }
    }
}

impl fmt::Debug for GraphOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphOptions")
            .field("tolerance", &self.tolerance)
            .field("compact", &self.compact)
            .field("degenerate", &self.degenerate)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl GraphOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_key(
        mut self,
        key: impl Fn(geo::Coord<f64>) -> VertexKey + Send + Sync + 'static,
    ) -> Self {
        self.key = Arc::new(key);
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_degenerate(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate = policy;
        self
    }

    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Snap `coord` and derive its vertex key.
    pub fn vertex_key(&self, coord: geo::Coord<f64>) -> VertexKey {
        (self.key)(round_coord(coord, self.tolerance))
    }

    pub(crate) fn report(&self, stage: ProgressStage, completed: usize, total: usize) {
        if completed % PROGRESS_INTERVAL != 0 {
            return;
        }
        if let Some(progress) = &self.progress {
            progress.report(stage, completed, total);
        }
    }
}
