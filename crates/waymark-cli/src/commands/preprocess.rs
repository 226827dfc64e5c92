//! Build a routing graph from a GeoJSON network and store it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use waymark_lib::{
    read_network, save_graph, DegeneratePolicy, GraphOptions, PathFinderBuilder, TracingProgress,
};

use waymark_cli::network::{line_weight, Metric};

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// GeoJSON file with the line network.
    #[arg(long)]
    pub network: PathBuf,
    /// Where to write the routing graph.
    #[arg(long)]
    pub output: PathBuf,
    /// Coordinates closer than this share a vertex.
    #[arg(long, default_value_t = 1e-5)]
    pub tolerance: f64,
    /// Keep every vertex instead of compacting chains.
    #[arg(long)]
    pub no_compact: bool,
    /// Accept networks without any intersection.
    #[arg(long)]
    pub allow_degenerate: bool,
    /// How segment lengths are measured.
    #[arg(long, value_enum, default_value_t = Metric::Haversine)]
    pub metric: Metric,
    /// Write the JSON rendition instead of the binary format.
    #[arg(long)]
    pub json: bool,
}

impl PreprocessArgs {
    pub fn graph_options(&self) -> GraphOptions {
        let degenerate = if self.allow_degenerate {
            DegeneratePolicy::Allow
        } else {
            DegeneratePolicy::Reject
        };
        GraphOptions::default()
            .with_tolerance(self.tolerance)
            .with_compact(!self.no_compact)
            .with_degenerate(degenerate)
            .with_progress(TracingProgress)
    }
}

pub fn handle_preprocess(args: &PreprocessArgs) -> Result<()> {
    let network = read_network(&args.network)
        .with_context(|| format!("failed to read network from {}", args.network.display()))?;

    let finder = PathFinderBuilder::new(args.graph_options())
        .weight(line_weight(args.metric))
        .build(&network)
        .context("failed to build routing graph")?;
    let graph = finder.graph();

    let checksum = if args.json {
        let json = graph.to_json().context("failed to render graph as JSON")?;
        std::fs::write(&args.output, json)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        None
    } else {
        let checksum = save_graph(graph, &args.output)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        Some(checksum)
    };

    println!("Routing graph built:");
    println!("  Lines: {}", network.len());
    println!("  Vertices: {}", graph.source.vertex_count());
    println!("  Forks: {}", graph.compacted.vertex_count());
    println!("  Compacted edges: {}", graph.compacted.edge_count());
    println!("  Output: {}", args.output.display());
    if let Some(checksum) = checksum {
        println!("  Checksum: {}...", hex::encode(&checksum[..8]));
    }

    Ok(())
}
