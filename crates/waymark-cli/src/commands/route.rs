//! Answer a single routing query.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use geo::Coord;
use tracing::{debug, warn};
use waymark_lib::{read_network, DegeneratePolicy, GraphOptions, PathFinder, PathFinderBuilder};

use waymark_cli::network::{line_weight, load_stored_graph, parse_coord, Metric};
use waymark_cli::output::{render_path, OutputFormat};

#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["graph", "network"]),
))]
pub struct RouteArgs {
    /// Stored routing graph produced by `preprocess`.
    #[arg(long)]
    pub graph: Option<PathBuf>,
    /// GeoJSON network to preprocess on the fly.
    #[arg(long)]
    pub network: Option<PathBuf>,
    /// Start coordinate as `lon,lat`.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub from: Coord<f64>,
    /// Finish coordinate as `lon,lat`.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    pub to: Coord<f64>,
    /// Move both coordinates to their nearest routable vertex first.
    #[arg(long)]
    pub snap: bool,
    /// Tolerance the graph was (or will be) built with. Must match the
    /// `preprocess` tolerance of a stored graph.
    #[arg(long, default_value_t = 1e-5)]
    pub tolerance: f64,
    /// Route over graphs without any intersection; every query finds nothing.
    #[arg(long)]
    pub allow_degenerate: bool,
    /// How segment lengths are measured when routing over `--network`.
    #[arg(long, value_enum, default_value_t = Metric::Haversine)]
    pub metric: Metric,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Returns `false` when no route exists.
pub fn handle_route(args: &RouteArgs) -> Result<bool> {
    let mut finder = load_finder(args)?;

    let result = if args.snap {
        if let Some((key, position, distance)) = finder.nearest_vertex(args.from) {
            debug!(vertex = %key, x = position.x, y = position.y, distance, "snapped start");
        }
        finder.find_path_snapped(args.from, args.to)
    } else {
        for (label, coord) in [("start", args.from), ("finish", args.to)] {
            let key = finder.options().vertex_key(coord);
            if !finder.graph().source.contains(&key) {
                warn!(
                    endpoint = label,
                    vertex = %key,
                    tolerance = args.tolerance,
                    "coordinate is not a network vertex; check --tolerance or use --snap"
                );
            }
        }
        finder.find_path(args.from, args.to)
    };
    let path = result.context("route query failed")?;

    let Some(path) = path else {
        println!("No route found");
        return Ok(false);
    };

    println!("{}", render_path(&path, args.format)?);
    Ok(true)
}

fn load_finder(args: &RouteArgs) -> Result<PathFinder<()>> {
    let degenerate = if args.allow_degenerate {
        DegeneratePolicy::Allow
    } else {
        DegeneratePolicy::Reject
    };
    let options = GraphOptions::default()
        .with_tolerance(args.tolerance)
        .with_degenerate(degenerate);

    if let Some(graph_path) = &args.graph {
        let graph = load_stored_graph(graph_path)?;
        return PathFinder::from_graph(graph, options, None::<fn(&(), &()) -> ()>)
            .context("stored graph cannot be routed");
    }

    let network_path = args
        .network
        .as_ref()
        .context("either --graph or --network is required")?;
    let network = read_network(network_path)
        .with_context(|| format!("failed to read network from {}", network_path.display()))?;
    PathFinderBuilder::new(options)
        .weight(line_weight(args.metric))
        .build(&network)
        .context("failed to build routing graph")
}
