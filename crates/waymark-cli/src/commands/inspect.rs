use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use waymark_cli::network::load_stored_graph;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Stored routing graph (binary, or JSON when ending in `.json`).
    #[arg(long)]
    pub graph: PathBuf,
}

pub fn handle_inspect(args: &InspectArgs) -> Result<()> {
    let graph = load_stored_graph(&args.graph)?;

    println!("Routing graph at {}:", args.graph.display());
    println!("  Source vertices: {}", graph.source.vertex_count());
    println!("  Source edges: {}", graph.source.edge_count());
    println!("  Forks: {}", graph.compacted.vertex_count());
    println!("  Compacted edges: {}", graph.compacted.edge_count());
    println!(
        "  Edge data: {}",
        if graph.has_edge_data() { "yes" } else { "no" }
    );

    Ok(())
}
