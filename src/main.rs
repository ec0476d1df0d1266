//! # Towergraph CLI
//!
//! Imports road geometries into a graph file and inspects the result.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::error;

use towergraph::{
    parse_tag_list, CarTagEncoder, GeoJsonSource, GraphFile, GraphImporter, MemGraph,
};

#[derive(Parser)]
#[command(name = "towergraph")]
#[command(about = "Converts road geometries into a routable tower-node graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a GeoJSON roads file into a graph file
    Import {
        /// Input roads file (GeoJSON FeatureCollection)
        input: PathBuf,
        /// Output graph file
        output: PathBuf,
        /// Extra source attributes to copy onto ways, comma-separated
        #[arg(long, default_value = "")]
        tags_to_copy: String,
    },
    /// Check a graph file's checksum and header
    Verify {
        /// Graph file
        graph: PathBuf,
    },
    /// Print node/edge counts and total edge length
    Stats {
        /// Graph file
        graph: PathBuf,
    },
}

fn main() {
    // Logging goes to stderr so piped output stays clean.
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run() {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            input,
            output,
            tags_to_copy,
        } => import(&input, &output, &tags_to_copy),
        Commands::Verify { graph } => verify(&graph),
        Commands::Stats { graph } => stats(&graph),
    }
}

fn import(input: &Path, output: &Path, tags_to_copy: &str) -> Result<()> {
    println!("🦋 Importing {}", input.display());
    let start = Instant::now();

    let source = GeoJsonSource::new(input);
    let mut importer =
        GraphImporter::new(source, CarTagEncoder).with_copied_tags(parse_tag_list(tags_to_copy));

    let mut graph = MemGraph::new();
    let summary = importer
        .read_graph(&mut graph)
        .with_context(|| format!("importing {}", input.display()))?;

    println!(
        "✓ {} nodes, {} edges ({} ways rejected) in {:.2}s",
        summary.nodes,
        summary.edges_committed,
        summary.ways_rejected,
        start.elapsed().as_secs_f64()
    );

    GraphFile::write(output, &graph.nodes, &graph.edges)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("✅ Graph saved to {}", output.display());
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let info =
        GraphFile::verify(path).with_context(|| format!("verifying {}", path.display()))?;

    println!(
        "✓ {} verified: {} nodes, {} edges",
        path.display(),
        info.node_count,
        info.edge_count
    );
    Ok(())
}

fn stats(path: &Path) -> Result<()> {
    let graph = GraphFile::read(path).with_context(|| format!("reading {}", path.display()))?;

    println!("Nodes:        {}", graph.node_count());
    println!("Edges:        {}", graph.edge_count());
    println!("Total length: {:.3} km", graph.total_edge_length_m() / 1000.0);
    Ok(())
}
