//! Packgraph CLI - build and measure compressed adjacency stores.
//!
//! Generates synthetic graphs, compresses them with one or every packing
//! strategy, and reports memory footprint and decode throughput.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use packgraph_core::PackingStrategy;

use crate::commands::GraphArgs;

/// Packgraph adjacency store tool.
///
/// Builds synthetic graphs and prints memory statistics for the
/// available packing strategies.
#[derive(Parser)]
#[command(name = "packgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build one graph and show its memory statistics
    Build {
        #[command(flatten)]
        graph: GraphArgs,

        /// Packing strategy (plain, packed, aligned, inlined)
        #[arg(long, short, default_value = "plain")]
        packing: PackingStrategy,
    },

    /// Build the same graph with every packing strategy and compare them
    Compare {
        #[command(flatten)]
        graph: GraphArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let result = match cli.command {
        Commands::Build { graph, packing } => {
            commands::build::run(&graph, packing, cli.format, cli.quiet)
        }
        Commands::Compare { graph } => commands::compare::run(&graph, cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
