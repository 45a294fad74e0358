//! Build one graph with every packing strategy and compare footprints.

use anyhow::Result;
use comfy_table::Cell;
use packgraph_core::PackingStrategy;

use super::{BuildSummary, Edges, GraphArgs, measure};
use crate::OutputFormat;
use crate::output::{self, Format};

/// Run the compare command.
pub fn run(args: &GraphArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let edges = Edges::generate(args);
    let mut summaries = Vec::new();

    for packing in PackingStrategy::ALL {
        if args.weights && !packing.supports_properties() {
            tracing::info!(%packing, "skipping strategy without property support");
            continue;
        }
        let measured = measure(args, &edges, args.config(packing))?;
        summaries.push(BuildSummary::new(packing, &edges, &measured));
    }

    if let Some(mismatch) = summaries.iter().find(|s| s.checksum != summaries[0].checksum) {
        anyhow::bail!(
            "{} and {} decoded different targets",
            summaries[0].packing,
            mismatch.packing
        );
    }

    match Format::from(format) {
        Format::Json => output::print_json(&summaries, quiet)?,
        Format::Table => {
            output::status(
                &format!(
                    "{} nodes, {} raw edges, aggregation {}",
                    args.nodes,
                    edges.len(),
                    args.aggregation
                ),
                quiet,
            );
            let mut table = output::create_table();
            output::add_header(
                &mut table,
                &[
                    "Packing",
                    "Relationships",
                    "Pages",
                    "Total",
                    "Bytes/rel",
                    "Build",
                    "Scan",
                ],
            );
            for summary in &summaries {
                let memory = &summary.memory;
                table.add_row(vec![
                    Cell::new(summary.packing),
                    Cell::new(memory.relationship_count),
                    Cell::new(memory.page_count),
                    Cell::new(output::format_bytes(memory.total_bytes())),
                    Cell::new(format!("{:.3}", memory.bytes_per_relationship())),
                    Cell::new(output::format_ms(summary.build_ms)),
                    Cell::new(output::format_ms(summary.scan_ms)),
                ]);
            }
            if !quiet {
                println!("{table}");
            }
        }
    }
    Ok(())
}
