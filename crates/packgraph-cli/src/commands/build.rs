//! Build one graph and report its footprint.

use anyhow::Result;
use packgraph_core::PackingStrategy;

use super::{BuildSummary, Edges, GraphArgs, measure};
use crate::OutputFormat;
use crate::output::{self, Format};

/// Run the build command.
pub fn run(args: &GraphArgs, packing: PackingStrategy, format: OutputFormat, quiet: bool) -> Result<()> {
    let config = args.config(packing);
    config.validate()?;

    let edges = Edges::generate(args);
    let measured = measure(args, &edges, config)?;
    let summary = BuildSummary::new(packing, &edges, &measured);

    match Format::from(format) {
        Format::Json => output::print_json(&summary, quiet)?,
        Format::Table => {
            let memory = &summary.memory;
            let records = &memory.record_bytes;
            let items = vec![
                ("Packing", packing.to_string()),
                ("Nodes", memory.node_count.to_string()),
                ("Raw edges", summary.raw_edges.to_string()),
                ("Relationships", memory.relationship_count.to_string()),
                ("Pages", memory.page_count.to_string()),
                ("Oversized pages", memory.oversized_page_count.to_string()),
                ("Page bytes", output::format_bytes(memory.bytes_in_pages)),
                ("Array bytes", output::format_bytes(memory.bytes_in_arrays)),
                ("Total", output::format_bytes(memory.total_bytes())),
                (
                    "Bytes/relationship",
                    format!("{:.3}", memory.bytes_per_relationship()),
                ),
                ("Record mean", format!("{:.1} B", records.mean())),
                ("Record p50", format!("{} B", records.quantile(0.5))),
                ("Record p99", format!("{} B", records.quantile(0.99))),
                ("Record max", format!("{} B", records.max)),
                ("Record sizes", output::format_histogram(records.buckets())),
                ("Build", output::format_ms(summary.build_ms)),
                ("Scan", output::format_ms(summary.scan_ms)),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }
    Ok(())
}
