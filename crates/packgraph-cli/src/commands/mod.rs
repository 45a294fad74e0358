//! CLI command implementations.

pub mod build;
pub mod compare;

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use packgraph_common::types::NodeId;
use packgraph_core::{Aggregation, PackingStrategy};
use packgraph_engine::{CompressedGraph, Config, GraphBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Shape of the synthetic graph.
#[derive(Args, Clone)]
pub struct GraphArgs {
    /// Number of nodes
    #[arg(long, short, default_value_t = 100_000)]
    pub nodes: usize,

    /// Average out-degree
    #[arg(long, short, default_value_t = 16)]
    pub degree: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Parallel edge policy (none, single, min, max, sum, count)
    #[arg(long, short, default_value = "none")]
    pub aggregation: Aggregation,

    /// Attach one random weight per edge, merged with the aggregation
    #[arg(long)]
    pub weights: bool,

    /// Page size in bytes (power of two)
    #[arg(long, default_value_t = 1 << 18)]
    pub page_size: usize,

    /// Worker threads (default: available cores)
    #[arg(long, short)]
    pub threads: Option<usize>,

    /// Nodes per construction task
    #[arg(long, default_value_t = 10_000)]
    pub partition_size: usize,
}

impl GraphArgs {
    /// Returns the engine configuration for `packing`.
    pub fn config(&self, packing: PackingStrategy) -> Config {
        let mut config = Config::default()
            .with_packing(packing)
            .with_page_size(self.page_size)
            .with_partition_size(self.partition_size);
        config = if self.weights {
            config.with_properties(&[self.aggregation])
        } else {
            config.with_aggregation(self.aggregation)
        };
        if let Some(threads) = self.threads {
            config = config.with_concurrency(threads);
        }
        config
    }
}

/// One synthetic edge list, shared by every strategy of a run.
pub struct Edges {
    edges: Vec<(u64, u64, f64)>,
}

impl Edges {
    /// Generates edges with a mix of local and uniform targets.
    ///
    /// Local targets give small deltas, uniform ones give wide deltas, so
    /// every record format sees both regimes.
    pub fn generate(args: &GraphArgs) -> Self {
        let mut rng = StdRng::seed_from_u64(args.seed);
        let nodes = args.nodes as u64;
        let mut edges = Vec::with_capacity(args.nodes * args.degree);
        for source in 0..nodes {
            let degree = rng.gen_range(0..=2 * args.degree);
            for _ in 0..degree {
                let target = if rng.gen_bool(0.5) {
                    (source + rng.gen_range(0..256)) % nodes
                } else {
                    rng.gen_range(0..nodes)
                };
                edges.push((source, target, f64::from(rng.gen_range(1..=10u32))));
            }
        }
        tracing::debug!(edges = edges.len(), "generated synthetic graph");
        Self { edges }
    }

    /// Returns the number of raw edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }
}

/// A built graph with its timings.
pub struct Measured {
    pub graph: CompressedGraph,
    pub build_time: Duration,
    pub scan_time: Duration,
    pub checksum: u64,
}

/// Builds `edges` with `config` and times a full neighbor scan.
pub fn measure(args: &GraphArgs, edges: &Edges, config: Config) -> Result<Measured> {
    let with_weights = config.property_count() > 0;
    let start = Instant::now();
    let mut builder = GraphBuilder::new(args.nodes, config)?;
    for &(source, target, weight) in &edges.edges {
        let properties: &[f64] = if with_weights { &[weight] } else { &[] };
        builder.add_edge(NodeId::new(source), NodeId::new(target), properties)?;
    }
    let graph = builder.build()?;
    let build_time = start.elapsed();

    let start = Instant::now();
    let mut checksum = 0u64;
    let mut cursor = graph.adjacency().raw_cursor();
    for node in 0..graph.node_count() {
        graph
            .adjacency()
            .adjacency_cursor_reuse(&mut cursor, NodeId::from(node));
        checksum = checksum.wrapping_add(cursor.by_ref().sum::<u64>());
    }
    let scan_time = start.elapsed();

    Ok(Measured {
        graph,
        build_time,
        scan_time,
        checksum,
    })
}

/// Serializable summary of one build.
#[derive(Serialize)]
pub struct BuildSummary {
    pub packing: PackingStrategy,
    pub raw_edges: usize,
    pub build_ms: f64,
    pub scan_ms: f64,
    pub checksum: u64,
    pub memory: packgraph_core::MemoryInfo,
}

impl BuildSummary {
    pub fn new(packing: PackingStrategy, edges: &Edges, measured: &Measured) -> Self {
        Self {
            packing,
            raw_edges: edges.len(),
            build_ms: measured.build_time.as_secs_f64() * 1000.0,
            scan_ms: measured.scan_time.as_secs_f64() * 1000.0,
            checksum: measured.checksum,
            memory: measured.graph.memory_info(),
        }
    }
}
