//! # Packgraph
//!
//! Compressed, immutable adjacency lists for in-memory graph analytics.
//!
//! If you're new here, start with [`GraphBuilder`]: add edges, call
//! `build`, and read the resulting [`CompressedGraph`] through cursors.
//! Neighbor lists are sorted, delta-encoded, and stored in one of four
//! record formats chosen with [`PackingStrategy`].
//!
//! ## Packing Strategies
//!
//! | Strategy | Layout | Properties |
//! | -------- | ------ | ---------- |
//! | `plain` | VarLong deltas | yes |
//! | `packed` | Bit-packed 64-delta chunks, VarLong tail | yes |
//! | `aligned` | Chunk header with bases, then bit-packed chunks | no |
//! | `inlined` | VarLong head of 4, then as `packed` | yes |
//!
//! ## Quick Start
//!
//! ```rust
//! use packgraph::{Aggregation, Config, GraphBuilder, NodeId, PackingStrategy};
//!
//! let config = Config::default()
//!     .with_packing(PackingStrategy::FixedWidthPacked)
//!     .with_properties(&[Aggregation::Sum]);
//!
//! let mut builder = GraphBuilder::new(3, config)?;
//! builder.add_edge(NodeId::new(0), NodeId::new(2), &[1.0])?;
//! builder.add_edge(NodeId::new(0), NodeId::new(2), &[2.0])?;
//! builder.add_edge(NodeId::new(0), NodeId::new(1), &[0.5])?;
//! let graph = builder.build()?;
//!
//! let mut cursor = graph.adjacency_cursor(NodeId::new(0));
//! assert_eq!(cursor.advance(2), Some(2));
//! let weights: Vec<f64> = graph.property_cursor(0, NodeId::new(0)).unwrap().collect();
//! assert_eq!(weights, vec![0.5, 3.0]);
//! # Ok::<(), packgraph::Error>(())
//! ```

// Re-export the build and read API
pub use packgraph_engine::{CompressedGraph, Config, GraphBuilder};

// Re-export the storage layer for callers driving compression themselves
pub use packgraph_core::{
    AdjacencyCompressor, AdjacencyCompressorFactory, AdjacencyConfig, AdjacencyCursor,
    Aggregation, ImmutableAdjacencyList, MemoryInfo, PackingStrategy, PropertyCursor,
};

// Re-export core types - you'll need these for ids and error handling
pub use packgraph_common::types::NodeId;
pub use packgraph_common::utils::error::{Error, Result};
