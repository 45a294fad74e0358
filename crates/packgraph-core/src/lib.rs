//! # packgraph-core
//!
//! Core layer for Packgraph: the compressed adjacency-list storage engine.
//!
//! This crate turns per-node edge batches into an immutable, memory-dense
//! topology and decodes it through cursors. It depends only on
//! `packgraph-common`.
//!
//! ## Modules
//!
//! - [`storage`] - Codecs (VarLong, bit packing, delta encoding, aggregation)
//! - [`adjacency`] - Packing strategies, compressor factory, cursors, frozen lists
//! - [`statistics`] - Memory accounting for built structures

pub mod adjacency;
pub mod statistics;
pub mod storage;

// Re-export commonly used types
pub use adjacency::{
    AdjacencyCompressor, AdjacencyCompressorFactory, AdjacencyConfig, AdjacencyCursor,
    AdjacencyListsWithProperties, ImmutableAdjacencyList, ImmutableProperties, PackingStrategy,
    PropertyCursor,
};
pub use statistics::{BlockStatistics, MemoryInfo};
pub use storage::{Aggregation, DeltaEncoder};
