//! Compressed, immutable adjacency lists.
//!
//! Construction runs in two phases:
//!
//! 1. An [`AdjacencyCompressorFactory`] sizes the per-node arrays. Workers
//!    each take an [`AdjacencyCompressor`] and call `compress` once per node,
//!    in parallel over disjoint nodes.
//! 2. [`AdjacencyCompressorFactory::build`] freezes everything into an
//!    [`ImmutableAdjacencyList`] (and [`ImmutableProperties`] when property
//!    columns are configured), read through [`AdjacencyCursor`]s.
//!
//! # Example
//!
//! ```
//! use packgraph_common::types::NodeId;
//! use packgraph_core::adjacency::{AdjacencyCompressorFactory, AdjacencyConfig, PackingStrategy};
//!
//! let config = AdjacencyConfig::new().with_packing(PackingStrategy::FixedWidthPacked);
//! let factory = AdjacencyCompressorFactory::new(4, config)?;
//! factory.compressor().compress(NodeId::new(0), &[3, 1, 2])?;
//! let lists = factory.build();
//!
//! let mut cursor = lists.adjacency.adjacency_cursor(NodeId::new(0));
//! assert_eq!(cursor.advance(2), Some(2));
//! assert_eq!(cursor.next(), Some(3));
//! # Ok::<(), packgraph_common::Error>(())
//! ```

mod compressor;
mod config;
mod cursor;
mod list;
mod packing;
mod properties;

pub use compressor::{AdjacencyCompressor, AdjacencyCompressorFactory};
pub use config::{AdjacencyConfig, PackingStrategy};
pub use cursor::AdjacencyCursor;
pub use list::{AdjacencyListsWithProperties, ImmutableAdjacencyList};
pub use packing::{BLOCK_SIZE, HEADER_ENTRY_BYTES, INLINED_HEAD};
pub use properties::{ImmutableProperties, ImmutablePropertyList, PropertyCursor};
