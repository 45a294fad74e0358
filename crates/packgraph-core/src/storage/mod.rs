//! Encoding utilities for adjacency records.
//!
//! This module provides the building blocks the packing strategies are
//! made of:
//!
//! - [`varlong`] - 7-bit variable-length integers with exact pre-sizing
//! - [`bitpack`] - Fixed-width bit packing into little-endian words
//! - [`delta`] - Sort, delta-encode, and aggregate a node's targets
//! - [`aggregation`] - Merge policies for parallel edges
//!
//! # Encoding Costs
//!
//! | Codec | Best For | Bytes per value |
//! |-------|----------|-----------------|
//! | VarLong | Skewed deltas | 1-10 |
//! | BitPacked | Uniform small deltas | width / 8 |
//!
//! # Example
//!
//! ```
//! use packgraph_core::storage::{varlong, DeltaEncoder, Aggregation};
//!
//! let mut encoder = DeltaEncoder::new();
//! encoder.encode(&[7, 3, 3, 1], Aggregation::Single);
//! assert_eq!(encoder.deltas(), &[1, 2, 4]);
//!
//! let mut buf = vec![0u8; varlong::encoded_len_all(encoder.deltas())];
//! varlong::encode_all(encoder.deltas(), &mut buf);
//! assert_eq!(buf, [1, 2, 4]);
//! ```

pub mod aggregation;
pub mod bitpack;
pub mod delta;
pub mod varlong;

// Re-export commonly used types
pub use aggregation::Aggregation;
pub use delta::DeltaEncoder;
