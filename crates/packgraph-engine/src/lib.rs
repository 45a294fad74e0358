//! # packgraph-engine
//!
//! The entry point for Packgraph: configuration, parallel construction of
//! compressed graphs from raw edges, and the read-only graph facade.
//!
//! ## Modules
//!
//! - [`config`] - Build configuration
//! - [`builder`] - Edge bucketing and partitioned parallel compression
//! - [`graph`] - The frozen, shareable [`CompressedGraph`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod graph;

pub use builder::GraphBuilder;
pub use config::Config;
pub use graph::CompressedGraph;
