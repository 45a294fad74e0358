//! # packgraph-common
//!
//! Foundation layer for Packgraph: types, the page arena, and utilities.
//!
//! This crate provides the fundamental building blocks used by all other
//! Packgraph crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (NodeId)
//! - [`memory`] - Page arena and per-worker bump allocators
//! - [`utils`] - Utility functions and helpers (errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod memory;
pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use memory::{Address, PageAllocator, PageArena, PageTable};
pub use types::NodeId;
pub use utils::error::{Error, Result};
