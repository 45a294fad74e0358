//! Core type definitions for Packgraph.
//!
//! - Identifier types ([`NodeId`])

mod id;

pub use id::NodeId;
