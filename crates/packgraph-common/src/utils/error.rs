//! Error types shared by every Packgraph crate.

use thiserror::Error;

/// Result type alias using the Packgraph [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or configuring an adjacency structure.
///
/// Reading a frozen structure never fails; cursor misuse is a contract
/// violation checked by debug assertions instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A target id outside `[0, node_count)` reached the compressor.
    #[error("invalid topology: node {node} references target {target}, but node count is {node_count}")]
    InvalidTopology {
        /// Source node of the offending edge.
        node: u64,
        /// Offending target id.
        target: u64,
        /// Number of nodes the structure was sized for.
        node_count: u64,
    },

    /// A node id outside `[0, node_count)` was passed to the compressor.
    #[error("invalid node {node}: node count is {node_count}")]
    InvalidNode {
        /// Offending node id.
        node: u64,
        /// Number of nodes the structure was sized for.
        node_count: u64,
    },

    /// The requested configuration cannot be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A page could not be reserved.
    #[error("out of memory: failed to reserve {requested} bytes")]
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },

    /// Construction was abandoned through the termination flag.
    #[error("construction terminated")]
    Terminated,

    /// Internal invariant violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidTopology {
            node: 1,
            target: 9,
            node_count: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid topology: node 1 references target 9, but node count is 4"
        );
        assert_eq!(
            Error::configuration("bad").to_string(),
            "configuration error: bad"
        );
        assert_eq!(
            Error::OutOfMemory { requested: 8 }.to_string(),
            "out of memory: failed to reserve 8 bytes"
        );
    }
}
