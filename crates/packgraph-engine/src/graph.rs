//! The read-only graph handed to algorithms.

use packgraph_common::types::NodeId;
use packgraph_core::adjacency::{
    AdjacencyCursor, AdjacencyListsWithProperties, ImmutableAdjacencyList, ImmutableProperties,
    PropertyCursor,
};
use packgraph_core::statistics::MemoryInfo;

use crate::config::Config;

/// An immutable compressed graph.
///
/// Shareable across threads; each reader creates its own cursors.
#[derive(Debug)]
pub struct CompressedGraph {
    lists: AdjacencyListsWithProperties,
    config: Config,
}

impl CompressedGraph {
    pub(crate) fn new(lists: AdjacencyListsWithProperties, config: Config) -> Self {
        Self { lists, config }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.lists.adjacency.node_count()
    }

    /// Returns the number of stored relationships.
    #[must_use]
    pub fn relationship_count(&self) -> u64 {
        self.lists.adjacency.relationship_count()
    }

    /// Returns the out-degree of `node` after aggregation.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.lists.adjacency.degree(node)
    }

    /// Returns a cursor over the targets of `node`.
    #[must_use]
    pub fn adjacency_cursor(&self, node: NodeId) -> AdjacencyCursor<'_> {
        self.lists.adjacency.adjacency_cursor(node)
    }

    /// Returns the sorted targets of `node`.
    pub fn neighbors(&self, node: NodeId) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.adjacency_cursor(node)
    }

    /// Returns a cursor over property `column` of `node`, aligned with
    /// [`adjacency_cursor`](Self::adjacency_cursor), or `None` if the graph
    /// has no property `column`.
    #[must_use]
    pub fn property_cursor(&self, column: usize, node: NodeId) -> Option<PropertyCursor<'_>> {
        self.lists
            .properties
            .as_ref()
            .filter(|properties| column < properties.column_count())
            .map(|properties| properties.property_cursor(column, node))
    }

    /// Returns the topology.
    #[must_use]
    pub fn adjacency(&self) -> &ImmutableAdjacencyList {
        &self.lists.adjacency
    }

    /// Returns the property columns, if configured.
    #[must_use]
    pub fn properties(&self) -> Option<&ImmutableProperties> {
        self.lists.properties.as_ref()
    }

    /// Returns the configuration the graph was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns page and array accounting for topology and properties.
    #[must_use]
    pub fn memory_info(&self) -> MemoryInfo {
        self.lists.memory_info()
    }

    /// Frees all pages. Every node has degree 0 afterwards.
    pub fn release(&mut self) -> usize {
        let bytes = self.lists.release();
        tracing::debug!(bytes, "released graph");
        bytes
    }
}
