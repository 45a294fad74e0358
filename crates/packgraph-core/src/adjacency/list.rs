//! The frozen adjacency structure handed to readers.

use std::sync::Arc;

use packgraph_common::memory::PageTable;
use packgraph_common::types::NodeId;

use super::config::PackingStrategy;
use super::cursor::AdjacencyCursor;
use super::properties::ImmutableProperties;
use crate::statistics::{BlockStatistics, MemoryInfo};

/// Immutable compressed adjacency lists of every node.
///
/// `Send + Sync`: any number of threads may read concurrently, each with its
/// own cursors.
#[derive(Debug)]
pub struct ImmutableAdjacencyList {
    pages: PageTable,
    degrees: Arc<[u32]>,
    offsets: Box<[u64]>,
    format: PackingStrategy,
    node_count: usize,
    relationship_count: u64,
    record_bytes: BlockStatistics,
}

impl ImmutableAdjacencyList {
    pub(crate) fn new(
        pages: PageTable,
        degrees: Arc<[u32]>,
        offsets: Box<[u64]>,
        format: PackingStrategy,
        relationship_count: u64,
        record_bytes: BlockStatistics,
    ) -> Self {
        Self {
            node_count: degrees.len(),
            pages,
            degrees,
            offsets,
            format,
            relationship_count,
            record_bytes,
        }
    }

    /// Returns the post-aggregation degree of `node`, 0 after release.
    #[inline]
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.degrees.get(node.index()).copied().unwrap_or(0) as usize
    }

    /// Returns a cursor positioned before the first target of `node`.
    #[must_use]
    pub fn adjacency_cursor(&self, node: NodeId) -> AdjacencyCursor<'_> {
        let mut cursor = self.raw_cursor();
        self.adjacency_cursor_reuse(&mut cursor, node);
        cursor
    }

    /// Rebinds an existing cursor to `node`, reusing its window buffer.
    pub fn adjacency_cursor_reuse<'a>(&'a self, cursor: &mut AdjacencyCursor<'a>, node: NodeId) {
        let degree = self.degree(node);
        let offset = if degree == 0 {
            0
        } else {
            self.offsets[node.index()]
        };
        cursor.init(offset, degree);
    }

    /// Returns an unbound cursor for use with
    /// [`adjacency_cursor_reuse`](Self::adjacency_cursor_reuse).
    #[must_use]
    pub fn raw_cursor(&self) -> AdjacencyCursor<'_> {
        AdjacencyCursor::new(&self.pages, self.format)
    }

    /// Returns the number of nodes the structure was built for.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the number of stored relationships.
    #[must_use]
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    /// Returns the record format.
    #[must_use]
    pub fn packing(&self) -> PackingStrategy {
        self.format
    }

    /// Returns the page table.
    #[must_use]
    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    /// Returns page and array accounting for this structure.
    #[must_use]
    pub fn memory_info(&self) -> MemoryInfo {
        MemoryInfo {
            node_count: self.node_count,
            relationship_count: self.relationship_count,
            page_size: self.pages.page_size(),
            page_count: self.pages.page_count(),
            oversized_page_count: self.pages.oversized_page_count(),
            bytes_in_pages: self.pages.bytes(),
            bytes_in_arrays: self.degrees.len() * size_of::<u32>()
                + self.offsets.len() * size_of::<u64>(),
            record_bytes: self.record_bytes.clone(),
        }
    }

    /// Frees every page and zeroes all degrees.
    ///
    /// Cursors created afterwards are empty. Returns the bytes released.
    pub fn release(&mut self) -> usize {
        let released = self.pages.release();
        self.degrees = Arc::from(Vec::new());
        self.offsets = Box::default();
        self.relationship_count = 0;
        tracing::debug!(bytes = released, "released adjacency pages");
        released
    }
}

/// Output of one build: the topology plus, if configured, its properties.
#[derive(Debug)]
pub struct AdjacencyListsWithProperties {
    /// Topology.
    pub adjacency: ImmutableAdjacencyList,
    /// Property blocks aligned with the topology.
    pub properties: Option<ImmutableProperties>,
}

impl AdjacencyListsWithProperties {
    /// Returns combined accounting for topology and properties.
    #[must_use]
    pub fn memory_info(&self) -> MemoryInfo {
        let mut info = self.adjacency.memory_info();
        if let Some(properties) = &self.properties {
            info.page_count += properties.pages().page_count();
            info.oversized_page_count += properties.pages().oversized_page_count();
            info.bytes_in_pages += properties.pages().bytes();
            info.bytes_in_arrays += properties.array_bytes();
        }
        info
    }

    /// Frees every page of topology and properties.
    pub fn release(&mut self) -> usize {
        self.adjacency.release() + self.properties.as_mut().map_or(0, |p| p.release())
    }
}
