//! Per-node compression into shared page arenas.
//!
//! The factory owns the per-node bookkeeping arrays and the arenas. Every
//! worker takes its own [`AdjacencyCompressor`], which owns its page
//! allocators and encoder scratch, so compressing distinct nodes on
//! different threads needs no locks: degrees and offsets are written with
//! relaxed atomic stores to disjoint slots, and the relationship counter is
//! a single atomic add per node.
//!
//! [`AdjacencyCompressorFactory::build`] takes the factory by value. Because
//! compressors borrow the factory, the borrow checker rules out a build
//! while any compressor is still alive.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use packgraph_common::memory::{PageAllocator, PageArena};
use packgraph_common::types::NodeId;
use packgraph_common::utils::error::{Error, Result};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::config::AdjacencyConfig;
use super::list::{AdjacencyListsWithProperties, ImmutableAdjacencyList};
use super::properties::{self, ImmutableProperties};
use crate::statistics::BlockStatistics;
use crate::storage::{Aggregation, DeltaEncoder};

/// Shared state of one adjacency build.
pub struct AdjacencyCompressorFactory {
    config: AdjacencyConfig,
    aggregations: SmallVec<[Aggregation; 4]>,
    node_count: usize,
    degrees: Box<[AtomicU32]>,
    offsets: Box<[AtomicU64]>,
    property_offsets: Option<Box<[AtomicU64]>>,
    adjacency_pages: PageArena,
    property_pages: Option<PageArena>,
    relationship_count: CachePadded<AtomicU64>,
    record_bytes: Mutex<BlockStatistics>,
}

impl AdjacencyCompressorFactory {
    /// Validates `config` and allocates zeroed per-node arrays for
    /// `node_count` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid configuration, before
    /// any node is compressed.
    pub fn new(node_count: usize, config: AdjacencyConfig) -> Result<Self> {
        config.validate()?;
        let adjacency_pages = PageArena::with_page_size(config.page_size)?;
        let (property_offsets, property_pages) = if config.property_count > 0 {
            (
                Some(zeroed_u64(node_count)),
                Some(PageArena::with_page_size(config.page_size)?),
            )
        } else {
            (None, None)
        };

        tracing::debug!(
            node_count,
            packing = %config.packing,
            properties = config.property_count,
            page_size = config.page_size,
            "adjacency compressor factory initialized"
        );

        Ok(Self {
            aggregations: config.resolved_aggregations(),
            node_count,
            degrees: (0..node_count).map(|_| AtomicU32::new(0)).collect(),
            offsets: zeroed_u64(node_count),
            property_offsets,
            adjacency_pages,
            property_pages,
            relationship_count: CachePadded::new(AtomicU64::new(0)),
            record_bytes: Mutex::new(BlockStatistics::new()),
            config,
        })
    }

    /// Creates a compressor for the calling worker.
    #[must_use]
    pub fn compressor(&self) -> AdjacencyCompressor<'_> {
        AdjacencyCompressor {
            factory: self,
            adjacency: self.adjacency_pages.allocator(),
            properties: self.property_pages.as_ref().map(PageArena::allocator),
            encoder: DeltaEncoder::new(),
            record_bytes: BlockStatistics::new(),
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AdjacencyConfig {
        &self.config
    }

    /// Returns the number of relationships compressed so far.
    #[must_use]
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count.load(Ordering::Relaxed)
    }

    /// Freezes pages and arrays into the immutable structure.
    #[must_use]
    pub fn build(self) -> AdjacencyListsWithProperties {
        let Self {
            config,
            node_count,
            degrees,
            offsets,
            property_offsets,
            adjacency_pages,
            property_pages,
            relationship_count,
            record_bytes,
            ..
        } = self;

        let degrees: Arc<[u32]> = degrees
            .into_vec()
            .into_iter()
            .map(AtomicU32::into_inner)
            .collect();
        let relationship_count = relationship_count.into_inner().into_inner();
        let pages = adjacency_pages.finish();

        tracing::debug!(
            node_count,
            relationship_count,
            pages = pages.page_count(),
            bytes = pages.bytes(),
            "adjacency build finished"
        );

        let properties = property_pages
            .zip(property_offsets)
            .map(|(arena, offsets)| {
                ImmutableProperties::new(
                    arena.finish(),
                    freeze_u64(offsets),
                    Arc::clone(&degrees),
                    config.property_count,
                )
            });
        let adjacency = ImmutableAdjacencyList::new(
            pages,
            degrees,
            freeze_u64(offsets),
            config.packing,
            relationship_count,
            record_bytes.into_inner(),
        );

        AdjacencyListsWithProperties {
            adjacency,
            properties,
        }
    }
}

fn zeroed_u64(len: usize) -> Box<[AtomicU64]> {
    (0..len).map(|_| AtomicU64::new(0)).collect()
}

fn freeze_u64(values: Box<[AtomicU64]>) -> Box<[u64]> {
    values
        .into_vec()
        .into_iter()
        .map(AtomicU64::into_inner)
        .collect()
}

/// Per-worker compressor. Not `Sync`; create one per thread.
pub struct AdjacencyCompressor<'a> {
    factory: &'a AdjacencyCompressorFactory,
    adjacency: PageAllocator<'a>,
    properties: Option<PageAllocator<'a>>,
    encoder: DeltaEncoder,
    record_bytes: BlockStatistics,
}

impl AdjacencyCompressor<'_> {
    /// Compresses the targets of `node` and returns its final degree.
    ///
    /// Each node must be compressed exactly once across all compressors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] or [`Error::InvalidTopology`] for ids
    /// outside `[0, node_count)`, [`Error::Configuration`] if the build
    /// expects properties, and [`Error::OutOfMemory`] if a page cannot be
    /// reserved.
    pub fn compress(&mut self, node: NodeId, targets: &[u64]) -> Result<usize> {
        let factory = self.factory;
        if factory.config.property_count > 0 {
            return Err(Error::configuration(format!(
                "expected {} property columns, got none",
                factory.config.property_count
            )));
        }
        factory.check_node(node)?;
        let degree = self
            .encoder
            .encode(targets, factory.config.topology_aggregation());
        self.store(node, degree)
    }

    /// Compresses the targets of `node` with one property column per
    /// configured aggregation, returning the final degree.
    ///
    /// `properties[c][i]` is column `c` of the edge to `targets[i]`.
    ///
    /// # Errors
    ///
    /// As [`compress`](Self::compress), plus [`Error::Configuration`] if the
    /// number or length of the columns does not match.
    pub fn compress_with_properties<P: AsRef<[f64]>>(
        &mut self,
        node: NodeId,
        targets: &[u64],
        properties: &[P],
    ) -> Result<usize> {
        let factory = self.factory;
        if factory.config.property_count == 0 && properties.is_empty() {
            return self.compress(node, targets);
        }
        if properties.len() != factory.config.property_count {
            return Err(Error::configuration(format!(
                "expected {} property columns, got {}",
                factory.config.property_count,
                properties.len()
            )));
        }
        if let Some(column) = properties
            .iter()
            .position(|column| column.as_ref().len() != targets.len())
        {
            return Err(Error::configuration(format!(
                "property column {column} has {} values for {} targets",
                properties[column].as_ref().len(),
                targets.len()
            )));
        }
        factory.check_node(node)?;
        let degree = self
            .encoder
            .encode_with_properties(targets, properties, &factory.aggregations);
        self.store(node, degree)
    }

    fn store(&mut self, node: NodeId, degree: usize) -> Result<usize> {
        let factory = self.factory;
        let index = node.index();
        if let Some(target) = self.encoder.max_target() {
            if target >= factory.node_count as u64 {
                return Err(Error::InvalidTopology {
                    node: node.as_u64(),
                    target,
                    node_count: factory.node_count as u64,
                });
            }
        }
        let stored = u32::try_from(degree)
            .map_err(|_| Error::Internal(format!("degree {degree} of {node} exceeds u32")))?;

        if degree > 0 {
            let (address, bytes) = factory
                .config
                .packing
                .pack(self.encoder.deltas(), &mut self.adjacency)?;
            factory.offsets[index].store(address, Ordering::Relaxed);
            self.record_bytes.record(bytes as u64);

            if let (Some(allocator), Some(offsets)) =
                (self.properties.as_mut(), factory.property_offsets.as_ref())
            {
                let columns: SmallVec<[&[f64]; 4]> = (0..self.encoder.column_count())
                    .map(|c| self.encoder.column(c))
                    .collect();
                let (address, out) =
                    allocator.allocate(properties::block_len(columns.len(), degree))?;
                properties::write_block(&columns, out);
                offsets[index].store(address, Ordering::Relaxed);
            }
        }

        factory.degrees[index].store(stored, Ordering::Relaxed);
        factory
            .relationship_count
            .fetch_add(degree as u64, Ordering::Relaxed);
        Ok(degree)
    }
}

impl AdjacencyCompressorFactory {
    fn check_node(&self, node: NodeId) -> Result<()> {
        if node.index() >= self.node_count {
            return Err(Error::InvalidNode {
                node: node.as_u64(),
                node_count: self.node_count as u64,
            });
        }
        Ok(())
    }
}

impl Drop for AdjacencyCompressor<'_> {
    fn drop(&mut self) {
        if !self.record_bytes.is_empty() {
            self.factory.record_bytes.lock().merge(&self.record_bytes);
        }
    }
}
