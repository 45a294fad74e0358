//! Parallel construction of a [`CompressedGraph`] from raw edges.
//!
//! Edges are bucketed per source node as they arrive. [`GraphBuilder::build`]
//! then splits the node range into static partitions and compresses them on
//! a dedicated rayon pool, one compressor per task, so every node is
//! compressed exactly once and no two tasks share a node. A termination flag
//! is checked before each partition starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use packgraph_common::types::NodeId;
use packgraph_common::utils::error::{Error, Result};
use packgraph_core::adjacency::AdjacencyCompressorFactory;
use packgraph_core::storage::Aggregation;
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::config::Config;
use crate::graph::CompressedGraph;

/// Raw outgoing edges of one node.
#[derive(Debug, Default)]
struct Bucket {
    targets: Vec<u64>,
    properties: SmallVec<[Vec<f64>; 2]>,
}

/// Collects edges and builds an immutable [`CompressedGraph`].
///
/// # Examples
///
/// ```
/// use packgraph_common::types::NodeId;
/// use packgraph_engine::{Config, GraphBuilder};
///
/// let mut builder = GraphBuilder::new(3, Config::default())?;
/// builder.add_edge(NodeId::new(0), NodeId::new(2), &[])?;
/// builder.add_edge(NodeId::new(0), NodeId::new(1), &[])?;
/// let graph = builder.build()?;
///
/// assert_eq!(graph.neighbors(NodeId::new(0)).collect::<Vec<_>>(), vec![1, 2]);
/// # Ok::<(), packgraph_common::Error>(())
/// ```
pub struct GraphBuilder {
    config: Config,
    aggregations: SmallVec<[Aggregation; 4]>,
    buckets: Vec<Bucket>,
    edge_count: u64,
    terminated: Arc<AtomicBool>,
}

impl GraphBuilder {
    /// Creates a builder for `node_count` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `config` is invalid.
    pub fn new(node_count: usize, config: Config) -> Result<Self> {
        config.validate()?;
        let columns = config.property_count();
        let buckets = (0..node_count)
            .map(|_| Bucket {
                targets: Vec::new(),
                properties: (0..columns).map(|_| Vec::new()).collect(),
            })
            .collect();
        Ok(Self {
            aggregations: config.adjacency.resolved_aggregations(),
            config,
            buckets,
            edge_count: 0,
            terminated: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Uses `flag` to abandon the build; raising it makes
    /// [`build`](Self::build) stop before its next partition.
    #[must_use]
    pub fn with_termination_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.terminated = flag;
        self
    }

    /// Returns the termination flag.
    #[must_use]
    pub fn termination_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminated)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of raw edges added so far.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Adds one edge with one value per configured property column.
    ///
    /// `Count` columns store every edge as `1.0`, whatever the value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] for a source out of range,
    /// [`Error::InvalidTopology`] for a target out of range, and
    /// [`Error::Configuration`] for a wrong number of properties.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, properties: &[f64]) -> Result<()> {
        let node_count = self.buckets.len() as u64;
        if source.as_u64() >= node_count {
            return Err(Error::InvalidNode {
                node: source.as_u64(),
                node_count,
            });
        }
        if target.as_u64() >= node_count {
            return Err(Error::InvalidTopology {
                node: source.as_u64(),
                target: target.as_u64(),
                node_count,
            });
        }
        if properties.len() != self.config.property_count() {
            return Err(Error::configuration(format!(
                "edge has {} properties, expected {}",
                properties.len(),
                self.config.property_count()
            )));
        }

        let bucket = &mut self.buckets[source.index()];
        bucket.targets.push(target.as_u64());
        for ((column, &value), aggregation) in bucket
            .properties
            .iter_mut()
            .zip(properties)
            .zip(&self.aggregations)
        {
            column.push(aggregation.normalize(value));
        }
        self.edge_count += 1;
        Ok(())
    }

    /// Adds every `(source, target, properties)` edge.
    ///
    /// # Errors
    ///
    /// Stops at the first edge [`add_edge`](Self::add_edge) rejects.
    pub fn add_edges<I, P>(&mut self, edges: I) -> Result<()>
    where
        I: IntoIterator<Item = (NodeId, NodeId, P)>,
        P: AsRef<[f64]>,
    {
        for (source, target, properties) in edges {
            self.add_edge(source, target, properties.as_ref())?;
        }
        Ok(())
    }

    /// Compresses every node in parallel and freezes the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if the termination flag was raised,
    /// or any error of the compressor.
    pub fn build(self) -> Result<CompressedGraph> {
        let Self {
            config,
            mut buckets,
            edge_count,
            terminated,
            ..
        } = self;
        let start = Instant::now();
        let node_count = buckets.len();
        let factory = AdjacencyCompressorFactory::new(node_count, config.adjacency.clone())?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .thread_name(|i| format!("packgraph-build-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("failed to start worker pool: {e}")))?;

        let partition_size = config.partition_size;
        pool.install(|| {
            buckets
                .par_chunks_mut(partition_size)
                .enumerate()
                .try_for_each(|(partition, chunk)| {
                    if terminated.load(Ordering::Relaxed) {
                        return Err(Error::Terminated);
                    }
                    let first = partition * partition_size;
                    let mut compressor = factory.compressor();
                    for (offset, bucket) in chunk.iter_mut().enumerate() {
                        let node = NodeId::from(first + offset);
                        let Bucket {
                            targets,
                            properties,
                        } = std::mem::take(bucket);
                        if properties.is_empty() {
                            compressor.compress(node, &targets)?;
                        } else {
                            compressor.compress_with_properties(node, &targets, &properties[..])?;
                        }
                    }
                    Ok(())
                })
        })
        .inspect_err(|e| {
            if matches!(e, Error::Terminated) {
                tracing::warn!(node_count, "graph build terminated");
            }
        })?;

        let lists = factory.build();
        let graph = CompressedGraph::new(lists, config);
        tracing::info!(
            node_count,
            edge_count,
            relationship_count = graph.relationship_count(),
            bytes = graph.memory_info().total_bytes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "graph build finished"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packgraph_core::PackingStrategy;
    use proptest::prelude::*;

    fn n(id: u64) -> NodeId {
        NodeId::new(id)
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut builder =
            GraphBuilder::new(3, Config::default().with_properties(&[Aggregation::Sum])).unwrap();
        assert!(matches!(
            builder.add_edge(n(3), n(0), &[1.0]),
            Err(Error::InvalidNode { .. })
        ));
        assert!(matches!(
            builder.add_edge(n(0), n(3), &[1.0]),
            Err(Error::InvalidTopology { .. })
        ));
        assert!(matches!(
            builder.add_edge(n(0), n(1), &[]),
            Err(Error::Configuration(_))
        ));
        assert_eq!(builder.edge_count(), 0);
    }

    #[test]
    fn test_count_normalizes_weights() {
        let config = Config::default().with_properties(&[Aggregation::Count]);
        let mut builder = GraphBuilder::new(2, config).unwrap();
        builder.add_edge(n(0), n(1), &[5.0]).unwrap();
        builder.add_edge(n(0), n(1), &[7.5]).unwrap();
        let graph = builder.build().unwrap();

        let weights: Vec<f64> = graph.property_cursor(0, n(0)).unwrap().collect();
        assert_eq!(weights, vec![2.0]);
    }

    #[test]
    fn test_small_partitions() {
        let config = Config::default()
            .with_packing(PackingStrategy::BlockAlignedPacked)
            .with_partition_size(3)
            .with_concurrency(3);
        let mut builder = GraphBuilder::new(10, config).unwrap();
        for source in 0..10 {
            for target in 0..source {
                builder.add_edge(n(source), n(target), &[]).unwrap();
            }
        }
        let graph = builder.build().unwrap();
        assert_eq!(graph.relationship_count(), 45);
        for source in 0..10 {
            assert_eq!(graph.degree(n(source)), source as usize);
            assert_eq!(
                graph.neighbors(n(source)).collect::<Vec<_>>(),
                (0..source).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_terminated_before_start() {
        let builder = GraphBuilder::new(100, Config::default()).unwrap();
        builder.termination_flag().store(true, Ordering::Relaxed);
        assert!(matches!(builder.build(), Err(Error::Terminated)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_single_matches_deduplicated_reference(
            edges in proptest::collection::vec((0u64..40, 0u64..40), 0..300),
            partition_size in 1usize..16,
        ) {
            let mut expected = vec![Vec::new(); 40];
            for &(source, target) in &edges {
                expected[source as usize].push(target);
            }
            for targets in &mut expected {
                targets.sort_unstable();
                targets.dedup();
            }

            for packing in PackingStrategy::ALL {
                let config = Config::default()
                    .with_packing(packing)
                    .with_aggregation(Aggregation::Single)
                    .with_concurrency(2)
                    .with_partition_size(partition_size);
                let mut builder = GraphBuilder::new(40, config).unwrap();
                builder
                    .add_edges(edges.iter().map(|&(s, t)| (n(s), n(t), [0.0; 0])))
                    .unwrap();
                let graph = builder.build().unwrap();
                for (source, want) in expected.iter().enumerate() {
                    prop_assert_eq!(&graph.neighbors(NodeId::from(source)).collect::<Vec<_>>(), want);
                }
            }
        }
    }
}
