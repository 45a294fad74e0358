//! Build configuration.

use packgraph_common::utils::error::{Error, Result};
use packgraph_core::adjacency::{AdjacencyConfig, PackingStrategy};
use packgraph_core::storage::Aggregation;
use serde::{Deserialize, Serialize};

/// Default number of nodes per construction task.
pub const DEFAULT_PARTITION_SIZE: usize = 10_000;

/// Configuration of one graph build.
///
/// # Examples
///
/// ```
/// use packgraph_engine::Config;
/// use packgraph_core::{Aggregation, PackingStrategy};
///
/// let config = Config::default()
///     .with_packing(PackingStrategy::InlinedHeadPacked)
///     .with_properties(&[Aggregation::Sum])
///     .with_concurrency(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage layout and aggregation settings.
    pub adjacency: AdjacencyConfig,

    /// Worker threads used for construction (default: available cores).
    pub concurrency: usize,

    /// Nodes per construction task (default: 10 000).
    pub partition_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            adjacency: AdjacencyConfig::default(),
            concurrency,
            partition_size: DEFAULT_PARTITION_SIZE,
        }
    }
}

impl Config {
    /// Sets the record format.
    #[must_use]
    pub fn with_packing(mut self, packing: PackingStrategy) -> Self {
        self.adjacency = self.adjacency.with_packing(packing);
        self
    }

    /// Sets the parallel edge policy of a property-free build.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.adjacency = self.adjacency.with_aggregation(aggregation);
        self
    }

    /// Configures property columns, one aggregation each.
    #[must_use]
    pub fn with_properties(mut self, aggregations: &[Aggregation]) -> Self {
        self.adjacency = self.adjacency.with_properties(aggregations);
        self
    }

    /// Sets the page size in bytes.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.adjacency = self.adjacency.with_page_size(page_size);
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the number of nodes per construction task.
    #[must_use]
    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size;
        self
    }

    /// Returns the number of property columns.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.adjacency.property_count
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for zero concurrency or partition
    /// size, or an invalid adjacency configuration.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::configuration("concurrency must be at least 1"));
        }
        if self.partition_size == 0 {
            return Err(Error::configuration("partition size must be at least 1"));
        }
        self.adjacency.validate()
    }
}
