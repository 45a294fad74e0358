//! Construction-time configuration of the adjacency store.

use std::fmt;
use std::str::FromStr;

use packgraph_common::memory::pages::DEFAULT_PAGE_SHIFT;
use packgraph_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::storage::Aggregation;

/// The on-page encoding of adjacency records.
///
/// Chosen once per factory; every record of one build uses the same format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingStrategy {
    /// Concatenated var-longs.
    #[default]
    PlainVarLong,
    /// Bit-packed chunks of 64 deltas with a var-long tail.
    FixedWidthPacked,
    /// Bit-packed chunks behind a per-chunk header. No properties.
    BlockAlignedPacked,
    /// A short var-long head followed by fixed-width packed chunks.
    InlinedHeadPacked,
}

impl PackingStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [PackingStrategy; 4] = [
        Self::PlainVarLong,
        Self::FixedWidthPacked,
        Self::BlockAlignedPacked,
        Self::InlinedHeadPacked,
    ];

    /// Returns the short name used on the command line.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlainVarLong => "plain",
            Self::FixedWidthPacked => "packed",
            Self::BlockAlignedPacked => "aligned",
            Self::InlinedHeadPacked => "inlined",
        }
    }

    /// Returns whether records of this format can carry properties.
    #[must_use]
    pub fn supports_properties(&self) -> bool {
        !matches!(self, Self::BlockAlignedPacked)
    }
}

impl fmt::Display for PackingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "varlong" | "plain_var_long" => Ok(Self::PlainVarLong),
            "packed" | "fixed" | "fixed_width_packed" => Ok(Self::FixedWidthPacked),
            "aligned" | "block_aligned_packed" => Ok(Self::BlockAlignedPacked),
            "inlined" | "inlined_head_packed" => Ok(Self::InlinedHeadPacked),
            other => Err(Error::configuration(format!(
                "unknown packing strategy '{other}'"
            ))),
        }
    }
}

/// Configuration of one adjacency build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyConfig {
    /// Record format.
    pub packing: PackingStrategy,
    /// One policy per property column; at most one without properties.
    pub aggregations: SmallVec<[Aggregation; 4]>,
    /// Number of `f64` property columns per edge.
    pub property_count: usize,
    /// Page size in bytes, a power of two.
    pub page_size: usize,
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        Self {
            packing: PackingStrategy::default(),
            aggregations: SmallVec::new(),
            property_count: 0,
            page_size: 1 << DEFAULT_PAGE_SHIFT,
        }
    }
}

impl AdjacencyConfig {
    /// Creates a property-free configuration with the default format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record format.
    #[must_use]
    pub fn with_packing(mut self, packing: PackingStrategy) -> Self {
        self.packing = packing;
        self
    }

    /// Sets the topology policy of a property-free build.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregations = SmallVec::from_slice(&[aggregation]);
        self
    }

    /// Configures property columns, one aggregation each.
    #[must_use]
    pub fn with_properties(mut self, aggregations: &[Aggregation]) -> Self {
        self.aggregations = SmallVec::from_slice(aggregations);
        self.property_count = aggregations.len();
        self
    }

    /// Sets the page size in bytes.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the policy that decides whether duplicate targets collapse.
    #[must_use]
    pub fn topology_aggregation(&self) -> Aggregation {
        self.aggregations.first().copied().unwrap_or_default().resolve()
    }

    /// Returns the policies with [`Aggregation::Default`] resolved.
    #[must_use]
    pub fn resolved_aggregations(&self) -> SmallVec<[Aggregation; 4]> {
        self.aggregations.iter().map(|a| a.resolve()).collect()
    }

    /// Checks the configuration for incompatible settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when block-aligned packing is combined
    /// with properties, when the aggregation count does not match the
    /// property count, or when some columns keep parallel edges and others
    /// merge them.
    pub fn validate(&self) -> Result<()> {
        if self.property_count > 0 && !self.packing.supports_properties() {
            return Err(Error::configuration(format!(
                "{} packing does not support properties",
                self.packing
            )));
        }
        if self.property_count > 0 && self.aggregations.len() != self.property_count {
            return Err(Error::configuration(format!(
                "{} aggregations for {} property columns",
                self.aggregations.len(),
                self.property_count
            )));
        }
        if self.property_count == 0 && self.aggregations.len() > 1 {
            return Err(Error::configuration(
                "more than one aggregation without properties",
            ));
        }
        let resolved = self.resolved_aggregations();
        let keeps = resolved.iter().filter(|a| !a.deduplicates()).count();
        if keeps != 0 && keeps != resolved.len() {
            return Err(Error::configuration(
                "cannot mix NONE with merging aggregations",
            ));
        }
        if !self.page_size.is_power_of_two() {
            return Err(Error::configuration(format!(
                "page size {} is not a power of two",
                self.page_size
            )));
        }
        Ok(())
    }
}
