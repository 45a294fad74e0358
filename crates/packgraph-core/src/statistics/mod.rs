//! Memory accounting for built adjacency structures.
//!
//! - [`BlockStatistics`]: size distribution of encoded records
//! - [`MemoryInfo`]: page and array footprint of one built structure

use serde::{Deserialize, Serialize};

/// Number of power-of-two buckets; bucket `i` holds values in `[2^(i-1), 2^i)`.
const BUCKETS: usize = 65;

/// Streaming size statistics with a log2 histogram.
///
/// Each compressor keeps its own instance and merges it into the factory
/// when dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatistics {
    /// Number of recorded values.
    pub count: u64,
    /// Smallest recorded value.
    pub min: u64,
    /// Largest recorded value.
    pub max: u64,
    /// Sum of all recorded values.
    pub sum: u64,
    histogram: Vec<u64>,
}

impl Default for BlockStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            min: u64::MAX,
            max: 0,
            sum: 0,
            histogram: vec![0; BUCKETS],
        }
    }
}

impl BlockStatistics {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one value.
    #[inline]
    pub fn record(&mut self, value: u64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.histogram[bucket(value)] += 1;
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        for (mine, theirs) in self.histogram.iter_mut().zip(&other.histogram) {
            *mine += theirs;
        }
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the smallest value, or `None` when empty.
    #[must_use]
    pub fn min(&self) -> Option<u64> {
        (self.count > 0).then_some(self.min)
    }

    /// Returns the mean value, or 0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Returns an upper bound for the `q`-quantile, `q` in `[0, 1]`.
    ///
    /// The bound is the top of the power-of-two bucket holding the quantile,
    /// capped at the observed maximum.
    #[must_use]
    pub fn quantile(&self, q: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let rank = ((q.clamp(0.0, 1.0) * self.count as f64).ceil() as u64).max(1);
        let mut seen = 0;
        for (index, &n) in self.histogram.iter().enumerate() {
            seen += n;
            if seen >= rank {
                return bucket_upper(index).min(self.max);
            }
        }
        self.max
    }

    /// Returns non-empty buckets as `(upper bound, count)`.
    pub fn buckets(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.histogram
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(index, &n)| (bucket_upper(index), n))
    }
}

#[inline]
fn bucket(value: u64) -> usize {
    (64 - value.leading_zeros()) as usize
}

fn bucket_upper(index: usize) -> u64 {
    match index {
        0 => 0,
        64 => u64::MAX,
        i => (1u64 << i) - 1,
    }
}

/// Footprint of one built adjacency structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of stored (post-aggregation) relationships.
    pub relationship_count: u64,
    /// Standard page size in bytes.
    pub page_size: usize,
    /// Number of pages, oversized ones included.
    pub page_count: usize,
    /// Pages larger than the standard page size.
    pub oversized_page_count: usize,
    /// Bytes held in pages.
    pub bytes_in_pages: usize,
    /// Bytes held in per-node degree and offset arrays.
    pub bytes_in_arrays: usize,
    /// Encoded record sizes in bytes.
    pub record_bytes: BlockStatistics,
}

impl MemoryInfo {
    /// Returns the total footprint in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.bytes_in_pages + self.bytes_in_arrays
    }

    /// Returns the average number of bytes per stored relationship.
    #[must_use]
    pub fn bytes_per_relationship(&self) -> f64 {
        if self.relationship_count == 0 {
            0.0
        } else {
            self.bytes_in_pages as f64 / self.relationship_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_mean() {
        let mut stats = BlockStatistics::new();
        assert!(stats.is_empty());
        assert_eq!(stats.min(), None);
        for v in [1, 2, 3, 10] {
            stats.record(v);
        }
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min(), Some(1));
        assert_eq!(stats.max, 10);
        assert_eq!(stats.mean(), 4.0);
    }

    #[test]
    fn test_quantile_bounds() {
        let mut stats = BlockStatistics::new();
        for v in 1..=100 {
            stats.record(v);
        }
        assert_eq!(stats.quantile(0.0), 1);
        assert_eq!(stats.quantile(0.5), 63);
        assert_eq!(stats.quantile(1.0), 100);
        assert_eq!(BlockStatistics::new().quantile(0.5), 0);
    }

    #[test]
    fn test_merge() {
        let mut a = BlockStatistics::new();
        let mut b = BlockStatistics::new();
        a.record(4);
        b.record(0);
        b.record(1000);
        a.merge(&b);
        assert_eq!(a.count, 3);
        assert_eq!(a.min(), Some(0));
        assert_eq!(a.max, 1000);
        assert_eq!(a.buckets().map(|(_, n)| n).sum::<u64>(), 3);

        let empty = BlockStatistics::new();
        a.merge(&empty);
        assert_eq!(a.min(), Some(0));
    }

    #[test]
    fn test_memory_info_totals() {
        let info = MemoryInfo {
            relationship_count: 10,
            bytes_in_pages: 25,
            bytes_in_arrays: 100,
            ..MemoryInfo::default()
        };
        assert_eq!(info.total_bytes(), 125);
        assert_eq!(info.bytes_per_relationship(), 2.5);
    }
}
