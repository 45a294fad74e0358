//! Sorting, delta encoding, and aggregation of one node's targets.
//!
//! The encoder sorts the raw targets, keeps the first one as an absolute
//! value and every later one as the gap to its predecessor. A zero gap is a
//! parallel edge: it is kept when the topology policy is
//! [`Aggregation::None`], otherwise it is folded into the previous slot and
//! each property column is merged with its own policy.
//!
//! Ties between equal targets are broken by the property tuple, so the output
//! depends only on the input multiset and never on arrival order.

use std::cmp::Ordering;

use smallvec::SmallVec;

use super::aggregation::Aggregation;

/// Reusable scratch space for delta encoding.
///
/// One encoder lives in each compressor so that buffers are allocated once
/// per worker rather than once per node.
#[derive(Debug, Default)]
pub struct DeltaEncoder {
    order: Vec<usize>,
    deltas: Vec<u64>,
    columns: SmallVec<[Vec<f64>; 2]>,
    last: u64,
}

impl DeltaEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes targets without properties, returning the aggregated length.
    pub fn encode(&mut self, targets: &[u64], aggregation: Aggregation) -> usize {
        self.columns.clear();
        self.deltas.clear();
        self.deltas.extend_from_slice(targets);
        self.deltas.sort_unstable();

        let dedupe = aggregation.deduplicates();
        let mut kept = 0;
        let mut last = 0u64;
        for i in 0..self.deltas.len() {
            let target = self.deltas[i];
            if i == 0 {
                self.deltas[0] = target;
                kept = 1;
            } else {
                let delta = target - last;
                if delta == 0 && dedupe {
                    continue;
                }
                self.deltas[kept] = delta;
                kept += 1;
            }
            last = target;
        }
        self.deltas.truncate(kept);
        self.last = last;
        kept
    }

    /// Encodes targets with parallel property columns.
    ///
    /// `properties[c][i]` belongs to `targets[i]`; `aggregations[c]` merges
    /// column `c`. The first policy decides whether duplicates collapse.
    pub fn encode_with_properties<P: AsRef<[f64]>>(
        &mut self,
        targets: &[u64],
        properties: &[P],
        aggregations: &[Aggregation],
    ) -> usize {
        debug_assert_eq!(properties.len(), aggregations.len());
        debug_assert!(properties.iter().all(|c| c.as_ref().len() == targets.len()));

        self.order.clear();
        self.order.extend(0..targets.len());
        self.order.sort_unstable_by(|&a, &b| {
            targets[a].cmp(&targets[b]).then_with(|| {
                properties
                    .iter()
                    .map(|column| column.as_ref()[a].total_cmp(&column.as_ref()[b]))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
        });

        self.deltas.clear();
        self.columns.resize_with(properties.len(), Vec::new);
        for column in &mut self.columns {
            column.clear();
        }

        let dedupe = aggregations
            .first()
            .copied()
            .unwrap_or_default()
            .deduplicates();
        let mut last = 0u64;
        for (i, &idx) in self.order.iter().enumerate() {
            let target = targets[idx];
            let delta = if i == 0 { target } else { target - last };
            if i > 0 && delta == 0 && dedupe {
                for (c, column) in self.columns.iter_mut().enumerate() {
                    if let Some(slot) = column.last_mut() {
                        *slot = aggregations[c].merge(*slot, properties[c].as_ref()[idx]);
                    }
                }
                continue;
            }
            self.deltas.push(delta);
            for (c, column) in self.columns.iter_mut().enumerate() {
                column.push(properties[c].as_ref()[idx]);
            }
            last = target;
        }
        self.last = last;
        self.deltas.len()
    }

    /// Returns the encoded deltas; the first entry is absolute.
    #[must_use]
    pub fn deltas(&self) -> &[u64] {
        &self.deltas
    }

    /// Returns the aggregated values of property column `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Returns the number of property columns of the last encode.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the number of encoded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Returns `true` if the last encode produced no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Returns the largest target of the last encode.
    #[must_use]
    pub fn max_target(&self) -> Option<u64> {
        (!self.deltas.is_empty()).then_some(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prefix_sums(deltas: &[u64]) -> Vec<u64> {
        deltas
            .iter()
            .scan(0u64, |running, &delta| {
                *running += delta;
                Some(*running)
            })
            .collect()
    }

    #[test]
    fn test_sorts_and_deltas() {
        let mut encoder = DeltaEncoder::new();
        let len = encoder.encode(&[9, 2, 5, 3], Aggregation::None);
        assert_eq!(len, 4);
        assert_eq!(encoder.deltas(), &[2, 1, 2, 4]);
        assert_eq!(encoder.max_target(), Some(9));
    }

    #[test]
    fn test_none_keeps_duplicates() {
        let mut encoder = DeltaEncoder::new();
        encoder.encode(&[3, 1, 3, 0, 7], Aggregation::None);
        assert_eq!(encoder.deltas(), &[0, 1, 2, 0, 4]);
        assert_eq!(prefix_sums(encoder.deltas()), vec![0, 1, 3, 3, 7]);
    }

    #[test]
    fn test_single_collapses_duplicates() {
        let mut encoder = DeltaEncoder::new();
        encoder.encode(&[3, 1, 3, 3, 7], Aggregation::Single);
        assert_eq!(prefix_sums(encoder.deltas()), vec![1, 3, 7]);
    }

    #[test]
    fn test_single_keeps_smallest_properties() {
        let mut encoder = DeltaEncoder::new();
        let targets = [2, 2, 2, 0];
        let weights = vec![5.0, -1.0, 3.0, 8.0];
        let ranks = vec![0.0, 9.0, 1.0, 0.0];
        encoder.encode_with_properties(
            &targets,
            &[weights, ranks],
            &[Aggregation::Single, Aggregation::Single],
        );

        assert_eq!(prefix_sums(encoder.deltas()), vec![0, 2]);
        assert_eq!(encoder.column(0), &[8.0, -1.0]);
        assert_eq!(encoder.column(1), &[0.0, 9.0]);
    }

    #[test]
    fn test_empty_input() {
        let mut encoder = DeltaEncoder::new();
        assert_eq!(encoder.encode(&[], Aggregation::Single), 0);
        assert!(encoder.is_empty());
        assert_eq!(encoder.max_target(), None);
    }

    #[test]
    fn test_properties_follow_targets() {
        let mut encoder = DeltaEncoder::new();
        let targets = [4, 1, 4, 2];
        let weights = vec![1.0, 2.0, 3.0, 4.0];
        let ranks = vec![10.0, 20.0, 30.0, 40.0];
        encoder.encode_with_properties(
            &targets,
            &[weights, ranks],
            &[Aggregation::Sum, Aggregation::Max],
        );

        assert_eq!(prefix_sums(encoder.deltas()), vec![1, 2, 4]);
        assert_eq!(encoder.column(0), &[2.0, 4.0, 4.0]);
        assert_eq!(encoder.column(1), &[20.0, 40.0, 30.0]);
    }

    #[test]
    fn test_parallel_edges_under_each_policy() {
        let mut encoder = DeltaEncoder::new();
        let targets = [5, 5];
        let weights = [&[1.0, 2.0][..]];

        encoder.encode_with_properties(&targets, &weights, &[Aggregation::Sum]);
        assert_eq!(encoder.len(), 1);
        assert_eq!(encoder.column(0), &[3.0]);

        encoder.encode_with_properties(&targets, &weights, &[Aggregation::Min]);
        assert_eq!(encoder.column(0), &[1.0]);

        encoder.encode_with_properties(&targets, &weights, &[Aggregation::None]);
        assert_eq!(encoder.deltas(), &[5, 0]);
        assert_eq!(encoder.column(0), &[1.0, 2.0]);
    }

    proptest! {
        #[test]
        fn prop_order_independent(
            mut edges in proptest::collection::vec((0u64..50, -5i32..5), 0..100),
            seed in any::<u64>(),
        ) {
            let mut encoder = DeltaEncoder::new();
            let split = |edges: &[(u64, i32)]| -> (Vec<u64>, Vec<f64>) {
                (edges.iter().map(|e| e.0).collect(), edges.iter().map(|e| f64::from(e.1)).collect())
            };

            let (targets, weights) = split(&edges);
            encoder.encode_with_properties(&targets, &[weights], &[Aggregation::None]);
            let first = (encoder.deltas().to_vec(), encoder.column(0).to_vec());

            let len = edges.len().max(1);
            edges.rotate_left((seed as usize) % len);
            edges.reverse();
            let (targets, weights) = split(&edges);
            encoder.encode_with_properties(&targets, &[weights], &[Aggregation::None]);
            prop_assert_eq!(first.0, encoder.deltas().to_vec());
            prop_assert_eq!(first.1, encoder.column(0).to_vec());
        }

        #[test]
        fn prop_aggregation_never_grows(targets in proptest::collection::vec(0u64..30, 0..100)) {
            let mut encoder = DeltaEncoder::new();
            let len = encoder.encode(&targets, Aggregation::Single);
            prop_assert!(len <= targets.len());

            let mut expected = targets.clone();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(prefix_sums(encoder.deltas()), expected);
        }
    }
}
