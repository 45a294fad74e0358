//! Decoding cursor over one node's adjacency record.
//!
//! All four record layouts share one decode engine: a window of up to
//! [`BLOCK_SIZE`] absolute values that is refilled only when it runs dry.
//! Refilling decodes one chunk (or the var-long head or tail) and prefix-sums
//! it onto the last value of the previous window, so each step is amortised
//! O(1). Aligned records additionally let seeks jump over whole chunks using
//! the per-chunk base values in their header.
//!
//! ```text
//!  Uninitialized --init(degree > 0)--> Positioned --last value--> Exhausted
//!        \________init(degree == 0)___________________________/
//! ```

use packgraph_common::memory::{Address, PageTable};

use super::config::PackingStrategy;
use super::packing::{BLOCK_SIZE, ChunkHeader, INLINED_HEAD};
use crate::storage::{bitpack, varlong};

/// A stateful, single-threaded reader over one node's sorted targets.
///
/// Seek operations consume the value they return. Fork an independent
/// reader with [`shallow_copy`](Self::shallow_copy) or [`Clone`]; both share
/// page memory.
#[derive(Clone)]
pub struct AdjacencyCursor<'a> {
    pages: &'a PageTable,
    format: PackingStrategy,
    record: &'a [u8],
    degree: usize,
    /// Number of values decoded into windows so far.
    decoded: usize,
    /// Read position inside the current record.
    byte_pos: usize,
    /// Last decoded absolute value, the base of the next window.
    last: u64,
    window: [u64; BLOCK_SIZE],
    window_len: usize,
    window_pos: usize,
}

impl<'a> AdjacencyCursor<'a> {
    /// Creates an unbound cursor over `pages`. It is exhausted until
    /// [`init`](Self::init) binds it to a record.
    #[must_use]
    pub fn new(pages: &'a PageTable, format: PackingStrategy) -> Self {
        Self {
            pages,
            format,
            record: &[],
            degree: 0,
            decoded: 0,
            byte_pos: 0,
            last: 0,
            window: [0; BLOCK_SIZE],
            window_len: 0,
            window_pos: 0,
        }
    }

    /// Binds the cursor to the record at `address` holding `degree` values.
    pub fn init(&mut self, address: Address, degree: usize) {
        self.record = if degree == 0 {
            &[]
        } else {
            self.pages.slice(address)
        };
        self.degree = degree;
        self.decoded = 0;
        self.byte_pos = 0;
        self.last = 0;
        self.window_len = 0;
        self.window_pos = 0;
    }

    /// Returns the total number of values in the record.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.degree
    }

    /// Returns the number of values not yet consumed.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.degree - self.consumed()
    }

    /// Returns `true` while values remain.
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.consumed() < self.degree
    }

    /// Returns the next value and advances past it.
    ///
    /// Calling this on an exhausted cursor is a contract violation; use the
    /// [`Iterator`] impl for a checked variant.
    #[inline]
    pub fn next_value(&mut self) -> u64 {
        debug_assert!(self.has_next(), "next_value on exhausted cursor");
        if self.window_pos == self.window_len {
            self.fill();
        }
        let value = self.window[self.window_pos];
        self.window_pos += 1;
        value
    }

    /// Returns the value the next call to [`next_value`](Self::next_value)
    /// would return, without advancing.
    #[inline]
    pub fn peek(&mut self) -> Option<u64> {
        if !self.has_next() {
            return None;
        }
        if self.window_pos == self.window_len {
            self.fill();
        }
        Some(self.window[self.window_pos])
    }

    /// Consumes values up to and including the first one greater than
    /// `target` and returns it, or `None` if the record runs out first.
    pub fn skip_until(&mut self, target: u64) -> Option<u64> {
        self.seek(|value| value > target)
    }

    /// Consumes values up to and including the first one not less than
    /// `target` and returns it, or `None` if the record runs out first.
    pub fn advance(&mut self, target: u64) -> Option<u64> {
        self.seek(|value| value >= target)
    }

    /// Skips exactly `n` values and consumes and returns the one after them.
    ///
    /// Returns `None` and leaves the cursor exhausted if `n >= remaining()`.
    pub fn advance_by(&mut self, n: usize) -> Option<u64> {
        if n >= self.remaining() {
            self.exhaust();
            return None;
        }
        let index = self.consumed() + n;
        if index >= self.decoded {
            if self.format == PackingStrategy::BlockAlignedPacked {
                self.jump_to_chunk(index / BLOCK_SIZE);
            }
            while self.decoded <= index {
                self.fill();
            }
        }
        self.window_pos = index - (self.decoded - self.window_len);
        Some(self.next_value())
    }

    /// Makes `dest` an independent cursor positioned exactly like `self`.
    pub fn shallow_copy(&self, dest: &mut Self) {
        dest.clone_from(self);
    }

    #[inline]
    fn consumed(&self) -> usize {
        self.decoded - self.window_len + self.window_pos
    }

    fn exhaust(&mut self) {
        self.decoded = self.degree;
        self.window_len = 0;
        self.window_pos = 0;
    }

    fn seek(&mut self, mut found: impl FnMut(u64) -> bool) -> Option<u64> {
        while self.has_next() {
            if self.window_pos == self.window_len {
                if self.format == PackingStrategy::BlockAlignedPacked {
                    self.skip_chunks_before(&mut found);
                }
                self.fill();
            }
            let value = self.window[self.window_pos];
            self.window_pos += 1;
            if found(value) {
                return Some(value);
            }
        }
        None
    }

    /// Jumps over aligned chunks whose values all fail `found`.
    ///
    /// Chunk `k` holds values no greater than the base of chunk `k + 1`, so
    /// if that base fails the predicate the whole chunk does too.
    fn skip_chunks_before(&mut self, found: &mut impl FnMut(u64) -> bool) {
        let chunks = self.degree.div_ceil(BLOCK_SIZE);
        let mut chunk = self.decoded / BLOCK_SIZE;
        while chunk + 1 < chunks {
            let next = ChunkHeader::read(self.record, chunk + 1);
            if found(next.base) {
                break;
            }
            chunk += 1;
        }
        self.jump_to_chunk(chunk);
    }

    fn jump_to_chunk(&mut self, chunk: usize) {
        let start = chunk * BLOCK_SIZE;
        if start == self.decoded {
            return;
        }
        self.decoded = start;
        self.last = ChunkHeader::read(self.record, chunk).base;
        self.window_len = 0;
        self.window_pos = 0;
    }

    /// Decodes the next window. Requires `decoded < degree`.
    fn fill(&mut self) {
        let undecoded = self.degree - self.decoded;
        debug_assert!(undecoded > 0, "fill past end of record");
        let count = match self.format {
            PackingStrategy::PlainVarLong => self.fill_varlong(undecoded.min(BLOCK_SIZE)),
            PackingStrategy::FixedWidthPacked => self.fill_packed_or_tail(undecoded),
            PackingStrategy::InlinedHeadPacked if self.decoded == 0 => {
                self.fill_varlong(undecoded.min(INLINED_HEAD))
            }
            PackingStrategy::InlinedHeadPacked => self.fill_packed_or_tail(undecoded),
            PackingStrategy::BlockAlignedPacked => self.fill_aligned(undecoded.min(BLOCK_SIZE)),
        };
        self.decoded += count;
        self.last = self.window[count - 1];
        self.window_len = count;
        self.window_pos = 0;
    }

    fn fill_varlong(&mut self, count: usize) -> usize {
        self.byte_pos += varlong::decode_raw(&self.record[self.byte_pos..], count, &mut self.window);
        self.prefix_sum(count, self.last);
        count
    }

    fn fill_packed_or_tail(&mut self, undecoded: usize) -> usize {
        if undecoded < BLOCK_SIZE {
            return self.fill_varlong(undecoded);
        }
        let width = self.record[self.byte_pos];
        let data = &self.record[self.byte_pos + 1..];
        bitpack::unpack(data, width, BLOCK_SIZE, &mut self.window);
        self.byte_pos += 1 + bitpack::packed_len(BLOCK_SIZE, width);
        self.prefix_sum(BLOCK_SIZE, self.last);
        BLOCK_SIZE
    }

    fn fill_aligned(&mut self, count: usize) -> usize {
        let header = ChunkHeader::read(self.record, self.decoded / BLOCK_SIZE);
        bitpack::unpack(&self.record[header.offset..], header.width, count, &mut self.window);
        self.prefix_sum(count, header.base);
        count
    }

    #[inline]
    fn prefix_sum(&mut self, count: usize, base: u64) {
        let mut running = base;
        for slot in &mut self.window[..count] {
            running += *slot;
            *slot = running;
        }
    }
}

impl Iterator for AdjacencyCursor<'_> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        self.has_next().then(|| self.next_value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AdjacencyCursor<'_> {}

impl std::fmt::Debug for AdjacencyCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjacencyCursor")
            .field("format", &self.format)
            .field("degree", &self.degree)
            .field("consumed", &self.consumed())
            .finish_non_exhaustive()
    }
}
