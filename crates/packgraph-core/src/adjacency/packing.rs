//! Record layouts of the four packing strategies.
//!
//! Every layout stores the same logical content, a node's delta sequence
//! whose first entry is absolute, and is read back only by the matching
//! decode path of [`AdjacencyCursor`](super::AdjacencyCursor).
//!
//! ```text
//!  plain:    varlong*
//!  packed:   ( width:u8  bits[8*width] )*  varlong*           full chunks, then tail
//!  aligned:  ( base:u64 offset:u32 width:u8 pad[3] )*  bits*  header, then every chunk
//!  inlined:  varlong{..4}  then the packed layout for the rest
//! ```
//!
//! A chunk is [`BLOCK_SIZE`] deltas. Packed data is always a whole number of
//! little-endian words, so chunk data in the aligned layout stays 8-byte
//! aligned relative to the record start.

use byteorder::{ByteOrder, LittleEndian};
use packgraph_common::memory::{Address, PageAllocator};
use packgraph_common::utils::error::{Error, Result};

use super::config::PackingStrategy;
use crate::storage::{bitpack, varlong};

/// Number of deltas per packed chunk, and the cursor's decode window.
pub const BLOCK_SIZE: usize = 64;

/// Number of leading deltas the inlined layout keeps as var-longs.
pub const INLINED_HEAD: usize = 4;

/// Bytes per chunk header entry in the aligned layout.
pub const HEADER_ENTRY_BYTES: usize = 16;

impl PackingStrategy {
    /// Returns the exact record size for `deltas`.
    #[must_use]
    pub fn encoded_len(self, deltas: &[u64]) -> usize {
        match self {
            Self::PlainVarLong => varlong::encoded_len_all(deltas),
            Self::FixedWidthPacked => packed_len(deltas),
            Self::BlockAlignedPacked => aligned_len(deltas),
            Self::InlinedHeadPacked => {
                let head = deltas.len().min(INLINED_HEAD);
                varlong::encoded_len_all(&deltas[..head]) + packed_len(&deltas[head..])
            }
        }
    }

    /// Writes the record for `deltas` into `out`, returning the bytes written.
    ///
    /// `out` must be zeroed and at least [`encoded_len`](Self::encoded_len)
    /// bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if an aligned record outgrows its 32-bit
    /// chunk offsets.
    pub fn write(self, deltas: &[u64], out: &mut [u8]) -> Result<usize> {
        Ok(match self {
            Self::PlainVarLong => varlong::encode_all(deltas, out),
            Self::FixedWidthPacked => write_packed(deltas, out),
            Self::BlockAlignedPacked => write_aligned(deltas, out)?,
            Self::InlinedHeadPacked => {
                let head = deltas.len().min(INLINED_HEAD);
                let pos = varlong::encode_all(&deltas[..head], out);
                pos + write_packed(&deltas[head..], &mut out[pos..])
            }
        })
    }

    /// Encodes `deltas` into a fresh slice of `allocator` and returns its
    /// address and size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the allocator cannot claim a page.
    pub fn pack(self, deltas: &[u64], allocator: &mut PageAllocator<'_>) -> Result<(Address, usize)> {
        let len = self.encoded_len(deltas);
        let (address, out) = allocator.allocate(len)?;
        let written = self.write(deltas, out)?;
        debug_assert_eq!(written, len, "{self} size mismatch");
        Ok((address, len))
    }
}

fn packed_len(deltas: &[u64]) -> usize {
    let chunks = deltas.chunks_exact(BLOCK_SIZE);
    let tail = varlong::encoded_len_all(chunks.remainder());
    chunks
        .map(|chunk| 1 + bitpack::packed_len(BLOCK_SIZE, bitpack::max_bits(chunk)))
        .sum::<usize>()
        + tail
}

fn write_packed(deltas: &[u64], out: &mut [u8]) -> usize {
    let chunks = deltas.chunks_exact(BLOCK_SIZE);
    let tail = chunks.remainder();
    let mut pos = 0;
    for chunk in chunks {
        let width = bitpack::max_bits(chunk);
        out[pos] = width;
        pos += 1;
        bitpack::pack(chunk, width, &mut out[pos..]);
        pos += bitpack::packed_len(BLOCK_SIZE, width);
    }
    pos + varlong::encode_all(tail, &mut out[pos..])
}

fn aligned_len(deltas: &[u64]) -> usize {
    deltas
        .chunks(BLOCK_SIZE)
        .map(|chunk| HEADER_ENTRY_BYTES + bitpack::packed_len(chunk.len(), bitpack::max_bits(chunk)))
        .sum()
}

fn write_aligned(deltas: &[u64], out: &mut [u8]) -> Result<usize> {
    let mut data = deltas.len().div_ceil(BLOCK_SIZE) * HEADER_ENTRY_BYTES;
    let mut running = 0u64;
    for (index, chunk) in deltas.chunks(BLOCK_SIZE).enumerate() {
        let width = bitpack::max_bits(chunk);
        let offset = u32::try_from(data)
            .map_err(|_| Error::Internal(format!("aligned record exceeds 4 GiB at chunk {index}")))?;

        let entry = &mut out[index * HEADER_ENTRY_BYTES..(index + 1) * HEADER_ENTRY_BYTES];
        LittleEndian::write_u64(&mut entry[0..8], running);
        LittleEndian::write_u32(&mut entry[8..12], offset);
        entry[12] = width;

        bitpack::pack(chunk, width, &mut out[data..]);
        data += bitpack::packed_len(chunk.len(), width);
        running += chunk.iter().sum::<u64>();
    }
    Ok(data)
}

/// One decoded entry of an aligned record's chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkHeader {
    /// Absolute value preceding the chunk's first entry.
    pub base: u64,
    /// Byte offset of the chunk data from the record start.
    pub offset: usize,
    /// Bit width of the chunk.
    pub width: u8,
}

impl ChunkHeader {
    #[inline]
    pub(crate) fn read(record: &[u8], index: usize) -> Self {
        let entry = &record[index * HEADER_ENTRY_BYTES..(index + 1) * HEADER_ENTRY_BYTES];
        Self {
            base: LittleEndian::read_u64(&entry[0..8]),
            offset: LittleEndian::read_u32(&entry[8..12]) as usize,
            width: entry[12],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(n: usize) -> Vec<u64> {
        (0..n as u64).map(|i| if i == 0 { 1_000_000 } else { i % 5 }).collect()
    }

    #[test]
    fn test_encoded_len_matches_write() {
        for strategy in PackingStrategy::ALL {
            for n in [0, 1, 3, 4, 5, 63, 64, 65, 68, 200] {
                let deltas = deltas(n);
                let len = strategy.encoded_len(&deltas);
                let mut out = vec![0u8; len];
                assert_eq!(strategy.write(&deltas, &mut out).unwrap(), len, "{strategy} n={n}");
            }
        }
    }

    #[test]
    fn test_packed_short_list_is_plain() {
        let deltas = deltas(10);
        assert_eq!(
            PackingStrategy::FixedWidthPacked.encoded_len(&deltas),
            PackingStrategy::PlainVarLong.encoded_len(&deltas)
        );
    }

    #[test]
    fn test_packed_chunk_layout() {
        let deltas = vec![3u64; BLOCK_SIZE];
        let mut out = vec![0u8; PackingStrategy::FixedWidthPacked.encoded_len(&deltas)];
        PackingStrategy::FixedWidthPacked.write(&deltas, &mut out).unwrap();
        assert_eq!(out.len(), 1 + 2 * 8);
        assert_eq!(out[0], 2);
    }

    #[test]
    fn test_inlined_head_keeps_large_first_value_out_of_chunks() {
        let deltas = deltas(4 + BLOCK_SIZE);
        let inlined = PackingStrategy::InlinedHeadPacked.encoded_len(&deltas);
        let packed = PackingStrategy::FixedWidthPacked.encoded_len(&deltas);
        assert!(inlined < packed, "inlined {inlined} >= packed {packed}");
    }

    #[test]
    fn test_aligned_header() {
        let deltas: Vec<u64> = (0..130).map(|_| 2).collect();
        let mut out = vec![0u8; PackingStrategy::BlockAlignedPacked.encoded_len(&deltas)];
        PackingStrategy::BlockAlignedPacked.write(&deltas, &mut out).unwrap();

        let first = ChunkHeader::read(&out, 0);
        let second = ChunkHeader::read(&out, 1);
        let third = ChunkHeader::read(&out, 2);
        assert_eq!(first, ChunkHeader { base: 0, offset: 48, width: 2 });
        assert_eq!(second.base, 128);
        assert_eq!(second.offset, 48 + 16);
        assert_eq!(third.base, 256);
        assert_eq!(third.offset % 8, 0);
        assert_eq!(out.len(), third.offset + 8);
    }

    #[test]
    fn test_pack_into_allocator() {
        let arena = packgraph_common::memory::PageArena::with_page_size(1024).unwrap();
        let mut allocator = arena.allocator();
        let deltas = deltas(70);
        let (address, len) = PackingStrategy::InlinedHeadPacked
            .pack(&deltas, &mut allocator)
            .unwrap();
        assert_eq!(address, 0);
        assert_eq!(allocator.allocated_bytes(), len);
    }
}
