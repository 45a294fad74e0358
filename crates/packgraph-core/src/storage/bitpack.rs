//! Fixed-width bit packing.
//!
//! Values are packed least significant bit first into little-endian 64-bit
//! words, so a run of `n` values at width `w` always occupies a whole number
//! of words: [`packed_len`]`(n, w)` bytes. A full block of 64 values at width
//! `w` is exactly `8 * w` bytes.

use byteorder::{ByteOrder, LittleEndian};

const WORD_BYTES: usize = 8;

/// Returns the bit width needed to represent `value`. Zero needs zero bits.
#[inline]
#[must_use]
pub fn bits_needed(value: u64) -> u8 {
    (64 - value.leading_zeros()) as u8
}

/// Returns the bit width needed for the largest of `values`.
#[inline]
#[must_use]
pub fn max_bits(values: &[u64]) -> u8 {
    bits_needed(values.iter().fold(0, |acc, &v| acc | v))
}

/// Returns the number of bytes `count` values occupy at width `bits`.
#[inline]
#[must_use]
pub fn packed_len(count: usize, bits: u8) -> usize {
    (count * bits as usize).div_ceil(64) * WORD_BYTES
}

/// Packs `values` at width `bits` into the start of `out`.
///
/// # Panics
///
/// Panics if `out` is shorter than [`packed_len`]`(values.len(), bits)`.
pub fn pack(values: &[u64], bits: u8, out: &mut [u8]) {
    if bits == 0 {
        return;
    }
    let bits = u32::from(bits);
    let mut word = 0u64;
    let mut filled = 0u32;
    let mut pos = 0;
    for &value in values {
        debug_assert!(bits == 64 || value >> bits == 0, "{value} wider than {bits} bits");
        word |= value << filled;
        let used = filled + bits;
        if used >= 64 {
            LittleEndian::write_u64(&mut out[pos..pos + WORD_BYTES], word);
            pos += WORD_BYTES;
            word = if used > 64 { value >> (64 - filled) } else { 0 };
            filled = used - 64;
        } else {
            filled = used;
        }
    }
    if filled > 0 {
        LittleEndian::write_u64(&mut out[pos..pos + WORD_BYTES], word);
    }
}

/// Unpacks `count` values of width `bits` from `src` into `out`.
pub fn unpack(src: &[u8], bits: u8, count: usize, out: &mut [u64]) {
    if bits == 0 {
        out[..count].fill(0);
        return;
    }
    let width = bits as usize;
    let mask = if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    let mut bit = 0usize;
    for slot in &mut out[..count] {
        let word = bit / 64;
        let shift = bit % 64;
        let low = LittleEndian::read_u64(&src[word * WORD_BYTES..]) >> shift;
        let value = if shift + width > 64 {
            low | (LittleEndian::read_u64(&src[(word + 1) * WORD_BYTES..]) << (64 - shift))
        } else {
            low
        };
        *slot = value & mask;
        bit += width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bits_needed() {
        assert_eq!(bits_needed(0), 0);
        assert_eq!(bits_needed(1), 1);
        assert_eq!(bits_needed(255), 8);
        assert_eq!(bits_needed(256), 9);
        assert_eq!(bits_needed(u64::MAX), 64);
        assert_eq!(max_bits(&[1, 4, 2]), 3);
        assert_eq!(max_bits(&[]), 0);
    }

    #[test]
    fn test_full_block_is_width_words() {
        assert_eq!(packed_len(64, 0), 0);
        assert_eq!(packed_len(64, 1), 8);
        assert_eq!(packed_len(64, 13), 13 * 8);
        assert_eq!(packed_len(64, 64), 512);
        assert_eq!(packed_len(3, 5), 8);
    }

    #[test]
    fn test_pack_straddles_words() {
        let values: Vec<u64> = (0..64).map(|i| (i * 37) % 128).collect();
        let mut buf = vec![0u8; packed_len(64, 7)];
        pack(&values, 7, &mut buf);

        let mut out = vec![0u64; 64];
        unpack(&buf, 7, 64, &mut out);
        assert_eq!(out, values);
    }

    #[test]
    fn test_zero_width_needs_no_bytes() {
        let values = [0u64; 10];
        pack(&values, 0, &mut []);
        let mut out = [9u64; 10];
        unpack(&[], 0, 10, &mut out);
        assert_eq!(out, [0; 10]);
    }

    #[test]
    fn test_full_width() {
        let values = [u64::MAX, 0, 1 << 63, 12345];
        let mut buf = vec![0u8; packed_len(4, 64)];
        pack(&values, 64, &mut buf);
        let mut out = [0u64; 4];
        unpack(&buf, 64, 4, &mut out);
        assert_eq!(out, values);
    }

    proptest! {
        #[test]
        fn prop_unpack_inverts_pack(values in proptest::collection::vec(any::<u64>(), 0..150), width in 0u8..=64) {
            let values: Vec<u64> = if width == 64 {
                values
            } else {
                values.into_iter().map(|v| v & ((1u64 << width) - 1)).collect()
            };
            let mut buf = vec![0u8; packed_len(values.len(), width)];
            pack(&values, width, &mut buf);
            let mut out = vec![0u64; values.len()];
            unpack(&buf, width, values.len(), &mut out);
            prop_assert_eq!(out, values);
        }
    }
}
