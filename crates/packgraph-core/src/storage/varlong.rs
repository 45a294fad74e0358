//! Variable-length encoding of non-negative integers.
//!
//! Each byte carries 7 payload bits, least significant group first. The high
//! bit is set on every byte of a value except the last one. Every quantity
//! stored this way (a leading absolute target, then deltas between sorted
//! targets) is non-negative, so no zig-zag step is needed.
//!
//! Encoders write into pre-sized slices: callers compute the exact length
//! with [`encoded_len_all`] and allocate once.

/// Maximum encoded length of a `u64`.
pub const MAX_ENCODED_LEN: usize = 10;

const PAYLOAD_MASK: u8 = 0x7f;
const CONTINUATION: u8 = 0x80;

/// Returns the number of bytes `value` occupies once encoded.
#[inline]
#[must_use]
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Returns the number of bytes all `values` occupy once encoded.
#[must_use]
pub fn encoded_len_all(values: &[u64]) -> usize {
    values.iter().map(|&v| encoded_len(v)).sum()
}

/// Encodes `value` at the start of `out`, returning the bytes written.
///
/// # Panics
///
/// Panics if `out` is shorter than [`encoded_len`]`(value)`.
#[inline]
pub fn encode(mut value: u64, out: &mut [u8]) -> usize {
    let mut i = 0;
    while value >= u64::from(CONTINUATION) {
        out[i] = (value as u8 & PAYLOAD_MASK) | CONTINUATION;
        value >>= 7;
        i += 1;
    }
    out[i] = value as u8;
    i + 1
}

/// Encodes every value back to back, returning the bytes written.
pub fn encode_all(values: &[u64], out: &mut [u8]) -> usize {
    let mut pos = 0;
    for &value in values {
        pos += encode(value, &mut out[pos..]);
    }
    pos
}

/// Decodes one value starting at `*pos` and advances `*pos` past it.
///
/// # Panics
///
/// Panics if the input ends in the middle of a value.
#[inline]
pub fn decode(src: &[u8], pos: &mut usize) -> u64 {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = src[*pos];
        *pos += 1;
        value |= u64::from(byte & PAYLOAD_MASK) << shift;
        if byte & CONTINUATION == 0 {
            return value;
        }
        shift += 7;
        debug_assert!(shift < 64, "varlong longer than {MAX_ENCODED_LEN} bytes");
    }
}

/// Decodes exactly `count` raw values into `out`, returning the bytes consumed.
///
/// Used to re-prime a decode window from an arbitrary record offset.
pub fn decode_raw(src: &[u8], count: usize, out: &mut [u64]) -> usize {
    let mut pos = 0;
    for slot in &mut out[..count] {
        *slot = decode(src, &mut pos);
    }
    pos
}
