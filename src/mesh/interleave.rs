//! Byte-plane interleaving of typed buffers
//!
//! The entropy coder compresses locally-coherent byte planes much better
//! than interleaved native values, so each chunk stores the bytes of every
//! element's 4-byte representation in separate planes across the whole
//! array, sub-grouped by component. The pointer walk below (start at byte
//! 3, step one stride per byte, fix up on wrap) defines the permutation;
//! both directions must use the identical walk.

/// Scatter a packed byte-plane stream back into little-endian words.
///
/// `packed.len()` must equal `out.len() * 4`; `component_count` is the
/// number of words per logical element (3 for triangle indices, 2 per UV,
/// etc.).
pub fn deinterleave(packed: &[u8], component_count: usize, out: &mut [u32]) {
    debug_assert_eq!(packed.len(), out.len() * 4);
    let len = packed.len();
    let stride = component_count * 4;

    let mut bytes = vec![0u8; len];
    let mut offset = 3usize;
    for &b in packed {
        bytes[offset] = b;
        offset += stride;
        if offset >= len {
            offset -= len - 4;
            if offset >= stride {
                offset -= stride + 1;
            }
        }
    }

    for (i, word) in out.iter_mut().enumerate() {
        *word = u32::from_le_bytes([
            bytes[4 * i],
            bytes[4 * i + 1],
            bytes[4 * i + 2],
            bytes[4 * i + 3],
        ]);
    }
}

/// Gather little-endian words into the packed byte-plane stream.
pub fn interleave(words: &[u32], component_count: usize) -> Vec<u8> {
    let len = words.len() * 4;
    let stride = component_count * 4;

    let mut bytes = vec![0u8; len];
    for (i, word) in words.iter().enumerate() {
        bytes[4 * i..4 * i + 4].copy_from_slice(&word.to_le_bytes());
    }

    let mut out = Vec::with_capacity(len);
    let mut offset = 3usize;
    for _ in 0..len {
        out.push(bytes[offset]);
        offset += stride;
        if offset >= len {
            offset -= len - 4;
            if offset >= stride {
                offset -= stride + 1;
            }
        }
    }
    out
}
