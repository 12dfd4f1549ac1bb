//! Adaptive binary range coding and LZMA-style stream decoding
//!
//! The mesh container format compresses its chunks with an adapted LZMA
//! scheme. This module provides the range decoder, the composed bit-tree /
//! length / literal coders, the sliding output window, and the top-level
//! stream decoder. A minimal literal-only compressor is included so valid
//! streams can be produced for tests and fixtures.

pub mod lzma;
pub mod range;
pub mod window;

pub use lzma::{compress, decompress, Decoder};
pub use range::{ByteRead, RangeDecoder, RangeEncoder, BitTreeDecoder};
pub use window::OutWindow;

/// Number of probability states per adaptive bit model
pub const BIT_MODEL_TOTAL_BITS: u32 = 11;

/// Initial probability for every adaptive bit model (p = 0.5)
pub const BIT_MODEL_INIT: u16 = 1024;

/// Adaptation shift for probability updates
pub const MOVE_BITS: u32 = 5;

/// Range renormalization threshold
pub const TOP_VALUE: u32 = 1 << 24;

/// Initialize a probability table to the neutral state
pub fn init_bit_models(probs: &mut [u16]) {
    probs.fill(BIT_MODEL_INIT);
}
