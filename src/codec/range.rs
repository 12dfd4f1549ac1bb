//! Binary range decoder/encoder and bit-tree coders
//!
//! Integer-only arithmetic coding: a normalized `(code, range)` pair is
//! refilled byte-wise whenever `range` drops below the renormalization
//! threshold, and every binary decision updates its probability state
//! multiplicatively toward the observed outcome.

use crate::core::{Error, Result};

use super::{init_bit_models, BIT_MODEL_TOTAL_BITS, MOVE_BITS, TOP_VALUE};

/// Byte-wise input for the range decoder.
///
/// Running out of input mid-stream means the stream is corrupt; the whole
/// container must then be discarded.
pub trait ByteRead {
    fn read_byte(&mut self) -> Result<u8>;
}

impl ByteRead for &[u8] {
    fn read_byte(&mut self) -> Result<u8> {
        match self.split_first() {
            Some((&b, rest)) => {
                *self = rest;
                Ok(b)
            }
            None => Err(Error::Decompression("unexpected end of stream".into())),
        }
    }
}

/// Adaptive binary range decoder
#[derive(Debug, Default)]
pub struct RangeDecoder {
    code: u32,
    range: u32,
}

impl RangeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the decoder: 5 stream bytes into `code`, full `range`.
    pub fn init<R: ByteRead>(&mut self, stream: &mut R) -> Result<()> {
        self.code = 0;
        self.range = u32::MAX;
        for _ in 0..5 {
            self.code = (self.code << 8) | u32::from(stream.read_byte()?);
        }
        Ok(())
    }

    fn normalize<R: ByteRead>(&mut self, stream: &mut R) -> Result<()> {
        if self.range < TOP_VALUE {
            self.code = (self.code << 8) | u32::from(stream.read_byte()?);
            self.range <<= 8;
        }
        Ok(())
    }

    /// Decode one bit against the adaptive model at `probs[index]`.
    pub fn decode_bit<R: ByteRead>(
        &mut self,
        probs: &mut [u16],
        index: usize,
        stream: &mut R,
    ) -> Result<u32> {
        let prob = probs[index];
        let bound = (self.range >> BIT_MODEL_TOTAL_BITS) * u32::from(prob);

        if self.code < bound {
            self.range = bound;
            probs[index] = prob + ((2048 - prob) >> MOVE_BITS);
            self.normalize(stream)?;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            probs[index] = prob - (prob >> MOVE_BITS);
            self.normalize(stream)?;
            Ok(1)
        }
    }

    /// Decode `count` equiprobable bits, MSB first.
    pub fn decode_direct_bits<R: ByteRead>(
        &mut self,
        count: u32,
        stream: &mut R,
    ) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            self.range >>= 1;
            let bit = if self.code >= self.range {
                self.code -= self.range;
                1
            } else {
                0
            };
            result = (result << 1) | bit;
            self.normalize(stream)?;
        }
        Ok(result)
    }
}

/// Sequential binary-decision tree over `2^N` probability states
#[derive(Debug)]
pub struct BitTreeDecoder {
    models: Vec<u16>,
    num_bit_levels: u32,
}

impl BitTreeDecoder {
    pub fn new(num_bit_levels: u32) -> Self {
        Self {
            models: vec![0; 1 << num_bit_levels],
            num_bit_levels,
        }
    }

    pub fn init(&mut self) {
        init_bit_models(&mut self.models);
    }

    /// Decode `N` bits MSB-first.
    pub fn decode<R: ByteRead>(&mut self, rc: &mut RangeDecoder, stream: &mut R) -> Result<u32> {
        let mut m = 1u32;
        for _ in 0..self.num_bit_levels {
            m = (m << 1) | rc.decode_bit(&mut self.models, m as usize, stream)?;
        }
        Ok(m - (1 << self.num_bit_levels))
    }

    /// Decode `N` bits LSB-first.
    pub fn reverse_decode<R: ByteRead>(
        &mut self,
        rc: &mut RangeDecoder,
        stream: &mut R,
    ) -> Result<u32> {
        reverse_decode(&mut self.models, 0, rc, self.num_bit_levels, stream)
    }
}

/// LSB-first bit-tree decode over a shared model slice at `start_index`.
pub fn reverse_decode<R: ByteRead>(
    models: &mut [u16],
    start_index: usize,
    rc: &mut RangeDecoder,
    num_bit_levels: u32,
    stream: &mut R,
) -> Result<u32> {
    let mut m = 1usize;
    let mut symbol = 0u32;
    for i in 0..num_bit_levels {
        let bit = rc.decode_bit(models, start_index + m, stream)?;
        m = (m << 1) | bit as usize;
        symbol |= bit << i;
    }
    Ok(symbol)
}

/// Binary range encoder, the bit-exact inverse of [`RangeDecoder`].
///
/// Only what the tests and fixture tooling need: adaptive bits and direct
/// bits, with the standard 5-byte flush.
#[derive(Debug)]
pub struct RangeEncoder {
    low: u64,
    range: u32,
    cache: u8,
    cache_size: u64,
    out: Vec<u8>,
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            cache: 0,
            cache_size: 1,
            out: Vec::new(),
        }
    }

    fn shift_low(&mut self) {
        if self.low < 0xFF00_0000 || self.low > u64::from(u32::MAX) {
            let carry = (self.low >> 32) as u8;
            self.out.push(self.cache.wrapping_add(carry));
            for _ in 1..self.cache_size {
                self.out.push(0xFFu8.wrapping_add(carry));
            }
            self.cache = (self.low >> 24) as u8;
            self.cache_size = 0;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & u64::from(u32::MAX);
    }

    /// Encode one bit, updating the model exactly as the decoder will.
    pub fn encode_bit(&mut self, probs: &mut [u16], index: usize, bit: u32) {
        let prob = probs[index];
        let bound = (self.range >> BIT_MODEL_TOTAL_BITS) * u32::from(prob);

        if bit == 0 {
            self.range = bound;
            probs[index] = prob + ((2048 - prob) >> MOVE_BITS);
        } else {
            self.low += u64::from(bound);
            self.range -= bound;
            probs[index] = prob - (prob >> MOVE_BITS);
        }
        while self.range < TOP_VALUE {
            self.shift_low();
            self.range <<= 8;
        }
    }

    /// Encode `count` equiprobable bits, MSB first.
    pub fn encode_direct_bits(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.range >>= 1;
            if (value >> i) & 1 != 0 {
                self.low += u64::from(self.range);
            }
            while self.range < TOP_VALUE {
                self.shift_low();
                self.range <<= 8;
            }
        }
    }

    /// Flush the final bytes and return the encoded stream.
    pub fn finish(mut self) -> Vec<u8> {
        for _ in 0..5 {
            self.shift_low();
        }
        self.out
    }
}
