//! LZMA-style stream decoder
//!
//! Composes the range decoder, bit-tree coders and the sliding window into
//! the full match/literal state machine: literals are context-selected by
//! position and previous byte, matches reuse one of four remembered
//! distances (rep0..rep3) or decode a fresh distance from a position-slot
//! tree plus direct and aligned bits.

use crate::core::{Error, Result};

use super::range::{reverse_decode, BitTreeDecoder, ByteRead, RangeDecoder, RangeEncoder};
use super::window::OutWindow;
use super::init_bit_models;

const NUM_STATES: usize = 12;
const NUM_POS_SLOT_BITS: u32 = 6;
const NUM_ALIGN_BITS: u32 = 4;
const MATCH_MIN_LEN: u32 = 2;
const END_MARKER_DISTANCE: u32 = u32::MAX;

/// Three-tier match length decoder: 0-7 / 8-15 / 16-271
#[derive(Debug)]
struct LenDecoder {
    choice: [u16; 2],
    low_coder: Vec<BitTreeDecoder>,
    mid_coder: Vec<BitTreeDecoder>,
    high_coder: BitTreeDecoder,
}

impl LenDecoder {
    fn new() -> Self {
        Self {
            choice: [0; 2],
            low_coder: Vec::new(),
            mid_coder: Vec::new(),
            high_coder: BitTreeDecoder::new(8),
        }
    }

    fn create(&mut self, num_pos_states: usize) {
        while self.low_coder.len() < num_pos_states {
            self.low_coder.push(BitTreeDecoder::new(3));
            self.mid_coder.push(BitTreeDecoder::new(3));
        }
    }

    fn init(&mut self) {
        init_bit_models(&mut self.choice);
        for coder in &mut self.low_coder {
            coder.init();
        }
        for coder in &mut self.mid_coder {
            coder.init();
        }
        self.high_coder.init();
    }

    fn decode<R: ByteRead>(
        &mut self,
        rc: &mut RangeDecoder,
        pos_state: usize,
        stream: &mut R,
    ) -> Result<u32> {
        if rc.decode_bit(&mut self.choice, 0, stream)? == 0 {
            return self.low_coder[pos_state].decode(rc, stream);
        }
        if rc.decode_bit(&mut self.choice, 1, stream)? == 0 {
            return Ok(8 + self.mid_coder[pos_state].decode(rc, stream)?);
        }
        Ok(16 + self.high_coder.decode(rc, stream)?)
    }
}

/// One literal sub-coder: 0x300 models (normal tree + two match-byte trees)
#[derive(Debug)]
struct LiteralSubCoder {
    probs: Vec<u16>,
}

impl LiteralSubCoder {
    fn new() -> Self {
        Self {
            probs: vec![0; 0x300],
        }
    }

    fn init(&mut self) {
        init_bit_models(&mut self.probs);
    }

    fn decode_normal<R: ByteRead>(
        &mut self,
        rc: &mut RangeDecoder,
        stream: &mut R,
    ) -> Result<u8> {
        let mut symbol = 1usize;
        while symbol < 0x100 {
            symbol = (symbol << 1) | rc.decode_bit(&mut self.probs, symbol, stream)? as usize;
        }
        Ok((symbol & 0xFF) as u8)
    }

    fn decode_with_match_byte<R: ByteRead>(
        &mut self,
        rc: &mut RangeDecoder,
        mut match_byte: u8,
        stream: &mut R,
    ) -> Result<u8> {
        let mut symbol = 1usize;
        while symbol < 0x100 {
            let match_bit = usize::from((match_byte >> 7) & 1);
            match_byte <<= 1;
            let bit =
                rc.decode_bit(&mut self.probs, ((1 + match_bit) << 8) + symbol, stream)? as usize;
            symbol = (symbol << 1) | bit;
            if match_bit != bit {
                while symbol < 0x100 {
                    symbol =
                        (symbol << 1) | rc.decode_bit(&mut self.probs, symbol, stream)? as usize;
                }
                break;
            }
        }
        Ok((symbol & 0xFF) as u8)
    }
}

/// Literal decoder: sub-coders selected by position and previous byte
#[derive(Debug)]
struct LiteralDecoder {
    coders: Vec<LiteralSubCoder>,
    num_prev_bits: u32,
    num_pos_bits: u32,
    pos_mask: usize,
}

impl LiteralDecoder {
    fn new() -> Self {
        Self {
            coders: Vec::new(),
            num_prev_bits: 0,
            num_pos_bits: 0,
            pos_mask: 0,
        }
    }

    fn create(&mut self, num_pos_bits: u32, num_prev_bits: u32) {
        if !self.coders.is_empty()
            && self.num_prev_bits == num_prev_bits
            && self.num_pos_bits == num_pos_bits
        {
            return;
        }
        self.num_pos_bits = num_pos_bits;
        self.pos_mask = (1 << num_pos_bits) - 1;
        self.num_prev_bits = num_prev_bits;
        self.coders = (0..1usize << (num_prev_bits + num_pos_bits))
            .map(|_| LiteralSubCoder::new())
            .collect();
    }

    fn init(&mut self) {
        for coder in &mut self.coders {
            coder.init();
        }
    }

    fn coder_index(&self, pos: u64, prev_byte: u8) -> usize {
        ((pos as usize & self.pos_mask) << self.num_prev_bits)
            + (usize::from(prev_byte) >> (8 - self.num_prev_bits as usize))
    }
}

/// LZMA stream decoder
#[derive(Debug)]
pub struct Decoder {
    out_window: OutWindow,
    range: RangeDecoder,
    is_match: Vec<u16>,
    is_rep: Vec<u16>,
    is_rep_g0: Vec<u16>,
    is_rep_g1: Vec<u16>,
    is_rep_g2: Vec<u16>,
    is_rep0_long: Vec<u16>,
    pos_slot_decoder: Vec<BitTreeDecoder>,
    pos_decoders: Vec<u16>,
    pos_align_decoder: BitTreeDecoder,
    len_decoder: LenDecoder,
    rep_len_decoder: LenDecoder,
    literal_decoder: LiteralDecoder,
    dictionary_size: Option<u32>,
    dictionary_size_check: u32,
    pos_state_mask: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            out_window: OutWindow::new(),
            range: RangeDecoder::new(),
            is_match: vec![0; NUM_STATES << 4],
            is_rep: vec![0; NUM_STATES],
            is_rep_g0: vec![0; NUM_STATES],
            is_rep_g1: vec![0; NUM_STATES],
            is_rep_g2: vec![0; NUM_STATES],
            is_rep0_long: vec![0; NUM_STATES << 4],
            pos_slot_decoder: (0..4).map(|_| BitTreeDecoder::new(NUM_POS_SLOT_BITS)).collect(),
            pos_decoders: vec![0; 114],
            pos_align_decoder: BitTreeDecoder::new(NUM_ALIGN_BITS),
            len_decoder: LenDecoder::new(),
            rep_len_decoder: LenDecoder::new(),
            literal_decoder: LiteralDecoder::new(),
            dictionary_size: None,
            dictionary_size_check: 0,
            pos_state_mask: 0,
        }
    }

    fn set_dictionary_size(&mut self, dictionary_size: u32) {
        if self.dictionary_size != Some(dictionary_size) {
            self.dictionary_size = Some(dictionary_size);
            self.dictionary_size_check = dictionary_size.max(1);
            self.out_window
                .create(self.dictionary_size_check.max(4096) as usize);
        }
    }

    fn set_lc_lp_pb(&mut self, lc: u32, lp: u32, pb: u32) -> Result<()> {
        if lc > 8 || lp > 4 || pb > 4 {
            return Err(Error::Decompression("invalid lc/lp/pb properties".into()));
        }
        let num_pos_states = 1usize << pb;
        self.literal_decoder.create(lp, lc);
        self.len_decoder.create(num_pos_states);
        self.rep_len_decoder.create(num_pos_states);
        self.pos_state_mask = (num_pos_states - 1) as u64;
        Ok(())
    }

    /// Read the 5-byte property header: packed lc/lp/pb, then dictionary size.
    pub fn set_properties<R: ByteRead>(&mut self, stream: &mut R) -> Result<()> {
        let value = u32::from(stream.read_byte()?);
        let lc = value % 9;
        let value = value / 9;
        let lp = value % 5;
        let pb = value / 5;
        self.set_lc_lp_pb(lc, lp, pb)?;

        let mut dictionary_size = 0u32;
        for shift in [0u32, 8, 16, 24] {
            dictionary_size |= u32::from(stream.read_byte()?) << shift;
        }
        self.set_dictionary_size(dictionary_size);
        Ok(())
    }

    fn init_models<R: ByteRead>(&mut self, stream: &mut R) -> Result<()> {
        init_bit_models(&mut self.is_match);
        init_bit_models(&mut self.is_rep0_long);
        init_bit_models(&mut self.is_rep);
        init_bit_models(&mut self.is_rep_g0);
        init_bit_models(&mut self.is_rep_g1);
        init_bit_models(&mut self.is_rep_g2);
        init_bit_models(&mut self.pos_decoders);

        self.literal_decoder.init();
        for decoder in &mut self.pos_slot_decoder {
            decoder.init();
        }
        self.len_decoder.init();
        self.rep_len_decoder.init();
        self.pos_align_decoder.init();
        self.range.init(stream)
    }

    /// Decode until `out_size` bytes are produced, or until the end-marker
    /// distance when `out_size` is `None`.
    pub fn decode<R: ByteRead>(
        &mut self,
        stream: &mut R,
        out_size: Option<usize>,
    ) -> Result<Vec<u8>> {
        self.out_window.reset(out_size.unwrap_or(0));
        self.init_models(stream)?;

        let mut state = 0usize;
        let mut rep0 = 0u32;
        let mut rep1 = 0u32;
        let mut rep2 = 0u32;
        let mut rep3 = 0u32;
        let mut now_pos: u64 = 0;
        let mut prev_byte = 0u8;

        while out_size.is_none_or(|n| now_pos < n as u64) {
            let pos_state = (now_pos & self.pos_state_mask) as usize;

            if self
                .range
                .decode_bit(&mut self.is_match, (state << 4) + pos_state, stream)?
                == 0
            {
                let idx = self.literal_decoder.coder_index(now_pos, prev_byte);
                now_pos += 1;
                let coder = &mut self.literal_decoder.coders[idx];
                prev_byte = if state >= 7 {
                    let match_byte = self.out_window.get_byte(rep0 as usize);
                    coder.decode_with_match_byte(&mut self.range, match_byte, stream)?
                } else {
                    coder.decode_normal(&mut self.range, stream)?
                };
                self.out_window.put_byte(prev_byte);

                state = if state < 4 {
                    0
                } else if state < 10 {
                    state - 3
                } else {
                    state - 6
                };
            } else {
                let len;
                if self.range.decode_bit(&mut self.is_rep, state, stream)? == 1 {
                    let mut rep_len = 0u32;
                    if self.range.decode_bit(&mut self.is_rep_g0, state, stream)? == 0 {
                        if self.range.decode_bit(
                            &mut self.is_rep0_long,
                            (state << 4) + pos_state,
                            stream,
                        )? == 0
                        {
                            state = if state < 7 { 9 } else { 11 };
                            rep_len = 1;
                        }
                    } else {
                        let distance;
                        if self.range.decode_bit(&mut self.is_rep_g1, state, stream)? == 0 {
                            distance = rep1;
                        } else {
                            if self.range.decode_bit(&mut self.is_rep_g2, state, stream)? == 0 {
                                distance = rep2;
                            } else {
                                distance = rep3;
                                rep3 = rep2;
                            }
                            rep2 = rep1;
                        }
                        rep1 = rep0;
                        rep0 = distance;
                    }
                    if rep_len == 0 {
                        rep_len = MATCH_MIN_LEN
                            + self.rep_len_decoder.decode(&mut self.range, pos_state, stream)?;
                        state = if state < 7 { 8 } else { 11 };
                    }
                    len = rep_len;
                } else {
                    rep3 = rep2;
                    rep2 = rep1;
                    rep1 = rep0;

                    len = MATCH_MIN_LEN
                        + self.len_decoder.decode(&mut self.range, pos_state, stream)?;
                    state = if state < 7 { 7 } else { 10 };

                    let slot_index = if len <= 5 { (len - 2) as usize } else { 3 };
                    let pos_slot =
                        self.pos_slot_decoder[slot_index].decode(&mut self.range, stream)?;
                    if pos_slot >= 4 {
                        let num_direct_bits = (pos_slot >> 1) - 1;
                        rep0 = (2 | (pos_slot & 1)) << num_direct_bits;

                        if pos_slot < 14 {
                            let base = (rep0 - pos_slot - 1) as usize;
                            rep0 = rep0.wrapping_add(reverse_decode(
                                &mut self.pos_decoders,
                                base,
                                &mut self.range,
                                num_direct_bits,
                                stream,
                            )?);
                        } else {
                            rep0 = rep0.wrapping_add(
                                self.range.decode_direct_bits(num_direct_bits - 4, stream)? << 4,
                            );
                            rep0 = rep0.wrapping_add(
                                self.pos_align_decoder.reverse_decode(&mut self.range, stream)?,
                            );
                            if rep0 >= 0x8000_0000 {
                                if rep0 == END_MARKER_DISTANCE {
                                    break;
                                }
                                return Err(Error::Decompression(
                                    "invalid match distance".into(),
                                ));
                            }
                        }
                    } else {
                        rep0 = pos_slot;
                    }
                }

                if u64::from(rep0) >= now_pos || rep0 >= self.dictionary_size_check {
                    return Err(Error::Decompression(
                        "match distance exceeds window".into(),
                    ));
                }

                self.out_window.copy_block(rep0 as usize, len as usize);
                now_pos += u64::from(len);
                prev_byte = self.out_window.get_byte(0);
            }
        }

        Ok(self.out_window.take_output())
    }
}

/// Decompress an LZMA stream (5-byte property header + coded data) into
/// exactly `out_size` bytes, or until the end marker when `out_size` is
/// `None`.
pub fn decompress<R: ByteRead>(stream: &mut R, out_size: Option<usize>) -> Result<Vec<u8>> {
    let mut decoder = Decoder::new();
    decoder.set_properties(stream)?;
    decoder.decode(stream, out_size)
}

const COMPRESS_LC: u32 = 3;
const COMPRESS_PB: u32 = 2;
const COMPRESS_DICT_SIZE: u32 = 0x0001_0000;

/// Compress bytes into a valid LZMA stream using literal packets only.
///
/// No match search: every byte is coded as a literal through the adaptive
/// models, so the output is a correct (if not maximally small) stream that
/// [`decompress`] restores exactly. Used by tests and fixture tooling.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let props = (COMPRESS_PB * 5) * 9 + COMPRESS_LC;
    let mut out = vec![props as u8];
    out.extend_from_slice(&COMPRESS_DICT_SIZE.to_le_bytes());

    let mut is_match = vec![0u16; NUM_STATES << 4];
    init_bit_models(&mut is_match);
    let mut literal_probs: Vec<Vec<u16>> = (0..1usize << COMPRESS_LC)
        .map(|_| {
            let mut probs = vec![0u16; 0x300];
            init_bit_models(&mut probs);
            probs
        })
        .collect();

    let pos_state_mask = (1u64 << COMPRESS_PB) - 1;
    let mut enc = RangeEncoder::new();
    let mut prev_byte = 0u8;

    // State stays in the literal band (< 4), so is_match context is state 0
    // and the previous-byte fast path is never selected.
    for (pos, &byte) in data.iter().enumerate() {
        let pos_state = (pos as u64 & pos_state_mask) as usize;
        enc.encode_bit(&mut is_match, pos_state, 0);

        let probs = &mut literal_probs[usize::from(prev_byte) >> (8 - COMPRESS_LC as usize)];
        let mut m = 1usize;
        for i in (0..8).rev() {
            let bit = u32::from((byte >> i) & 1);
            enc.encode_bit(probs, m, bit);
            m = (m << 1) | bit as usize;
        }
        prev_byte = byte;
    }

    out.extend_from_slice(&enc.finish());
    out
}
