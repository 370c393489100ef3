//! PSX ADPCM ("VAGp") decoder
//!
//! Header (big-endian fields):
//! - 0x00: "VAGp" signature
//! - 0x0C: ADPCM data size
//! - 0x10: sample rate (0 means 22050)
//! - 0x40: ADPCM data
//!
//! The data is a run of 16-byte blocks. Byte 0 holds the predictor (high
//! nibble) and shift (low nibble), byte 1 holds flags, and the remaining 14
//! bytes hold 28 signed 4-bit samples, low nibble first.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};

use crate::sound::DecodedSound;
use crate::{AudioError, Result};

pub const VAG_MAGIC: [u8; 4] = *b"VAGp";

/// Offset of the ADPCM data; also the minimum valid stream length
pub const HEADER_SIZE: usize = 0x40;

pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

pub const BLOCK_SIZE: usize = 16;

pub const SAMPLES_PER_BLOCK: usize = 28;

/// Predictor coefficients, scaled by 64. Indices past the table decode
/// with (0, 0).
const COEFFICIENTS: [(i32, i32); 5] = [(0, 0), (60, 0), (115, -52), (98, -55), (122, -60)];

/// Flag bits that mark the last block of a stream
const END_FLAGS: u8 = 0x01 | 0x04;

pub fn coefficients(predictor: u8) -> (i32, i32) {
    COEFFICIENTS
        .get(predictor as usize)
        .copied()
        .unwrap_or((0, 0))
}

/// The two previous output samples, threaded from block to block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct History {
    pub hist1: i32,
    pub hist2: i32,
}

/// Decode one block, returning its samples and the updated history
pub fn decode_block(
    block: &[u8; BLOCK_SIZE],
    history: History,
) -> ([i16; SAMPLES_PER_BLOCK], History) {
    let predictor = block[0] >> 4;
    let shift = block[0] & 0x0F;
    let (coef1, coef2) = coefficients(predictor);

    let History { mut hist1, mut hist2 } = history;
    let mut samples = [0i16; SAMPLES_PER_BLOCK];

    let nibbles = block[2..].iter().flat_map(|&b| [b & 0x0F, b >> 4]);
    for (out, nibble) in samples.iter_mut().zip(nibbles) {
        // Sign-extend the 4-bit value
        let value = ((nibble as i32) << 28) >> 28;
        let mut sample = (value << 12) >> shift;
        sample += (hist1 * coef1 + hist2 * coef2 + 32) >> 6;
        let sample = sample.clamp(i16::MIN as i32, i16::MAX as i32);

        *out = sample as i16;
        hist2 = hist1;
        hist1 = sample;
    }

    (samples, History { hist1, hist2 })
}

pub fn is_final_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block[1] & END_FLAGS != 0
}

pub fn is_vag(data: &[u8]) -> bool {
    data.starts_with(&VAG_MAGIC)
}

/// Parsed VAG header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VagHeader {
    pub magic: [u8; 4],
    /// Declared ADPCM byte count
    pub data_size: u32,
    pub sample_rate: u32,
}

impl VagHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE || !is_vag(data) {
            return Err(AudioError::Codec("Not a VAGp stream".into()));
        }

        let sample_rate = match BigEndian::read_u32(&data[0x10..0x14]) {
            0 => DEFAULT_SAMPLE_RATE,
            rate => rate,
        };

        Ok(Self {
            magic: VAG_MAGIC,
            data_size: BigEndian::read_u32(&data[0x0C..0x10]),
            sample_rate,
        })
    }

    /// ADPCM bytes, limited by both the declared size and the stream length
    pub fn adpcm_range(&self, stream_len: usize) -> Range<usize> {
        let available = stream_len.saturating_sub(HEADER_SIZE);
        HEADER_SIZE..HEADER_SIZE + available.min(self.data_size as usize)
    }
}

/// Decode a whole VAG stream to mono PCM16.
///
/// Stops after the first block carrying an end flag; a trailing partial
/// block is ignored.
pub fn decode_vag(data: &[u8]) -> Result<DecodedSound> {
    let header = VagHeader::parse(data)?;
    let adpcm = &data[header.adpcm_range(data.len())];

    let mut samples = Vec::with_capacity(adpcm.len() / BLOCK_SIZE * SAMPLES_PER_BLOCK);
    let mut history = History::default();

    for chunk in adpcm.chunks_exact(BLOCK_SIZE) {
        let Ok(block) = <&[u8; BLOCK_SIZE]>::try_from(chunk) else {
            break;
        };
        let (decoded, next) = decode_block(block, history);
        samples.extend_from_slice(&decoded);
        history = next;

        if is_final_block(block) {
            break;
        }
    }

    tracing::trace!("decoded {} samples at {} Hz", samples.len(), header.sample_rate);
    Ok(DecodedSound::from_pcm16(&samples, header.sample_rate))
}
