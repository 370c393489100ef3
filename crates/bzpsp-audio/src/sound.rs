//! Decoded PCM audio and WAV encoding
//!
//! VAG streams decode to mono 16-bit PCM. Output: RIFF/WAVE with a single
//! `fmt ` and `data` chunk.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Decoded sound ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSound {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Little-endian sample bytes
    pub pcm_data: Vec<u8>,
}

impl DecodedSound {
    /// Mono PCM16 from decoded samples
    pub fn from_pcm16(samples: &[i16], sample_rate: u32) -> Self {
        let mut pcm_data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            pcm_data.extend_from_slice(&s.to_le_bytes());
        }

        DecodedSound {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
            pcm_data,
        }
    }

    fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn sample_count(&self) -> usize {
        match self.block_align() {
            0 => 0,
            align => self.pcm_data.len() / align as usize,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / f64::from(self.sample_rate)
    }

    /// Encode as a WAV file
    pub fn write_wav<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let byte_rate = self.sample_rate * self.block_align() as u32;
        let data_len = self.pcm_data.len() as u32;
        let file_len = 36 + data_len;

        // RIFF header
        w.write_all(b"RIFF")?;
        w.write_u32::<LittleEndian>(file_len)?;
        w.write_all(b"WAVE")?;

        // fmt chunk
        w.write_all(b"fmt ")?;
        w.write_u32::<LittleEndian>(16)?; // chunk size
        w.write_u16::<LittleEndian>(1)?; // PCM format
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.sample_rate)?;
        w.write_u32::<LittleEndian>(byte_rate)?;
        w.write_u16::<LittleEndian>(self.block_align())?;
        w.write_u16::<LittleEndian>(self.bits_per_sample)?;

        // data chunk
        w.write_all(b"data")?;
        w.write_u32::<LittleEndian>(data_len)?;
        w.write_all(&self.pcm_data)?;

        Ok(())
    }
}
