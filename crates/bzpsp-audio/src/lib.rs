//! Audio bank unpacking and VAG decoding for Battlezone PSP
//!
//! This module handles:
//! - .bnk directory tables (name, size, offset per embedded file)
//! - Output name sanitization and collision handling
//! - PSX ADPCM ("VAGp") decoding to mono PCM16
//! - WAV encoding of decoded PCM

pub mod bank;
pub mod sound;
pub mod vag;

use thiserror::Error;

pub use bank::{BankDirectory, BankEntry, EntryStatus, NameAllocator};
pub use sound::DecodedSound;
pub use vag::{decode_block, decode_vag, History, VagHeader};

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to decode audio: {0}")]
    Codec(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AudioError>;
