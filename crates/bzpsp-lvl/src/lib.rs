//! Decoder for Battlezone PSP .LVL mission packages (BZPK)
//!
//! # Format Overview
//!
//! - Bytes 0-3: "BZPK" magic
//! - Bytes 4-7: Declared total size
//! - Bytes 8-11: Unknown / reserved
//! - Bytes 12-15: Declared object count
//! - Bytes 16+: Records, each `<u32 size><u32 id><payload>`, with optional
//!   zero words of padding between siblings
//!
//! There is no schema. A top-level record either holds a nested record
//! sequence (see [`container`]) or an opaque payload that is classified by
//! shape (see [`payload`]).
//!
//! Pipeline: header → [`chunk::scan`] → [`container::decode_forest`] →
//! [`package::ObjectSummary`]

pub mod chunk;
pub mod container;
pub mod package;
pub mod payload;

use thiserror::Error;

pub use chunk::{scan, Record, Scan};
pub use container::{decode_forest, Node, NodeBody, RecordId};
pub use package::{ObjectSummary, PackageDocument, PackageFile, PackageSummary, Role};
pub use payload::{classify, DecodedValue, F32Value, Payload};

/// Magic bytes at the start of every package
pub const BZPK_MAGIC: [u8; 4] = *b"BZPK";

/// Fixed package header size; top-level records start here
pub const HEADER_SIZE: usize = 0x10;

/// Size of a record header (`size` + `id`)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Errors from package decoding
#[derive(Error, Debug)]
pub enum LvlError {
    #[error("Invalid package: {0}")]
    Format(String),

    #[error("Invalid entry at 0x{offset:X}: size={size} (boundary 0x{end:X})")]
    Bounds { offset: usize, size: u32, end: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LvlError>;
