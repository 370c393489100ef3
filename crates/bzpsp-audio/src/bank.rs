//! Parser for .bnk audio bank directories
//!
//! Layout (little-endian):
//! - Bytes 0-3: entry count N
//! - N entries of 0x48 bytes: 64-byte NUL-padded name, u32 size, u32 offset
//!
//! Offsets are relative to the start of the bank. Entries whose range falls
//! outside the bank are kept but marked invalid.

use std::collections::HashSet;
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

/// Size of one directory entry
pub const ENTRY_SIZE: usize = 0x48;

/// Size of the name field at the start of each entry
pub const NAME_SIZE: usize = 0x40;

/// Fallback for names that sanitize to nothing
pub const UNNAMED: &str = "unnamed";

/// Extension forced onto output names without one
pub const DEFAULT_EXTENSION: &str = ".bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Valid,
    InvalidRange,
}

/// One embedded file described by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankEntry {
    pub index: usize,
    pub name: String,
    pub size: u32,
    pub offset: u32,
    pub status: EntryStatus,
}

impl BankEntry {
    pub fn is_valid(&self) -> bool {
        self.status == EntryStatus::Valid
    }

    pub fn range(&self) -> Option<Range<usize>> {
        if !self.is_valid() {
            return None;
        }
        let start = self.offset as usize;
        Some(start..start + self.size as usize)
    }

    /// Entry bytes, or None for invalid entries
    pub fn payload<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        self.range().and_then(|r| data.get(r))
    }
}

/// Parsed bank directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankDirectory {
    pub entries: Vec<BankEntry>,
}

impl BankDirectory {
    /// Parse the directory table. A table that would overrun the bank
    /// yields an empty directory.
    pub fn parse(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::default();
        }

        let count = LittleEndian::read_u32(&data[0..4]) as usize;
        let table_end = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(4))
            .filter(|&end| end <= data.len());
        if table_end.is_none() {
            tracing::warn!(
                "bank directory claims {} entries but only {} bytes available",
                count,
                data.len()
            );
            return Self::default();
        }

        let entries = (0..count)
            .map(|index| {
                let off = 4 + index * ENTRY_SIZE;
                let raw = &data[off..off + ENTRY_SIZE];
                let size = LittleEndian::read_u32(&raw[NAME_SIZE..NAME_SIZE + 4]);
                let offset = LittleEndian::read_u32(&raw[NAME_SIZE + 4..NAME_SIZE + 8]);

                let name = decode_name(&raw[..NAME_SIZE]);
                let name = if name.is_empty() {
                    format!("entry_{:04}.bin", index)
                } else {
                    name
                };

                let end = offset as u64 + size as u64;
                let status = if size > 0 && end <= data.len() as u64 {
                    EntryStatus::Valid
                } else {
                    EntryStatus::InvalidRange
                };

                BankEntry {
                    index,
                    name,
                    size,
                    offset,
                    status,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_valid()).count()
    }
}

/// NUL-terminated ASCII; non-ASCII bytes are dropped
fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let name: String = raw[..end]
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    name.trim().to_string()
}

/// Reduce a name to `[A-Za-z0-9._-]`, collapsing other runs to `_` and
/// trimming leading/trailing `.` and `_`
pub fn sanitize_name(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out unique output file names within one bank
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitized, extension-bearing name, suffixed `_2`, `_3`, ... when it
    /// collides case-insensitively with an earlier one
    pub fn allocate(&mut self, entry_name: &str) -> String {
        let base = entry_name
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(entry_name);
        let mut safe = sanitize_name(base);
        if !safe.contains('.') {
            safe.push_str(DEFAULT_EXTENSION);
        }

        let (stem, suffix) = match safe.rfind('.') {
            Some(dot) => safe.split_at(dot),
            None => (safe.as_str(), ""),
        };

        let mut out = safe.clone();
        let mut n = 2;
        while self.used.contains(&out.to_lowercase()) {
            out = format!("{}_{}{}", stem, n, suffix);
            n += 1;
        }
        self.used.insert(out.to_lowercase());
        out
    }
}
