//! Flat scanner for size-prefixed records
//!
//! A record is `<u32 size><u32 id><payload>` (little-endian), where `size`
//! counts the 8-byte header. Runs of zero words between siblings are padding.

use std::ops::Range;

use crate::{LvlError, Result, RECORD_HEADER_SIZE};

/// A record located inside a byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Offset of the record header
    pub offset: usize,
    /// Total size including the header
    pub size: u32,
    pub id: u32,
}

impl Record {
    pub fn payload_start(&self) -> usize {
        self.offset + RECORD_HEADER_SIZE
    }

    pub fn payload_end(&self) -> usize {
        self.offset + self.size as usize
    }

    pub fn payload_range(&self) -> Range<usize> {
        self.payload_start()..self.payload_end()
    }

    /// Payload bytes. `data` must be the buffer the record was scanned from.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_range()]
    }
}

/// Result of scanning one byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub records: Vec<Record>,
    /// Cursor after the last record and any trailing zero padding
    pub end: usize,
}

pub(crate) fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Advance `pos` past consecutive zero words that fit before `end`
pub fn skip_zero_words(data: &[u8], mut pos: usize, end: usize) -> usize {
    while pos + 4 <= end && read_u32(data, pos) == 0 {
        pos += 4;
    }
    pos
}

/// Scan the records in `data[start..end]`.
///
/// Fails with [`LvlError::Bounds`] on a record whose size is below the header
/// length or that runs past `end`. Whether that is fatal is up to the caller.
pub fn scan(data: &[u8], start: usize, end: usize) -> Result<Scan> {
    let end = end.min(data.len());
    let mut records = Vec::new();
    let mut pos = start;

    while pos + RECORD_HEADER_SIZE <= end {
        pos = skip_zero_words(data, pos, end);
        if pos + RECORD_HEADER_SIZE > end {
            break;
        }

        let size = read_u32(data, pos);
        let id = read_u32(data, pos + 4);
        let record_end = pos.checked_add(size as usize).filter(|&e| e <= end);

        let record_end = match record_end {
            Some(e) if size as usize >= RECORD_HEADER_SIZE => e,
            _ => return Err(LvlError::Bounds { offset: pos, size, end }),
        };

        tracing::trace!("record at 0x{:X}: size={} id=0x{:08X}", pos, size, id);
        records.push(Record { offset: pos, size, id });
        pos = record_end;
    }

    let end = skip_zero_words(data, pos, end);
    Ok(Scan { records, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() + 8) as u32).to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_scan_sequence() {
        let mut data = record(1, b"abcd");
        data.extend(record(2, &[]));
        data.extend(record(3, &[9; 7]));

        let scan = scan(&data, 0, data.len()).unwrap();
        assert_eq!(scan.records.len(), 3);
        assert_eq!(scan.end, data.len());
        assert_eq!(scan.records[0], Record { offset: 0, size: 12, id: 1 });
        assert_eq!(scan.records[1].offset, 12);
        assert_eq!(scan.records[1].payload_range(), 20..20);
        assert_eq!(scan.records[2].payload(&data), &[9; 7]);
    }

    #[test]
    fn test_scan_skips_zero_padding() {
        let mut data = vec![0u8; 8];
        data.extend(record(7, b"xy"));
        data.extend([0u8; 12]);
        data.extend(record(8, b"z"));
        data.extend([0u8; 4]);

        let scan = scan(&data, 0, data.len()).unwrap();
        let ids: Vec<u32> = scan.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 8]);
        assert_eq!(scan.records[0].offset, 8);
        assert_eq!(scan.end, data.len());
    }

    #[test]
    fn test_scan_rejects_small_size() {
        let mut data = vec![0u8; 16];
        data[0] = 5;
        data[4] = 1;
        let err = scan(&data, 0, data.len()).unwrap_err();
        assert!(matches!(err, LvlError::Bounds { offset: 0, size: 5, .. }));
    }

    #[test]
    fn test_scan_rejects_overrun() {
        let mut data = record(1, b"abcd");
        data[0] = 0x40;
        let err = scan(&data, 0, data.len()).unwrap_err();
        assert!(matches!(err, LvlError::Bounds { offset: 0, size: 0x40, .. }));
    }

    #[test]
    fn test_scan_respects_boundary() {
        let mut data = record(1, b"abcd");
        data.extend(record(2, b"efgh"));
        // Boundary cuts the second record's payload short
        let err = scan(&data, 0, 22).unwrap_err();
        assert!(matches!(err, LvlError::Bounds { offset: 12, .. }));
    }

    #[test]
    fn test_scan_huge_size_does_not_overflow() {
        let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0];
        data.extend([0u8; 8]);
        assert!(matches!(
            scan(&data, 0, data.len()),
            Err(LvlError::Bounds { size: u32::MAX, .. })
        ));
    }

    #[test]
    fn test_scan_stops_on_short_tail() {
        let mut data = record(1, b"abcd");
        data.extend([1, 2, 3, 4, 5]);
        let scan = scan(&data, 0, data.len()).unwrap();
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.end, 12);
    }

    #[test]
    fn test_scan_empty_range() {
        let data = [0u8; 4];
        let scan = scan(&data, 0, 4).unwrap();
        assert!(scan.records.is_empty());
        assert_eq!(scan.end, 4);
    }
}
