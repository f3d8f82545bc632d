//! xdb format constants and the file header.

use crate::ip::IpVersion;
use crate::{Error, Result};

/// Header size in bytes.
pub const HEADER_INFO_LENGTH: usize = 256;

/// Vector index rows (first byte of the address).
pub const VECTOR_INDEX_ROWS: usize = 256;

/// Vector index columns (second byte of the address).
pub const VECTOR_INDEX_COLS: usize = 256;

/// Size of one vector index slot: start_ptr (u32) + end_ptr (u32).
pub const VECTOR_INDEX_SIZE: usize = 8;

/// Total size of the vector index table.
pub const VECTOR_INDEX_LENGTH: usize = VECTOR_INDEX_ROWS * VECTOR_INDEX_COLS * VECTOR_INDEX_SIZE;

/// First byte past the vector index; range records and data start here.
pub const VECTOR_INDEX_END: usize = HEADER_INFO_LENGTH + VECTOR_INDEX_LENGTH;

/// Legacy structure version, IPv4 only.
pub const STRUCTURE_20: u16 = 2;

/// Current structure version with an IP version field.
pub const STRUCTURE_30: u16 = 3;

/// Index policy: vector index + range records.
pub const INDEX_POLICY_VECTOR: u16 = 1;

/// Index policy: b-tree layout (searched the same way).
pub const INDEX_POLICY_BTREE: u16 = 2;

/// Width of data pointers stored in range records.
pub const RUNTIME_PTR_BYTES: u16 = 4;

/// Size of the trailing data length + data pointer in a range record.
const RECORD_DATA_FIELDS: usize = 2 + 4;

/// Size of an IPv4 range record: start (4) + end (4) + data_len (2) + data_ptr (4).
pub const SEGMENT_INDEX_SIZE_V4: usize = 4 * 2 + RECORD_DATA_FIELDS;

/// Size of an IPv6 range record: start (16) + end (16) + data_len (2) + data_ptr (4).
pub const SEGMENT_INDEX_SIZE_V6: usize = 16 * 2 + RECORD_DATA_FIELDS;

/// Byte width of a range record for the given family.
pub fn segment_index_size(version: IpVersion) -> usize {
    version.ip_bytes() * 2 + RECORD_DATA_FIELDS
}

/// Parsed xdb file header.
///
/// All integers are little-endian on disk.
///
/// ```text
/// 0   u16  structure version (2 or 3)
/// 2   u16  index policy
/// 4   u32  created at (unix seconds)
/// 8   u32  start index ptr (first range record)
/// 12  u32  end index ptr (last range record, inclusive)
/// 16  u16  ip version (4 or 6), structure 3 only
/// 18  u16  runtime ptr bytes, structure 3 only
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XdbHeader {
    pub version: u16,
    pub index_policy: u16,
    pub created_at: u32,
    pub start_index_ptr: u32,
    pub end_index_ptr: u32,
    pub ip_version: IpVersion,
    pub runtime_ptr_bytes: u16,
}

impl XdbHeader {
    /// Parse the header from the leading bytes of a file.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_INFO_LENGTH {
            return Err(Error::CorruptHeader(format!(
                "expected {} header bytes, got {}",
                HEADER_INFO_LENGTH,
                buf.len()
            )));
        }

        let version = le_u16(buf, 0);
        let index_policy = le_u16(buf, 2);
        let created_at = le_u32(buf, 4);
        let start_index_ptr = le_u32(buf, 8);
        let end_index_ptr = le_u32(buf, 12);

        let (ip_version, runtime_ptr_bytes) = match version {
            STRUCTURE_20 => (IpVersion::V4, RUNTIME_PTR_BYTES),
            STRUCTURE_30 => {
                let code = le_u16(buf, 16);
                let ip_version = IpVersion::from_code(code).ok_or_else(|| {
                    Error::CorruptHeader(format!("unknown ip version code: {}", code))
                })?;
                (ip_version, le_u16(buf, 18))
            }
            other => {
                return Err(Error::CorruptHeader(format!(
                    "unsupported structure version: {}",
                    other
                )))
            }
        };

        if index_policy != INDEX_POLICY_VECTOR && index_policy != INDEX_POLICY_BTREE {
            return Err(Error::CorruptHeader(format!(
                "unknown index policy: {}",
                index_policy
            )));
        }

        if runtime_ptr_bytes != RUNTIME_PTR_BYTES {
            return Err(Error::CorruptHeader(format!(
                "unsupported runtime pointer width: {}",
                runtime_ptr_bytes
            )));
        }

        Ok(Self {
            version,
            index_policy,
            created_at,
            start_index_ptr,
            end_index_ptr,
            ip_version,
            runtime_ptr_bytes,
        })
    }

    /// Check that the declared index region fits the file layout.
    pub fn validate(&self, file_len: u64) -> Result<()> {
        let record_size = self.record_size() as u64;
        let start = self.start_index_ptr as u64;
        let end = self.end_index_ptr as u64;

        if start < VECTOR_INDEX_END as u64 {
            return Err(Error::InconsistentBounds(format!(
                "index start {} overlaps the vector index (ends at {})",
                start, VECTOR_INDEX_END
            )));
        }
        if end < start {
            return Err(Error::InconsistentBounds(format!(
                "index end {} precedes index start {}",
                end, start
            )));
        }
        if (end - start) % record_size != 0 {
            return Err(Error::InconsistentBounds(format!(
                "index span {} is not a multiple of the {} byte record size",
                end - start,
                record_size
            )));
        }
        if end + record_size > file_len {
            return Err(Error::InconsistentBounds(format!(
                "index region ends at {} but file holds {} bytes",
                end + record_size,
                file_len
            )));
        }

        let max_ptr = 1u64 << (self.runtime_ptr_bytes as u32 * 8);
        if file_len > max_ptr {
            return Err(Error::InconsistentBounds(format!(
                "file size {} exceeds the {} byte pointer space",
                file_len, self.runtime_ptr_bytes
            )));
        }

        Ok(())
    }

    /// Byte width of one range record in this file.
    pub fn record_size(&self) -> usize {
        segment_index_size(self.ip_version)
    }

    /// Number of range records declared by the header.
    pub fn record_count(&self) -> u64 {
        let span = self.end_index_ptr.saturating_sub(self.start_index_ptr) as u64;
        span / self.record_size() as u64 + 1
    }
}

pub(crate) fn le_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub(crate) fn le_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(version: u16, ip_code: u16, start: u32, end: u32) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_INFO_LENGTH];
        buf[0..2].copy_from_slice(&version.to_le_bytes());
        buf[2..4].copy_from_slice(&INDEX_POLICY_VECTOR.to_le_bytes());
        buf[4..8].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        buf[8..12].copy_from_slice(&start.to_le_bytes());
        buf[12..16].copy_from_slice(&end.to_le_bytes());
        if version == STRUCTURE_30 {
            buf[16..18].copy_from_slice(&ip_code.to_le_bytes());
            buf[18..20].copy_from_slice(&RUNTIME_PTR_BYTES.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(VECTOR_INDEX_LENGTH, 524_288);
        assert_eq!(VECTOR_INDEX_END, 524_544);
        assert_eq!(SEGMENT_INDEX_SIZE_V4, 14);
        assert_eq!(SEGMENT_INDEX_SIZE_V6, 38);
        assert_eq!(segment_index_size(IpVersion::V4), SEGMENT_INDEX_SIZE_V4);
        assert_eq!(segment_index_size(IpVersion::V6), SEGMENT_INDEX_SIZE_V6);
    }

    #[test]
    fn test_parse_structure_30() {
        let start = VECTOR_INDEX_END as u32 + 100;
        let buf = raw_header(STRUCTURE_30, 6, start, start + 38 * 9);
        let header = XdbHeader::parse(&buf).unwrap();

        assert_eq!(header.version, STRUCTURE_30);
        assert_eq!(header.ip_version, IpVersion::V6);
        assert_eq!(header.created_at, 1_700_000_000);
        assert_eq!(header.record_size(), 38);
        assert_eq!(header.record_count(), 10);
    }

    #[test]
    fn test_parse_structure_20_is_ipv4() {
        let start = VECTOR_INDEX_END as u32;
        let buf = raw_header(STRUCTURE_20, 0, start, start);
        let header = XdbHeader::parse(&buf).unwrap();

        assert_eq!(header.ip_version, IpVersion::V4);
        assert_eq!(header.runtime_ptr_bytes, RUNTIME_PTR_BYTES);
        assert_eq!(header.record_count(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_markers() {
        let start = VECTOR_INDEX_END as u32;

        let short = vec![0u8; 64];
        assert!(matches!(
            XdbHeader::parse(&short),
            Err(Error::CorruptHeader(_))
        ));

        let bad_version = raw_header(9, 4, start, start);
        assert!(matches!(
            XdbHeader::parse(&bad_version),
            Err(Error::CorruptHeader(_))
        ));

        let bad_ip = raw_header(STRUCTURE_30, 5, start, start);
        assert!(matches!(
            XdbHeader::parse(&bad_ip),
            Err(Error::CorruptHeader(_))
        ));

        let mut bad_ptr = raw_header(STRUCTURE_30, 4, start, start);
        bad_ptr[18..20].copy_from_slice(&8u16.to_le_bytes());
        assert!(matches!(
            XdbHeader::parse(&bad_ptr),
            Err(Error::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_validate_bounds() {
        let start = VECTOR_INDEX_END as u32 + 14;
        let header = XdbHeader::parse(&raw_header(STRUCTURE_30, 4, start, start + 14)).unwrap();
        let file_len = start as u64 + 28;

        assert!(header.validate(file_len).is_ok());
        assert!(matches!(
            header.validate(file_len - 1),
            Err(Error::InconsistentBounds(_))
        ));

        let misaligned =
            XdbHeader::parse(&raw_header(STRUCTURE_30, 4, start, start + 13)).unwrap();
        assert!(matches!(
            misaligned.validate(file_len),
            Err(Error::InconsistentBounds(_))
        ));

        let reversed = XdbHeader::parse(&raw_header(STRUCTURE_30, 4, start, start - 14)).unwrap();
        assert!(matches!(
            reversed.validate(file_len),
            Err(Error::InconsistentBounds(_))
        ));

        let overlapping = XdbHeader::parse(&raw_header(STRUCTURE_30, 4, 300, 300)).unwrap();
        assert!(matches!(
            overlapping.validate(file_len),
            Err(Error::InconsistentBounds(_))
        ));
    }
}
