//! Range records and the region data they point at.

use super::format::{le_u16, le_u32, XdbHeader, SEGMENT_INDEX_SIZE_V6};
use super::source::{ByteSource, IoCounter};
use super::vector::IndexRange;
use crate::ip::{IpKey, IpVersion};
use crate::{Error, Result};

/// One fixed-width index record mapping an address interval to region data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRecord {
    pub start_ip: IpKey,
    pub end_ip: IpKey,
    pub data_len: u16,
    pub data_ptr: u32,
}

impl RangeRecord {
    /// Decode a record from its on-disk bytes.
    ///
    /// IPv4 bounds are stored little-endian, IPv6 bounds in network order.
    /// `buf` must hold exactly one record of the given family.
    pub fn decode(version: IpVersion, buf: &[u8]) -> Self {
        let (start_ip, end_ip, tail) = match version {
            IpVersion::V4 => (
                IpKey::V4(le_u32(buf, 0)),
                IpKey::V4(le_u32(buf, 4)),
                8,
            ),
            IpVersion::V6 => {
                let mut start = [0u8; 16];
                let mut end = [0u8; 16];
                start.copy_from_slice(&buf[0..16]);
                end.copy_from_slice(&buf[16..32]);
                (
                    IpKey::V6(u128::from_be_bytes(start)),
                    IpKey::V6(u128::from_be_bytes(end)),
                    32,
                )
            }
        };

        Self {
            start_ip,
            end_ip,
            data_len: le_u16(buf, tail),
            data_ptr: le_u32(buf, tail + 2),
        }
    }

    /// Whether the key falls inside this record's interval.
    pub fn contains(&self, key: &IpKey) -> bool {
        self.start_ip <= *key && *key <= self.end_ip
    }
}

/// Binary search over the sorted range records of one vector bucket.
pub struct RangeIndex<'a> {
    source: &'a ByteSource,
    header: &'a XdbHeader,
}

impl<'a> RangeIndex<'a> {
    pub fn new(source: &'a ByteSource, header: &'a XdbHeader) -> Self {
        Self { source, header }
    }

    /// Find the record containing `key` within `range`.
    ///
    /// Returns `Ok(None)` when the bucket is empty or the key falls in a gap.
    /// Every record read counts as one I/O on file-backed sources.
    pub fn search(
        &self,
        range: IndexRange,
        key: &IpKey,
        io: &mut IoCounter,
    ) -> Result<Option<RangeRecord>> {
        if range.is_empty() {
            return Ok(None);
        }

        let record_size = self.header.record_size();
        let region_end = self.header.end_index_ptr as u64 + record_size as u64;
        let span = (range.end - range.start) as usize;
        if range.start < self.header.start_index_ptr
            || range.end as u64 > region_end
            || span % record_size != 0
        {
            return Err(Error::CorruptData(format!(
                "vector bucket [{}, {}) lies outside the index region [{}, {})",
                range.start, range.end, self.header.start_index_ptr, region_end
            )));
        }

        let mut scratch = [0u8; SEGMENT_INDEX_SIZE_V6];
        let buf = &mut scratch[..record_size];

        let (mut lo, mut hi) = (0usize, span / record_size);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let offset = range.start as u64 + (mid * record_size) as u64;
            self.source.read_at(offset, buf, io)?;

            let record = RangeRecord::decode(self.header.ip_version, buf);
            if *key < record.start_ip {
                hi = mid;
            } else if *key > record.end_ip {
                lo = mid + 1;
            } else {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }
}

/// Region strings referenced by range records.
pub struct DataSegment<'a> {
    source: &'a ByteSource,
}

impl<'a> DataSegment<'a> {
    pub fn new(source: &'a ByteSource) -> Self {
        Self { source }
    }

    /// Read the region string of a record.
    ///
    /// A zero-length record resolves to the empty string without a read.
    pub fn fetch(&self, record: &RangeRecord, io: &mut IoCounter) -> Result<String> {
        if record.data_len == 0 {
            return Ok(String::new());
        }

        let offset = record.data_ptr as u64;
        let len = record.data_len as usize;
        if offset + len as u64 > self.source.len() {
            return Err(Error::CorruptData(format!(
                "region data at {} (+{}) exceeds source size {}",
                offset,
                len,
                self.source.len()
            )));
        }

        let mut buf = vec![0u8; len];
        self.source.read_at(offset, &mut buf, io)?;

        String::from_utf8(buf).map_err(|e| {
            Error::CorruptData(format!("region data at {} is not UTF-8: {}", offset, e))
        })
    }
}
