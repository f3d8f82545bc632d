//! Vector index: a 256×256 table of range-record bounds keyed by the
//! first two bytes of an address.

use super::format::{le_u32, HEADER_INFO_LENGTH, VECTOR_INDEX_COLS, VECTOR_INDEX_SIZE};
use super::source::{ByteSource, IoCounter};
use crate::ip::IpKey;
use crate::Result;

/// Byte bounds of the range records sharing one two-byte prefix.
///
/// `end` is exclusive. An empty bucket has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: u32,
    pub end: u32,
}

impl IndexRange {
    /// Whether no records share this prefix.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// View of the vector index over a byte source.
pub struct VectorIndex<'a> {
    source: &'a ByteSource,
}

impl<'a> VectorIndex<'a> {
    pub fn new(source: &'a ByteSource) -> Self {
        Self { source }
    }

    /// Offset of the slot for a prefix, relative to the table start.
    pub fn slot_offset(prefix: (u8, u8)) -> usize {
        let (row, col) = prefix;
        (row as usize * VECTOR_INDEX_COLS + col as usize) * VECTOR_INDEX_SIZE
    }

    /// Bounds of the records whose start address shares the key's prefix.
    ///
    /// Served from memory when the source keeps the table resident,
    /// otherwise one 8-byte read against the file.
    pub fn lookup(&self, key: &IpKey, io: &mut IoCounter) -> Result<IndexRange> {
        let slot = Self::slot_offset(key.prefix());

        let range = match self.source.vector_index() {
            Some(table) => IndexRange {
                start: le_u32(table, slot),
                end: le_u32(table, slot + 4),
            },
            None => {
                let mut buf = [0u8; VECTOR_INDEX_SIZE];
                self.source
                    .read_at((HEADER_INFO_LENGTH + slot) as u64, &mut buf, io)?;
                IndexRange {
                    start: le_u32(&buf, 0),
                    end: le_u32(&buf, 4),
                }
            }
        };

        Ok(range)
    }
}
