//! The xdb file format and the views used to search it.
//!
//! An xdb file is built offline and never modified. Lookups narrow the
//! search with the vector index, binary-search the range records of one
//! bucket, then read the region string the matching record points at.
//!
//! # File Structure
//!
//! ```text
//! +------------------+
//! |     HEADER       |  256 bytes (fixed)
//! +------------------+
//! |   VECTOR INDEX   |  256 × 256 × 8 bytes
//! +------------------+
//! |   REGION DATA    |  variable, UTF-8 strings
//! +------------------+
//! |  RANGE RECORDS   |  14 bytes (IPv4) or 38 bytes (IPv6) each
//! +------------------+
//! ```

mod format;
mod segment;
mod source;
mod vector;

#[cfg(test)]
pub(crate) mod fixture;


pub use format::*;
pub use segment::{DataSegment, RangeIndex, RangeRecord};
pub use source::{ByteSource, CachePolicy, FileReader, IoCounter};
pub use vector::{IndexRange, VectorIndex};
