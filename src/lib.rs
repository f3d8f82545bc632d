//! xdb-region - IP to region lookups over immutable xdb database files.
//!
//! An xdb file maps IPv4 or IPv6 ranges to opaque region strings such as
//! `CN|Zhejiang|Hangzhou|ISP`. The file is built offline; this crate only
//! reads it.
//!
//! # Features
//!
//! - **Two-level index**: a 256×256 vector index narrows every lookup to a
//!   handful of range records, which are then binary-searched
//! - **Three cache policies**: `file` (no caching), `vectorIndex` (512 KiB
//!   table resident) and `content` (whole file resident)
//! - **I/O accounting**: every result reports how many file reads it took
//! - **Thread-safe**: searches take `&self`; `close` waits for them
//! - **Verification**: structural checks that report instead of failing
//!
//! # Quick Start
//!
//! ```ignore
//! use xdb_region::{CachePolicy, IpVersion, Searcher, SearcherConfig};
//!
//! let searcher = Searcher::open(
//!     "ip2region_v4.xdb",
//!     SearcherConfig::new(CachePolicy::Content, IpVersion::V4),
//! )?;
//!
//! let result = searcher.search("1.2.3.4")?;
//! println!("{} in {:.2}µs", result.region_str(), result.took_micros());
//! ```
//!
//! # Verification
//!
//! ```ignore
//! let report = xdb_region::verify("ip2region_v4.xdb");
//! if !report.valid {
//!     eprintln!("bad xdb file: error code {}", report.error_code);
//! }
//! ```
//!
//! # Error Codes
//!
//! - `0`: valid
//! - `-1`: file missing or unreadable
//! - `-2`: header corrupt
//! - `-3`: index bounds inconsistent with the file

mod config;
mod error;
mod ip;
mod searcher;
mod verify;

pub mod xdb;

// Re-export core types
pub use config::SearcherConfig;
pub use error::{Error, Result};
pub use ip::{IpKey, IpVersion};
pub use searcher::{SearchResult, Searcher};
pub use verify::{verify, verify_bytes, VerifyError, VerifyReport};

// Re-export the cache policy, which is part of every configuration
pub use xdb::CachePolicy;
