//! Error types for xdb-region.

use std::path::PathBuf;

use thiserror::Error;

use crate::ip::IpVersion;

/// Error type for xdb-region operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Query text is not a valid address for the configured IP family
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// Database file could not be opened or loaded
    #[error("failed to open xdb file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header is truncated or carries an unknown marker
    #[error("corrupt xdb header: {0}")]
    CorruptHeader(String),

    /// Header pointers disagree with the file layout
    #[error("inconsistent xdb index bounds: {0}")]
    InconsistentBounds(String),

    /// The file was built for a different IP family than requested
    #[error("IP version mismatch: searcher configured for {configured}, file holds {file}")]
    IpVersionMismatch {
        configured: IpVersion,
        file: IpVersion,
    },

    /// A read fell outside the byte source
    #[error("read out of bounds: offset {offset}, length {len}, source size {size}")]
    Read { offset: u64, len: usize, size: u64 },

    /// A range record points at invalid region data
    #[error("corrupt region data: {0}")]
    CorruptData(String),

    /// The searcher has been closed
    #[error("searcher is closed")]
    SearcherClosed,

    /// Configuration error
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error prevents any further use of the searcher.
    ///
    /// Per-query failures (bad input, unreadable records) leave the
    /// searcher usable; only a closed searcher is terminal.
    pub fn is_fatal_for_searcher(&self) -> bool {
        matches!(self, Error::SearcherClosed)
    }
}

/// Result type alias for xdb-region operations.
pub type Result<T> = std::result::Result<T, Error>;
