//! Structural verification of xdb files.
//!
//! Verification is meant to run against untrusted files, so problems are
//! reported in a [`VerifyReport`] instead of being returned as errors.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::xdb::{FileReader, XdbHeader, HEADER_INFO_LENGTH};
use crate::Error;

/// Class of verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifyError {
    /// File missing or unreadable
    FileNotFound,
    /// Header truncated or carrying unknown markers
    CorruptHeader,
    /// Index pointers disagree with the file length
    InconsistentBounds,
}

impl VerifyError {
    /// Numeric error code reported to callers.
    pub fn code(&self) -> i32 {
        match self {
            VerifyError::FileNotFound => -1,
            VerifyError::CorruptHeader => -2,
            VerifyError::InconsistentBounds => -3,
        }
    }

    fn from_error(err: &Error) -> Self {
        match err {
            Error::Open { .. } => VerifyError::FileNotFound,
            Error::InconsistentBounds(_) => VerifyError::InconsistentBounds,
            _ => VerifyError::CorruptHeader,
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerifyError::FileNotFound => "file not found",
            VerifyError::CorruptHeader => "corrupt header",
            VerifyError::InconsistentBounds => "inconsistent bounds",
        };
        f.write_str(name)
    }
}

/// Result of verifying one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub valid: bool,
    /// `0` when valid, otherwise the code of `error`
    pub error_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<VerifyError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerifyReport {
    fn ok() -> Self {
        Self {
            valid: true,
            error_code: 0,
            error: None,
            message: None,
        }
    }

    fn failed(err: &Error) -> Self {
        let kind = VerifyError::from_error(err);
        Self {
            valid: false,
            error_code: kind.code(),
            error: Some(kind),
            message: Some(err.to_string()),
        }
    }
}

/// Verify an xdb file on disk.
///
/// Only the header and the file length are read; no caches are built.
pub fn verify(path: impl AsRef<Path>) -> VerifyReport {
    let path = path.as_ref();
    let report = match check_file(path) {
        Ok(()) => VerifyReport::ok(),
        Err(err) => VerifyReport::failed(&err),
    };

    if let Some(message) = &report.message {
        log::warn!("xdb verification failed for {:?}: {}", path, message);
    }
    report
}

/// Verify an xdb database held in memory.
pub fn verify_bytes(data: &[u8]) -> VerifyReport {
    match check_header(data, data.len() as u64) {
        Ok(()) => VerifyReport::ok(),
        Err(err) => VerifyReport::failed(&err),
    }
}

fn check_file(path: &Path) -> crate::Result<()> {
    let file = FileReader::open(path)?;
    if file.len() < HEADER_INFO_LENGTH as u64 {
        return Err(Error::CorruptHeader(format!(
            "file holds {} bytes, header needs {}",
            file.len(),
            HEADER_INFO_LENGTH
        )));
    }

    let mut head = [0u8; HEADER_INFO_LENGTH];
    file.read_on_open(0, &mut head)?;

    check_header(&head, file.len())
}

fn check_header(head: &[u8], file_len: u64) -> crate::Result<()> {
    let header = XdbHeader::parse(head)?;
    header.validate(file_len)
}
