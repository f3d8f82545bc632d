//! Byte sources backing a searcher, one per cache policy.
//!
//! | policy        | resident memory         | query-time reads counted as I/O |
//! |---------------|-------------------------|---------------------------------|
//! | `file`        | none                    | vector slot, records, data      |
//! | `vectorIndex` | 512 KiB vector table    | records, data                   |
//! | `content`     | whole file              | nothing                         |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::format::{HEADER_INFO_LENGTH, VECTOR_INDEX_END, VECTOR_INDEX_LENGTH};
use crate::{Error, Result};

/// Caching strategy for a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CachePolicy {
    /// Every read goes to the file
    File,
    /// Vector index table resident, everything else read from the file
    #[default]
    VectorIndex,
    /// Whole file resident
    Content,
}

impl CachePolicy {
    /// All policies, from least to most memory.
    pub const ALL: [CachePolicy; 3] = [
        CachePolicy::File,
        CachePolicy::VectorIndex,
        CachePolicy::Content,
    ];

    /// Get the internal name of this cache policy.
    pub fn name(&self) -> &'static str {
        match self {
            CachePolicy::File => "file",
            CachePolicy::VectorIndex => "vectorIndex",
            CachePolicy::Content => "content",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CachePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(CachePolicy::File),
            "vectorindex" | "vector_index" | "vector-index" => Ok(CachePolicy::VectorIndex),
            "content" => Ok(CachePolicy::Content),
            _ => Err(Error::InvalidConfig(format!("unknown cache policy: {}", s))),
        }
    }
}

/// Number of discrete reads issued against the underlying file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IoCounter {
    count: u32,
}

impl IoCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Reads counted so far.
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Read-only file handle serving positioned reads.
///
/// Reads never move a shared cursor, so concurrent queries can use the
/// same handle without locking.
#[derive(Debug)]
pub struct FileReader {
    file: File,
    path: PathBuf,
    len: u64,
}

impl FileReader {
    /// Open a file for positioned reads.
    pub fn open(path: &Path) -> Result<Self> {
        let open_error = |source| Error::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_error)?;
        let metadata = file.metadata().map_err(open_error)?;
        if metadata.is_dir() {
            return Err(open_error(io::Error::new(
                io::ErrorKind::Other,
                "path is a directory",
            )));
        }
        let len = metadata.len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    /// Length of the file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fill `buf` from `offset`, failing if the range exceeds the file.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len(), self.len)?;
        pread_exact(&self.file, buf, offset)?;
        Ok(())
    }

    /// Fill `buf` from `offset` while opening.
    ///
    /// Like [`read_exact_at`](Self::read_exact_at), but I/O failures are
    /// reported as [`Error::Open`] for this file.
    pub fn read_on_open(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.read_exact_at(offset, buf).map_err(|e| match e {
            Error::Io(source) => Error::Open {
                path: self.path.clone(),
                source,
            },
            other => other,
        })
    }

    /// Read a whole byte range into a new buffer (construction-time loads).
    fn load(&self, offset: u64, len: usize) -> Result<Box<[u8]>> {
        let mut buf = vec![0u8; len];
        self.read_on_open(offset, &mut buf)?;
        Ok(buf.into_boxed_slice())
    }
}

/// A span of xdb bytes readable by offset and length.
pub enum ByteSource {
    /// On-demand positioned reads
    File(FileReader),
    /// Positioned reads with the vector index table held in memory
    VectorIndex {
        file: FileReader,
        vector_index: Box<[u8]>,
    },
    /// Entire file held in memory
    Content(Box<[u8]>),
}

impl ByteSource {
    /// Open a file with the given cache policy.
    pub fn open(path: &Path, policy: CachePolicy) -> Result<Self> {
        Self::with_policy(FileReader::open(path)?, policy)
    }

    /// Wrap an already opened file, loading whatever the policy keeps resident.
    pub fn with_policy(file: FileReader, policy: CachePolicy) -> Result<Self> {
        match policy {
            CachePolicy::File => Ok(ByteSource::File(file)),
            CachePolicy::VectorIndex => {
                let vector_index =
                    file.load(HEADER_INFO_LENGTH as u64, VECTOR_INDEX_LENGTH)?;
                log::debug!(
                    "Loaded {} byte vector index from {:?}",
                    vector_index.len(),
                    file.path()
                );
                Ok(ByteSource::VectorIndex { file, vector_index })
            }
            CachePolicy::Content => {
                let len = usize::try_from(file.len()).map_err(|_| Error::Open {
                    path: file.path().to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        "file too large to load into memory",
                    ),
                })?;
                let content = file.load(0, len)?;
                log::debug!("Loaded {} bytes of content from {:?}", len, file.path());
                Ok(ByteSource::Content(content))
            }
        }
    }

    /// Build a fully in-memory source from a buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        ByteSource::Content(data.into_boxed_slice())
    }

    /// Cache policy of this source.
    pub fn policy(&self) -> CachePolicy {
        match self {
            ByteSource::File(_) => CachePolicy::File,
            ByteSource::VectorIndex { .. } => CachePolicy::VectorIndex,
            ByteSource::Content(_) => CachePolicy::Content,
        }
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        match self {
            ByteSource::File(file) | ByteSource::VectorIndex { file, .. } => file.len(),
            ByteSource::Content(content) => content.len() as u64,
        }
    }

    /// Whether the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate number of bytes held in memory by this source.
    pub fn resident_bytes(&self) -> usize {
        match self {
            ByteSource::File(_) => 0,
            ByteSource::VectorIndex { vector_index, .. } => vector_index.len(),
            ByteSource::Content(content) => content.len(),
        }
    }

    /// Fill `buf` with the bytes at `offset`.
    ///
    /// File-backed reads are counted in `io`; in-memory reads are not.
    pub fn read_at(&self, offset: u64, buf: &mut [u8], io: &mut IoCounter) -> Result<()> {
        match self {
            ByteSource::File(file) | ByteSource::VectorIndex { file, .. } => {
                check_bounds(offset, buf.len(), file.len())?;
                io.increment();
                pread_exact(&file.file, buf, offset)?;
                Ok(())
            }
            ByteSource::Content(content) => {
                check_bounds(offset, buf.len(), content.len() as u64)?;
                let start = offset as usize;
                buf.copy_from_slice(&content[start..start + buf.len()]);
                Ok(())
            }
        }
    }

    /// The resident vector index table, if this policy keeps one.
    pub fn vector_index(&self) -> Option<&[u8]> {
        match self {
            ByteSource::File(_) => None,
            ByteSource::VectorIndex { vector_index, .. } => Some(&vector_index[..]),
            ByteSource::Content(content) => content.get(HEADER_INFO_LENGTH..VECTOR_INDEX_END),
        }
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("policy", &self.policy())
            .field("len", &self.len())
            .field("resident_bytes", &self.resident_bytes())
            .finish()
    }
}

fn check_bounds(offset: u64, len: usize, size: u64) -> Result<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::Read { offset, len, size }),
    }
}

#[cfg(unix)]
fn pread_exact(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn pread_exact(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    let mut filled = 0;
    while filled < buf.len() {
        match file.seek_read(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
