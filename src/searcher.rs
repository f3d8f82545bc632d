//! The searcher: opens an xdb file under a cache policy and resolves
//! addresses to region strings.

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::SearcherConfig;
use crate::ip::{IpKey, IpVersion};
use crate::verify::VerifyReport;
use crate::xdb::{
    ByteSource, CachePolicy, DataSegment, FileReader, IoCounter, RangeIndex, VectorIndex,
    XdbHeader, HEADER_INFO_LENGTH,
};
use crate::{Error, Result};

/// Outcome of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Region string, or `None` when no range covers the address
    pub region: Option<String>,
    /// Reads issued against the file to answer this query
    pub io_count: u32,
    /// Wall-clock time spent in the search
    #[serde(serialize_with = "serialize_micros")]
    pub took: Duration,
}

impl SearchResult {
    /// Whether a range covered the address.
    pub fn is_found(&self) -> bool {
        self.region.is_some()
    }

    /// Region string, empty when not found.
    pub fn region_str(&self) -> &str {
        self.region.as_deref().unwrap_or("")
    }

    /// Elapsed time in microseconds.
    pub fn took_micros(&self) -> f64 {
        micros(&self.took)
    }
}

fn micros(took: &Duration) -> f64 {
    took.as_nanos() as f64 / 1_000.0
}

fn serialize_micros<S>(took: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(micros(took))
}

/// Everything released by `close`.
struct Engine {
    source: ByteSource,
    header: XdbHeader,
}

impl Engine {
    fn lookup(&self, key: &IpKey) -> Result<(Option<String>, IoCounter)> {
        let mut io = IoCounter::new();

        let range = VectorIndex::new(&self.source).lookup(key, &mut io)?;
        let record = RangeIndex::new(&self.source, &self.header).search(range, key, &mut io)?;
        let region = match record {
            Some(record) => Some(DataSegment::new(&self.source).fetch(&record, &mut io)?),
            None => None,
        };

        Ok((region, io))
    }
}

/// Read-only IP to region searcher over one xdb database.
///
/// Searches take `&self` and may run concurrently from many threads.
/// [`close`](Searcher::close) waits for in-flight searches, releases the
/// file handle and buffers, and makes every later call fail with
/// [`Error::SearcherClosed`].
///
/// # Example
///
/// ```ignore
/// use xdb_region::{CachePolicy, IpVersion, Searcher, SearcherConfig};
///
/// let config = SearcherConfig::new(CachePolicy::VectorIndex, IpVersion::V4);
/// let searcher = Searcher::open("ip2region_v4.xdb", config)?;
///
/// let result = searcher.search("120.229.45.2")?;
/// println!("{} ({} µs, {} IO)", result.region_str(), result.took_micros(), result.io_count);
///
/// searcher.close();
/// ```
pub struct Searcher {
    engine: RwLock<Option<Engine>>,
    header: XdbHeader,
    config: SearcherConfig,
    path: Option<PathBuf>,
}

impl Searcher {
    /// Open an xdb file.
    ///
    /// Validates the header and index bounds, then loads whatever the
    /// cache policy keeps resident.
    pub fn open(path: impl AsRef<Path>, config: SearcherConfig) -> Result<Self> {
        let path = path.as_ref();
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

        let header = XdbHeader::parse(&head)?;
        check_family(&header, config.ip_version)?;
        header.validate(file.len())?;

        let source = ByteSource::with_policy(file, config.cache_policy)?;
        log::debug!(
            "Opened {:?}: {} records, ip {}, policy {}",
            path,
            header.record_count(),
            header.ip_version,
            config.cache_policy
        );

        Ok(Self::from_parts(source, header, config, Some(path.to_path_buf())))
    }

    /// Open a database held in memory. Always uses the `content` policy.
    pub fn from_bytes(data: Vec<u8>, ip_version: IpVersion) -> Result<Self> {
        let header = XdbHeader::parse(&data)?;
        check_family(&header, ip_version)?;
        header.validate(data.len() as u64)?;

        let config = SearcherConfig::new(CachePolicy::Content, ip_version);
        Ok(Self::from_parts(ByteSource::from_bytes(data), header, config, None))
    }

    fn from_parts(
        source: ByteSource,
        header: XdbHeader,
        config: SearcherConfig,
        path: Option<PathBuf>,
    ) -> Self {
        Self {
            engine: RwLock::new(Some(Engine { source, header })),
            header,
            config,
            path,
        }
    }

    /// Resolve an address given as text.
    ///
    /// `io_count` is the number of file reads the lookup issued: the vector
    /// slot (`file` only), each binary-search probe, then the region data.
    /// A single-record bucket hit costs 3 under `file`, 2 under
    /// `vectorIndex` and 0 under `content`.
    pub fn search(&self, ip: &str) -> Result<SearchResult> {
        let started = Instant::now();
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(Error::SearcherClosed)?;

        let key = self.config.ip_version.parse(ip)?;
        self.run(engine, &key, started)
    }

    /// Resolve a standard library address.
    pub fn search_ip(&self, ip: IpAddr) -> Result<SearchResult> {
        self.search_key(IpKey::from(ip))
    }

    /// Resolve an already parsed key.
    pub fn search_key(&self, key: IpKey) -> Result<SearchResult> {
        let started = Instant::now();
        let guard = self.engine.read();
        let engine = guard.as_ref().ok_or(Error::SearcherClosed)?;

        if key.version() != self.config.ip_version {
            return Err(Error::InvalidAddress(key.to_string()));
        }
        self.run(engine, &key, started)
    }

    fn run(&self, engine: &Engine, key: &IpKey, started: Instant) -> Result<SearchResult> {
        let (region, io) = engine.lookup(key)?;
        let took = started.elapsed();

        log::trace!(
            "search {} -> {:?} ({} io, {:?})",
            key,
            region,
            io.count(),
            took
        );

        Ok(SearchResult {
            region,
            io_count: io.count(),
            took,
        })
    }

    /// Release the file handle and buffers.
    ///
    /// Blocks until in-flight searches finish. Calling it again is a no-op.
    pub fn close(&self) {
        if self.engine.write().take().is_some() {
            log::debug!("Closed searcher ({} policy)", self.config.cache_policy);
        }
    }

    /// Whether [`close`](Searcher::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.engine.read().is_none()
    }

    /// Header of the opened database.
    pub fn header(&self) -> &XdbHeader {
        &self.header
    }

    /// Configuration the searcher was opened with.
    pub fn config(&self) -> SearcherConfig {
        self.config
    }

    /// Database path, or `None` for a searcher built with `from_bytes`.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Verify an xdb file without opening a searcher.
    pub fn verify(path: impl AsRef<Path>) -> VerifyReport {
        crate::verify::verify(path)
    }
}

fn check_family(header: &XdbHeader, configured: IpVersion) -> Result<()> {
    if header.ip_version != configured {
        return Err(Error::IpVersionMismatch {
            configured,
            file: header.ip_version,
        });
    }
    Ok(())
}
