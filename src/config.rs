//! Searcher configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ip::IpVersion;
use crate::xdb::CachePolicy;
use crate::{Error, Result};

/// Options chosen once when a searcher is opened.
///
/// Deserializes from JSON such as:
///
/// ```json
/// { "cachePolicy": "vectorIndex", "ipVersion": "v4" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SearcherConfig {
    /// Caching strategy for the database bytes
    pub cache_policy: CachePolicy,
    /// IP family the database was built for
    pub ip_version: IpVersion,
}

impl SearcherConfig {
    /// Create a configuration with the given policy and family.
    pub fn new(cache_policy: CachePolicy, ip_version: IpVersion) -> Self {
        Self {
            cache_policy,
            ip_version,
        }
    }

    /// Replace the cache policy.
    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Replace the IP family.
    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = ip_version;
        self
    }

    /// Parse a configuration from JSON text. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
