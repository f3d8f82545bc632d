//! IP address parsing and fixed-width lookup keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::{Error, Result};

/// IP family of an xdb database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IpVersion {
    /// IPv4, 32-bit keys
    #[default]
    #[serde(rename = "v4", alias = "ipv4")]
    V4,
    /// IPv6, 128-bit keys
    #[serde(rename = "v6", alias = "ipv6")]
    V6,
}

impl IpVersion {
    /// Get the internal name of this IP version.
    pub fn name(&self) -> &'static str {
        match self {
            IpVersion::V4 => "v4",
            IpVersion::V6 => "v6",
        }
    }

    /// Width of an address of this family in bytes.
    pub fn ip_bytes(&self) -> usize {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 16,
        }
    }

    /// Header code for this family (4 or 6).
    pub fn code(&self) -> u16 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Map a header code back to an IP version.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            4 => Some(IpVersion::V4),
            6 => Some(IpVersion::V6),
            _ => None,
        }
    }

    /// Parse an address that must belong to this family.
    ///
    /// Text that is a valid address of the other family is rejected
    /// with [`Error::InvalidAddress`].
    pub fn parse(&self, text: &str) -> Result<IpKey> {
        let key = IpKey::parse(text)?;
        if key.version() != *self {
            return Err(Error::InvalidAddress(text.to_string()));
        }
        Ok(key)
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "v4" | "ipv4" | "4" => Ok(IpVersion::V4),
            "v6" | "ipv6" | "6" => Ok(IpVersion::V6),
            _ => Err(Error::InvalidConfig(format!("unknown IP version: {}", s))),
        }
    }
}

/// Fixed-width unsigned key for an address.
///
/// Keys of the same family compare by numeric value, which is the order
/// range records are sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IpKey {
    V4(u32),
    V6(u128),
}

impl IpKey {
    /// Parse dotted-decimal IPv4 or colon-hex IPv6 text.
    pub fn parse(text: &str) -> Result<Self> {
        text.parse::<IpAddr>()
            .map(Self::from)
            .map_err(|_| Error::InvalidAddress(text.to_string()))
    }

    /// Get the IP family of this key.
    pub fn version(&self) -> IpVersion {
        match self {
            IpKey::V4(_) => IpVersion::V4,
            IpKey::V6(_) => IpVersion::V6,
        }
    }

    /// First two bytes in network order, used to select a vector index slot.
    pub fn prefix(&self) -> (u8, u8) {
        match *self {
            IpKey::V4(v) => ((v >> 24) as u8, (v >> 16) as u8),
            IpKey::V6(v) => ((v >> 120) as u8, (v >> 112) as u8),
        }
    }

    /// Convert back to a standard library address.
    pub fn to_ip_addr(&self) -> IpAddr {
        match *self {
            IpKey::V4(v) => IpAddr::V4(Ipv4Addr::from(v)),
            IpKey::V6(v) => IpAddr::V6(Ipv6Addr::from(v)),
        }
    }
}

impl From<Ipv4Addr> for IpKey {
    fn from(ip: Ipv4Addr) -> Self {
        IpKey::V4(u32::from(ip))
    }
}

impl From<Ipv6Addr> for IpKey {
    fn from(ip: Ipv6Addr) -> Self {
        IpKey::V6(u128::from(ip))
    }
}

impl From<IpAddr> for IpKey {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl FromStr for IpKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        IpKey::parse(s)
    }
}

impl fmt::Display for IpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_ip_addr().fmt(f)
    }
}
