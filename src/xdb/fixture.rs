//! xdb fixture writer for tests.
//!
//! Produces files with the same layout as the external maker: header,
//! vector index, deduplicated region data, then range records. Ranges are
//! split so that no record crosses a two-byte prefix boundary.
//!
//! Only depends on std so integration tests can include it by path.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 256;
const VECTOR_LEN: usize = 256 * 256 * 8;

pub struct XdbFixture {
    v6: bool,
    structure: u16,
    ranges: Vec<(u128, u128, String)>,
}

impl XdbFixture {
    pub fn v4() -> Self {
        Self {
            v6: false,
            structure: 3,
            ranges: Vec::new(),
        }
    }

    pub fn v6() -> Self {
        Self {
            v6: true,
            structure: 3,
            ranges: Vec::new(),
        }
    }

    /// IPv4 file with the legacy structure 2 header.
    pub fn legacy_v4() -> Self {
        Self {
            v6: false,
            structure: 2,
            ranges: Vec::new(),
        }
    }

    /// Add an inclusive range. Both bounds must match the fixture family.
    pub fn range(mut self, start: &str, end: &str, region: &str) -> Self {
        let start = self.key(start);
        let end = self.key(end);
        assert!(start <= end, "range start after end");
        self.ranges.push((start, end, region.to_string()));
        self
    }

    fn key(&self, text: &str) -> u128 {
        match (text.parse::<IpAddr>().expect("fixture ip"), self.v6) {
            (IpAddr::V4(v4), false) => u32::from(v4) as u128,
            (IpAddr::V6(v6), true) => u128::from(v6),
            _ => panic!("fixture ip {} does not match family", text),
        }
    }

    fn record_size(&self) -> usize {
        if self.v6 {
            38
        } else {
            14
        }
    }

    fn prefix(&self, ip: u128) -> usize {
        let shift = if self.v6 { 112 } else { 16 };
        ((ip >> shift) & 0xffff) as usize
    }

    fn split(&self) -> Vec<(u128, u128, &str)> {
        let mask: u128 = if self.v6 { (1u128 << 112) - 1 } else { 0xffff };
        let mut ranges: Vec<&(u128, u128, String)> = self.ranges.iter().collect();
        ranges.sort_by_key(|(start, _, _)| *start);

        let mut out = Vec::new();
        for (start, end, region) in ranges {
            let mut s = *start;
            loop {
                let chunk_end = (s | mask).min(*end);
                out.push((s, chunk_end, region.as_str()));
                if chunk_end == *end {
                    break;
                }
                s = chunk_end + 1;
            }
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        assert!(!self.ranges.is_empty(), "fixture needs at least one range");

        let records = self.split();
        let record_size = self.record_size();
        let mut buf = vec![0u8; HEADER_LEN + VECTOR_LEN];

        let mut data_ptrs: HashMap<&str, u32> = HashMap::new();
        for (_, _, region) in &records {
            if !data_ptrs.contains_key(region) {
                data_ptrs.insert(*region, buf.len() as u32);
                buf.extend_from_slice(region.as_bytes());
            }
        }

        let start_index_ptr = buf.len() as u32;
        for (start, end, region) in &records {
            let ptr = buf.len() as u32;
            if self.v6 {
                buf.extend_from_slice(&start.to_be_bytes());
                buf.extend_from_slice(&end.to_be_bytes());
            } else {
                buf.extend_from_slice(&(*start as u32).to_le_bytes());
                buf.extend_from_slice(&(*end as u32).to_le_bytes());
            }
            buf.extend_from_slice(&(region.len() as u16).to_le_bytes());
            buf.extend_from_slice(&data_ptrs[region].to_le_bytes());

            let slot = HEADER_LEN + self.prefix(*start) * 8;
            let s_ptr = u32::from_le_bytes(buf[slot..slot + 4].try_into().unwrap());
            if s_ptr == 0 {
                buf[slot..slot + 4].copy_from_slice(&ptr.to_le_bytes());
            }
            buf[slot + 4..slot + 8].copy_from_slice(&(ptr + record_size as u32).to_le_bytes());
        }
        let end_index_ptr = buf.len() as u32 - record_size as u32;

        buf[0..2].copy_from_slice(&self.structure.to_le_bytes());
        buf[2..4].copy_from_slice(&1u16.to_le_bytes());
        buf[4..8].copy_from_slice(&1_700_000_000u32.to_le_bytes());
        buf[8..12].copy_from_slice(&start_index_ptr.to_le_bytes());
        buf[12..16].copy_from_slice(&end_index_ptr.to_le_bytes());
        if self.structure >= 3 {
            let ip_version: u16 = if self.v6 { 6 } else { 4 };
            buf[16..18].copy_from_slice(&ip_version.to_le_bytes());
            buf[18..20].copy_from_slice(&4u16.to_le_bytes());
        }

        buf
    }

    /// Build and write the fixture to `dir/name`.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.build()).expect("write fixture");
        path
    }
}

/// Small IPv4 database used across tests.
pub fn sample_v4() -> XdbFixture {
    XdbFixture::v4()
        .range("0.0.0.0", "0.255.255.255", "0|0|Reserved|0|0")
        .range("1.0.0.0", "1.0.0.255", "CN|Zhejiang|Hangzhou|ISP-A")
        .range("1.0.1.0", "1.0.3.255", "CN|Fujian|Fuzhou|Telecom")
        .range("8.8.8.0", "8.8.8.255", "US|California|Mountain View|Google")
        .range("114.114.114.0", "114.114.114.255", "CN|Jiangsu|Nanjing|114DNS")
        .range("120.229.0.0", "120.229.255.255", "CN|Guangdong|Shenzhen|Mobile")
        .range("223.0.0.0", "223.255.255.255", "CN|Zhejiang|Hangzhou|Alibaba")
}

/// Small IPv6 database used across tests.
pub fn sample_v6() -> XdbFixture {
    XdbFixture::v6()
        .range("2001:db8::", "2001:db8::ffff", "ZZ|Documentation|0|0")
        .range("240e::", "240e:ffff:ffff:ffff:ffff:ffff:ffff:ffff", "CN|0|0|Telecom")
        .range(
            "2604:bc80:8001::",
            "2604:bc80:8001:ffff:ffff:ffff:ffff:ffff",
            "US|New York|Buffalo|ColoCrossing",
        )
}
