//! Subnet to location index.
//!
//! Built once per run from the reference IP list and never mutated afterwards.
//! Lookups walk the entries in the order the list supplied them and return the
//! first block containing the address. This is first-match, not
//! longest-prefix match: with overlapping blocks the earlier entry wins.

use crate::error::SyncError;
use ipnet::IpNet;
use pce_client::IpList;
use std::net::{AddrParseError, IpAddr};
use std::str::FromStr;
use tracing::debug;

/// One CIDR block and the location it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetEntry {
    pub range: IpNet,
    pub location: String,
}

impl SubnetEntry {
    /// Parse `range` as CIDR notation. Host bits may be set (`10.0.0.5/24`).
    pub fn parse(range: &str, location: impl Into<String>) -> Result<Self, ipnet::AddrParseError> {
        Ok(Self {
            range: IpNet::from_str(range.trim())?,
            location: location.into(),
        })
    }
}

/// Ordered collection of subnet entries
#[derive(Debug, Clone, Default)]
pub struct SubnetIndex {
    entries: Vec<SubnetEntry>,
}

impl SubnetIndex {
    pub fn new(entries: Vec<SubnetEntry>) -> Self {
        Self { entries }
    }

    /// Build the index from a PCE IP list.
    ///
    /// `from_ip` holds the block and `description` the location. Exclusion
    /// entries are skipped. Any entry that is not valid CIDR fails the whole
    /// load, since the list is shared by every workload in the run.
    pub fn from_ip_list(list: &IpList) -> Result<Self, SyncError> {
        let mut entries = Vec::with_capacity(list.ip_ranges.len());

        for (index, range) in list.ip_ranges.iter().enumerate() {
            if range.exclusion {
                debug!("Skipping exclusion {} in IP list {}", range.from_ip, list.name);
                continue;
            }
            let entry = SubnetEntry::parse(&range.from_ip, range.description.trim()).map_err(|e| {
                SyncError::SubnetParse {
                    list: list.name.clone(),
                    index,
                    range: range.from_ip.clone(),
                    reason: e.to_string(),
                }
            })?;
            entries.push(entry);
        }

        debug!("Loaded {} subnets from IP list {}", entries.len(), list.name);
        Ok(Self::new(entries))
    }

    /// Location of the first entry whose block contains `address`
    pub fn locate(&self, address: IpAddr) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.range.contains(&address))
            .map(|entry| entry.location.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a workload address literal.
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.5`) come back as IPv4 so they
/// match the IPv4 blocks of the reference list.
pub fn parse_address(address: &str) -> Result<IpAddr, AddrParseError> {
    IpAddr::from_str(address.trim()).map(|a| a.to_canonical())
}
