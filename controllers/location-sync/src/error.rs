//! Error types for location-sync.
//!
//! `SyncError` aborts a run; `WorkloadError` is recorded against one workload
//! in the run report and processing continues.

use pce_client::PceError;
use serde::Serialize;
use thiserror::Error;

/// Errors that make the whole run untrustworthy.
#[derive(Debug, Error)]
pub enum SyncError {
    /// One of the bulk fetches failed
    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: PceError,
    },

    /// The reference IP list holds an entry that is not valid CIDR notation
    #[error("IP list {list} entry {index} ({range:?}) is not a valid CIDR block: {reason}")]
    SubnetParse {
        list: String,
        index: usize,
        range: String,
        reason: String,
    },

    /// Connecting or logging in to the PCE failed
    #[error("PCE error: {0}")]
    Client(#[from] PceError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report could not be written
    #[error("Failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Per-workload problems, recorded in the run report.
///
/// `Address` means no decision could be made; `Apply` means a correction was
/// decided but the PCE rejected it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkloadError {
    /// Primary address missing or not an IP literal
    #[error("Workload {hostname} ({workload}): unusable primary address {address:?}: {reason}")]
    Address {
        workload: String,
        hostname: String,
        address: String,
        reason: String,
    },

    /// The corrective update call failed
    #[error("Workload {hostname} ({workload}): failed to set location {new_value}: {message}")]
    Apply {
        workload: String,
        hostname: String,
        new_value: String,
        message: String,
    },
}
