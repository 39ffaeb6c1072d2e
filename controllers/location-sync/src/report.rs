//! Outcome of one reconciliation pass.

use crate::error::WorkloadError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// A location label that was (or, in dry-run mode, would be) rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correction {
    pub workload: String,
    pub hostname: String,
    pub address: String,
    pub old_value: String,
    pub new_value: String,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub reference_list: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Workloads fetched and run through drift detection
    pub evaluated: usize,
    pub corrections: Vec<Correction>,
    pub errors: Vec<WorkloadError>,
}

impl RunReport {
    pub fn new(reference_list: impl Into<String>, dry_run: bool) -> Self {
        Self {
            reference_list: reference_list.into(),
            started_at: Utc::now(),
            dry_run,
            evaluated: 0,
            corrections: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Number of corrections actually applied to the PCE
    pub fn corrected(&self) -> usize {
        self.corrections.iter().filter(|c| c.applied).count()
    }

    pub fn address_errors(&self) -> impl Iterator<Item = &WorkloadError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, WorkloadError::Address { .. }))
    }

    pub fn apply_errors(&self) -> impl Iterator<Item = &WorkloadError> {
        self.errors
            .iter()
            .filter(|e| matches!(e, WorkloadError::Apply { .. }))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Log the summary line and every problem workload
    pub fn log_summary(&self) {
        if self.dry_run {
            info!(
                "Dry run against {}: {} workloads evaluated, {} corrections planned, {} errors",
                self.reference_list,
                self.evaluated,
                self.corrections.len(),
                self.errors.len()
            );
        } else {
            info!(
                "Reconciled against {}: {} workloads evaluated, {} corrected, {} errors",
                self.reference_list,
                self.evaluated,
                self.corrected(),
                self.errors.len()
            );
        }

        for error in self.address_errors() {
            warn!("Could not evaluate: {}", error);
        }
        for error in self.apply_errors() {
            warn!("Could not apply: {}", error);
        }
    }
}
