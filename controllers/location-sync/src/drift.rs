//! Location drift detection for a single workload.
//!
//! Pure: given the indices built for the run it decides whether a workload's
//! `loc` label disagrees with the location of the subnet its primary address
//! falls in. It never creates a missing label and never touches workloads
//! outside every known subnet.

use crate::error::WorkloadError;
use crate::label_catalog::LabelCatalog;
use crate::subnet_index::{parse_address, SubnetIndex};
use pce_client::Workload;
use std::net::IpAddr;

/// Label key carrying the location classification
pub const LOCATION_KEY: &str = "loc";

/// Why a workload was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChangeReason {
    /// Address is outside every subnet of the reference list
    Unmapped,
    /// Workload has no `loc` label
    NoLocationLabel,
    /// Label already matches the subnet's location
    InSync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionKind {
    NoChange(NoChangeReason),
    Correct { old_value: String, new_value: String },
}

/// Outcome of evaluating one workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<'a> {
    pub workload: &'a Workload,
    pub address: IpAddr,
    pub kind: DecisionKind,
}

impl Decision<'_> {
    /// `(old, new)` location when this decision is a correction
    pub fn correction(&self) -> Option<(&str, &str)> {
        match &self.kind {
            DecisionKind::Correct { old_value, new_value } => Some((old_value, new_value)),
            DecisionKind::NoChange(_) => None,
        }
    }
}

/// Evaluates workloads against one run's subnet index and label catalog
#[derive(Debug, Clone, Copy)]
pub struct DriftDetector<'a> {
    subnets: &'a SubnetIndex,
    labels: &'a LabelCatalog,
}

impl<'a> DriftDetector<'a> {
    pub fn new(subnets: &'a SubnetIndex, labels: &'a LabelCatalog) -> Self {
        Self { subnets, labels }
    }

    /// Decide what, if anything, should change for `workload`.
    ///
    /// Only the first interface is considered. If several labels resolve to
    /// `loc`, the first one in the workload's label order is compared.
    pub fn evaluate<'w>(&self, workload: &'w Workload) -> Result<Decision<'w>, WorkloadError> {
        let address = primary_address(workload)?;

        let no_change = |reason| Decision {
            workload,
            address,
            kind: DecisionKind::NoChange(reason),
        };

        let Some(location) = self.subnets.locate(address) else {
            return Ok(no_change(NoChangeReason::Unmapped));
        };

        let Some(current) = workload
            .labels
            .iter()
            .find(|l| self.labels.key_of(l) == LOCATION_KEY)
        else {
            return Ok(no_change(NoChangeReason::NoLocationLabel));
        };

        let current_value = self.labels.value_of(current);
        if current_value == location {
            return Ok(no_change(NoChangeReason::InSync));
        }

        Ok(Decision {
            workload,
            address,
            kind: DecisionKind::Correct {
                old_value: current_value.to_string(),
                new_value: location.to_string(),
            },
        })
    }
}

fn primary_address(workload: &Workload) -> Result<IpAddr, WorkloadError> {
    let address_error = |address: &str, reason: String| WorkloadError::Address {
        workload: workload.href.clone(),
        hostname: workload.display_name().to_string(),
        address: address.to_string(),
        reason,
    };

    let raw = workload
        .primary_address()
        .ok_or_else(|| address_error("", "workload has no network interfaces".to_string()))?;
    if raw.trim().is_empty() {
        return Err(address_error(raw, "first interface has no address".to_string()));
    }
    parse_address(raw).map_err(|e| address_error(raw, e.to_string()))
}
