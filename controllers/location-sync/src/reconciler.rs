//! Reconciliation pass for workload location labels.
//!
//! One pass:
//! 1. Fetches the reference IP list, every label and every workload. Any
//!    failure here aborts the run before anything is changed.
//! 2. Builds the subnet index and label catalog.
//! 3. Runs every workload, in fetch order, through drift detection.
//! 4. Resolves each distinct target label once, creating it if needed, then
//!    applies each correction with its own update call. A failed update is
//!    recorded and the pass moves on to the next workload.

use crate::drift::{Decision, DriftDetector, LOCATION_KEY};
use crate::error::{SyncError, WorkloadError};
use crate::label_catalog::LabelCatalog;
use crate::report::{Correction, RunReport};
use crate::subnet_index::SubnetIndex;
use futures::stream::{self, StreamExt};
use pce_client::{Label, PceClientTrait};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Knobs for a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Decide and report corrections without submitting them
    pub dry_run: bool,
    /// Maximum number of update calls in flight
    pub concurrency: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 1,
        }
    }
}

/// Report entry for a decision that carries a correction
fn correction(decision: &Decision<'_>, applied: bool) -> Option<Correction> {
    let (old_value, new_value) = decision.correction()?;
    Some(Correction {
        workload: decision.workload.href.clone(),
        hostname: decision.workload.display_name().to_string(),
        address: decision.address.to_string(),
        old_value: old_value.to_string(),
        new_value: new_value.to_string(),
        applied,
    })
}

/// Reconciles location labels through a PCE client.
pub struct Reconciler {
    pub(crate) pce_client: Box<dyn PceClientTrait + Send + Sync>,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        pce_client: impl PceClientTrait + Send + Sync + 'static,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            pce_client: Box::new(pce_client),
            options,
        }
    }

    /// Run one full pass against the IP list named `reference_list`.
    ///
    /// Returns `Err` only for failures that leave nothing to reconcile against;
    /// per-workload problems end up in the report.
    pub async fn reconcile(&self, reference_list: &str) -> Result<RunReport, SyncError> {
        info!(
            "Reconciling workload locations against IP list {} (org {})",
            reference_list,
            self.pce_client.org_id()
        );
        let mut report = RunReport::new(reference_list, self.options.dry_run);

        let ip_list = self
            .pce_client
            .get_ip_list(reference_list)
            .await
            .map_err(|source| SyncError::Fetch {
                what: format!("IP list {}", reference_list),
                source,
            })?;
        let labels = self
            .pce_client
            .get_all_labels()
            .await
            .map_err(|source| SyncError::Fetch {
                what: "labels".to_string(),
                source,
            })?;
        let workloads = self
            .pce_client
            .get_all_workloads()
            .await
            .map_err(|source| SyncError::Fetch {
                what: "workloads".to_string(),
                source,
            })?;

        let subnets = SubnetIndex::from_ip_list(&ip_list)?;
        let catalog = LabelCatalog::new(&labels);
        if subnets.is_empty() {
            warn!("IP list {} contains no subnets; nothing will be corrected", reference_list);
        }
        debug!(
            "Loaded {} subnets, {} labels, {} workloads",
            subnets.len(),
            catalog.len(),
            workloads.len()
        );

        let detector = DriftDetector::new(&subnets, &catalog);
        let mut pending: Vec<Decision<'_>> = Vec::new();

        for workload in &workloads {
            report.evaluated += 1;
            match detector.evaluate(workload) {
                Ok(decision) if decision.correction().is_some() => pending.push(decision),
                Ok(decision) => {
                    debug!(
                        "{} ({}): {:?}",
                        workload.display_name(),
                        decision.address,
                        decision.kind
                    );
                }
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e);
                }
            }
        }

        if self.options.dry_run {
            for decision in &pending {
                if let Some(planned) = correction(decision, false) {
                    info!(
                        "Would update the location of {} with IP address {} from {} to {}",
                        planned.hostname, planned.address, planned.old_value, planned.new_value
                    );
                    report.corrections.push(planned);
                }
            }
            return Ok(report);
        }

        // Each target label is resolved once, before any update runs
        let mut targets: HashMap<&str, Result<Label, String>> = HashMap::new();
        for (_, new_value) in pending.iter().filter_map(Decision::correction) {
            if targets.contains_key(new_value) {
                continue;
            }
            let target = self
                .pce_client
                .ensure_label(LOCATION_KEY, new_value)
                .await
                .map_err(|e| {
                    error!("Failed to resolve label {}={}: {}", LOCATION_KEY, new_value, e);
                    e.to_string()
                });
            targets.insert(new_value, target);
        }

        let planned: Vec<(&Decision<'_>, Result<Label, String>)> = pending
            .iter()
            .filter_map(|decision| {
                let (_, new_value) = decision.correction()?;
                Some((decision, targets.get(new_value)?.clone()))
            })
            .collect();

        let results: Vec<_> = stream::iter(planned)
            .map(|(decision, target)| async move {
                let result = match target {
                    Ok(label) => self
                        .pce_client
                        .set_workload_label(decision.workload, &label)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(message) => Err(message),
                };
                (decision, result)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        for (decision, result) in results {
            let workload = decision.workload;
            let Some((old_value, new_value)) = decision.correction() else {
                continue;
            };
            match result {
                Ok(_) => {
                    info!(
                        "Updated the location of {} with IP address {} from {} to {}",
                        workload.display_name(),
                        decision.address,
                        old_value,
                        new_value
                    );
                    report.corrections.extend(correction(decision, true));
                }
                Err(message) => {
                    error!(
                        "Failed to update the location of {} to {}: {}",
                        workload.display_name(),
                        new_value,
                        message
                    );
                    report.errors.push(WorkloadError::Apply {
                        workload: workload.href.clone(),
                        hostname: workload.display_name().to_string(),
                        new_value: new_value.to_string(),
                        message,
                    });
                }
            }
        }

        Ok(report)
    }
}
