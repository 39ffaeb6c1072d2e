//! PceClient trait for mocking
//!
//! This trait abstracts the PceClient so the reconciler can be unit tested.
//! The concrete PceClient implements this trait, and tests use `MockPceClient`.

use crate::error::PceError;
use crate::models::*;

/// Trait for PCE API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PceClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Organization the client operates on
    fn org_id(&self) -> u64;

    /// Fetch the IP list with exactly this name.
    ///
    /// Active policy is consulted first, then draft. Returns `PceError::NotFound`
    /// when neither version holds a list with that name.
    async fn get_ip_list(&self, name: &str) -> Result<IpList, PceError>;

    /// Fetch every label definition
    async fn get_all_labels(&self) -> Result<Vec<Label>, PceError>;

    /// Fetch every workload
    async fn get_all_workloads(&self) -> Result<Vec<Workload>, PceError>;

    /// Return the label `(key, value)`, creating it when the PCE has none.
    ///
    /// Lookup and creation are separate requests, so callers must not run two
    /// calls for the same pair concurrently: the second creation is rejected.
    async fn ensure_label(&self, key: &str, value: &str) -> Result<Label, PceError>;

    /// Replace the workload's label with the key of `label` by `label`.
    ///
    /// The full label set is submitted in one request, and the corrected
    /// workload is returned.
    async fn set_workload_label(
        &self,
        workload: &Workload,
        label: &Label,
    ) -> Result<Workload, PceError>;

    /// Replace the workload's label with key `key` by the label `(key, value)`,
    /// creating that label when it does not exist yet.
    async fn update_workload_label(
        &self,
        workload: &Workload,
        key: &str,
        value: &str,
    ) -> Result<Workload, PceError> {
        let label = self.ensure_label(key, value).await?;
        self.set_workload_label(workload, &label).await
    }
}
