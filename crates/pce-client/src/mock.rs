//! Mock PceClient for unit testing
//!
//! Stores IP lists, labels and workloads in memory and applies label updates
//! the way the PCE does. Fetch, label creation and update failures can be
//! injected to exercise error paths without a running PCE. Creating a label
//! that already exists is rejected, as the PCE does.

use crate::common::{find_label, substitute_label};
use crate::error::PceError;
use crate::models::*;
use crate::pce_trait::PceClientTrait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock PceClient for testing
#[derive(Debug, Clone)]
pub struct MockPceClient {
    base_url: String,
    ip_lists: Arc<Mutex<Vec<IpList>>>,
    labels: Arc<Mutex<Vec<Label>>>,
    workloads: Arc<Mutex<Vec<Workload>>>,
    failing_updates: Arc<Mutex<HashSet<String>>>,
    failing_fetches: Arc<Mutex<HashSet<&'static str>>>,
    failing_labels: Arc<Mutex<HashSet<String>>>,
    label_creations: Arc<Mutex<usize>>,
    update_calls: Arc<Mutex<Vec<(String, String, String)>>>,
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPceClient {
    /// Fetch name for `get_ip_list`, see [`MockPceClient::fail_fetch`]
    pub const FETCH_IP_LIST: &'static str = "ip_list";
    /// Fetch name for `get_all_labels`
    pub const FETCH_LABELS: &'static str = "labels";
    /// Fetch name for `get_all_workloads`
    pub const FETCH_WORKLOADS: &'static str = "workloads";

    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ip_lists: Arc::new(Mutex::new(Vec::new())),
            labels: Arc::new(Mutex::new(Vec::new())),
            workloads: Arc::new(Mutex::new(Vec::new())),
            failing_updates: Arc::new(Mutex::new(HashSet::new())),
            failing_fetches: Arc::new(Mutex::new(HashSet::new())),
            failing_labels: Arc::new(Mutex::new(HashSet::new())),
            label_creations: Arc::new(Mutex::new(0)),
            update_calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1000)),
        }
    }

    /// Add an IP list built from `(cidr, location)` pairs
    pub fn add_ip_list(&self, name: &str, ranges: &[(&str, &str)]) {
        let list = IpList {
            href: format!("/orgs/1/sec_policy/active/ip_lists/{}", self.next_id()),
            name: name.to_string(),
            description: None,
            ip_ranges: ranges
                .iter()
                .map(|(cidr, loc)| IpRange {
                    from_ip: cidr.to_string(),
                    to_ip: None,
                    description: loc.to_string(),
                    exclusion: false,
                })
                .collect(),
        };
        lock(&self.ip_lists).push(list);
    }

    /// Add a label and return its reference
    pub fn add_label(&self, key: &str, value: &str) -> LabelRef {
        let href = format!("/orgs/1/labels/{}", self.next_id());
        lock(&self.labels).push(Label {
            href: href.clone(),
            key: key.to_string(),
            value: value.to_string(),
        });
        LabelRef::new(href)
    }

    /// Add a workload with one interface at `address`
    pub fn add_workload(&self, hostname: &str, address: &str, labels: Vec<LabelRef>) -> String {
        let href = format!("/orgs/1/workloads/{}", hostname);
        lock(&self.workloads).push(Workload {
            href: href.clone(),
            hostname: hostname.to_string(),
            name: None,
            interfaces: vec![Interface {
                name: "eth0".to_string(),
                address: address.to_string(),
            }],
            labels,
        });
        href
    }

    /// Add a fully specified workload
    pub fn add_raw_workload(&self, workload: Workload) {
        lock(&self.workloads).push(workload);
    }

    /// Make every update of this workload fail
    pub fn fail_updates_for(&self, href: &str) {
        lock(&self.failing_updates).insert(href.to_string());
    }

    /// Make one of the bulk fetches fail (`FETCH_*` constants)
    pub fn fail_fetch(&self, fetch: &'static str) {
        lock(&self.failing_fetches).insert(fetch);
    }

    /// Make creating a label with this value fail
    pub fn fail_label_creation(&self, value: &str) {
        lock(&self.failing_labels).insert(value.to_string());
    }

    /// Number of labels created through `ensure_label`
    pub fn label_creations(&self) -> usize {
        *lock(&self.label_creations)
    }

    /// Stored copy of a workload
    pub fn workload(&self, href: &str) -> Option<Workload> {
        lock(&self.workloads).iter().find(|w| w.href == href).cloned()
    }

    /// Resolved value of the workload's label with key `key`
    pub fn label_value(&self, href: &str, key: &str) -> Option<String> {
        let workload = self.workload(href)?;
        let labels = lock(&self.labels);
        workload.labels.iter().find_map(|r| {
            labels
                .iter()
                .find(|l| l.href == r.href && l.key == key)
                .map(|l| l.value.clone())
        })
    }

    /// `(workload href, key, value)` of every label set attempted so far
    pub fn update_calls(&self) -> Vec<(String, String, String)> {
        lock(&self.update_calls).clone()
    }

    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }

    fn check_fetch(&self, fetch: &'static str) -> Result<(), PceError> {
        if lock(&self.failing_fetches).contains(fetch) {
            return Err(PceError::Api(format!("GET {} failed: 503 Service Unavailable", fetch)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PceClientTrait for MockPceClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn org_id(&self) -> u64 {
        1
    }

    async fn get_ip_list(&self, name: &str) -> Result<IpList, PceError> {
        self.check_fetch(Self::FETCH_IP_LIST)?;
        lock(&self.ip_lists)
            .iter()
            .find(|l| l.name == name)
            .cloned()
            .ok_or_else(|| PceError::NotFound(format!("IP list {} not found", name)))
    }

    async fn get_all_labels(&self) -> Result<Vec<Label>, PceError> {
        self.check_fetch(Self::FETCH_LABELS)?;
        Ok(lock(&self.labels).clone())
    }

    async fn get_all_workloads(&self) -> Result<Vec<Workload>, PceError> {
        self.check_fetch(Self::FETCH_WORKLOADS)?;
        Ok(lock(&self.workloads).clone())
    }

    async fn ensure_label(&self, key: &str, value: &str) -> Result<Label, PceError> {
        let existing = find_label(&lock(&self.labels), key, value).cloned();
        if let Some(label) = existing {
            return Ok(label);
        }
        let failing = lock(&self.failing_labels).contains(value);
        if failing {
            return Err(PceError::Api(format!(
                "POST /orgs/1/labels failed: 500 Internal Server Error - {}={}",
                key, value
            )));
        }

        // The PCE answers the lookup and the create as separate requests
        tokio::task::yield_now().await;

        let mut labels = lock(&self.labels);
        if find_label(&labels, key, value).is_some() {
            return Err(PceError::Api(format!(
                "POST /orgs/1/labels failed: 406 Not Acceptable - label {}={} already exists",
                key, value
            )));
        }
        let label = Label {
            href: format!("/orgs/1/labels/{}", self.next_id()),
            key: key.to_string(),
            value: value.to_string(),
        };
        labels.push(label.clone());
        *lock(&self.label_creations) += 1;
        Ok(label)
    }

    async fn set_workload_label(
        &self,
        workload: &Workload,
        label: &Label,
    ) -> Result<Workload, PceError> {
        lock(&self.update_calls).push((
            workload.href.clone(),
            label.key.clone(),
            label.value.clone(),
        ));

        if lock(&self.failing_updates).contains(&workload.href) {
            return Err(PceError::Api(format!(
                "PUT {} failed: 406 Not Acceptable",
                workload.href
            )));
        }

        let keys: HashMap<String, String> = lock(&self.labels)
            .iter()
            .map(|l| (l.href.clone(), l.key.clone()))
            .collect();
        let replacement = LabelRef::new(&label.href);
        let labels = substitute_label(&workload.labels, &label.key, &replacement, |l| {
            keys.get(&l.href).map(String::as_str)
        });

        let mut workloads = lock(&self.workloads);
        let stored = workloads
            .iter_mut()
            .find(|w| w.href == workload.href)
            .ok_or_else(|| PceError::NotFound(format!("Workload {} not found", workload.href)))?;
        stored.labels = labels;
        Ok(stored.clone())
    }
}
