//! Label href to (key, value) lookup, built once per run.

use pce_client::{Label, LabelRef};
use std::collections::HashMap;

/// Resolved key and value of a label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelInfo {
    pub key: String,
    pub value: String,
}

/// Read-only catalog of every label definition in the org
#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    labels: HashMap<String, LabelInfo>,
}

impl LabelCatalog {
    pub fn new(labels: &[Label]) -> Self {
        labels.iter().cloned().collect()
    }

    pub fn get(&self, label: &LabelRef) -> Option<&LabelInfo> {
        self.labels.get(&label.href)
    }

    /// Key of the label; empty when the reference is unknown
    pub fn key_of(&self, label: &LabelRef) -> &str {
        self.get(label).map_or("", |info| info.key.as_str())
    }

    /// Value of the label; empty when the reference is unknown
    pub fn value_of(&self, label: &LabelRef) -> &str {
        self.get(label).map_or("", |info| info.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<Label> for LabelCatalog {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let labels = iter
            .into_iter()
            .map(|l| (l.href, LabelInfo { key: l.key, value: l.value }))
            .collect();
        Self { labels }
    }
}
