//! PCE API models
//!
//! These models match the JSON the PCE returns from `/api/v2/orgs/{org}/...`.
//! Only the fields location-sync reads or writes are modelled; everything else
//! in the payload is ignored on deserialization.

use serde::{Deserialize, Deserializer, Serialize};

/// Decode an explicit JSON `null` the same as a missing field.
///
/// The PCE sends `null` for unset strings, e.g. the hostname of an unmanaged
/// workload or the description of an IP range.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Named IP list (`sec_policy/{active|draft}/ip_lists`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IpList {
    pub href: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_ranges: Vec<IpRange>,
}

/// One entry of an IP list.
///
/// For location maps `from_ip` carries a CIDR block and `description` the
/// location name the block belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IpRange {
    pub from_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclusion: bool,
}

/// Label definition (`/labels`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Label {
    pub href: String,
    pub key: String,
    pub value: String,
}

/// Reference to a label as embedded in a workload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelRef {
    pub href: String,
}

impl LabelRef {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

/// Network interface of a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Interface {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
}

/// Workload (`/workloads`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Workload {
    pub href: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostname: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interfaces: Vec<Interface>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<LabelRef>,
}

impl Workload {
    /// Name shown to operators: hostname, falling back to the friendly name, then the href.
    pub fn display_name(&self) -> &str {
        if !self.hostname.is_empty() {
            &self.hostname
        } else {
            self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.href)
        }
    }

    /// Address of the first configured interface, if any.
    pub fn primary_address(&self) -> Option<&str> {
        self.interfaces.first().map(|i| i.address.as_str())
    }
}

/// Body of `PUT {workload href}` when replacing the label set
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadLabelsUpdate<'a> {
    pub labels: &'a [LabelRef],
}

/// Body of `POST /labels`
#[derive(Debug, Clone, Serialize)]
pub struct CreateLabelRequest<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Response of `POST /login_users/authenticate`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateResponse {
    pub auth_token: String,
}

/// Organization entry returned on session login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginOrg {
    pub href: String,
}

/// Response of `GET /users/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub auth_username: String,
    pub session_token: String,
    #[serde(default)]
    pub orgs: Vec<LoginOrg>,
}
