//! PCE API client
//!
//! Implements the subset of the Illumio PCE REST API (`/api/v2`) needed to keep
//! workload location labels in sync: IP lists, labels and workloads.

use crate::common::query::org_id_from_href;
use crate::common::{find_label, substitute_label, Credentials, HttpClient};
use crate::error::PceError;
use crate::models::*;
use crate::pce_trait::PceClientTrait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for a PCE
#[derive(Debug, Clone)]
pub struct PceConfig {
    /// Fully qualified domain name of the PCE
    pub fqdn: String,
    /// HTTPS port (8443 on most on-prem installs)
    pub port: u16,
    /// API key username (`api_...`) or login email address
    pub user: String,
    /// API key secret or login password
    pub secret: String,
    /// Org id used with API keys; session logins take it from the login response
    pub org_id: u64,
    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl PceConfig {
    /// API root for this PCE, e.g. `https://pce.example.com:8443/api/v2`
    pub fn api_url(&self) -> String {
        format!("https://{}:{}/api/v2", self.fqdn, self.port)
    }

    /// API key usernames are prefixed `api_`; anything else is a login user
    pub fn is_api_key(&self) -> bool {
        self.user.starts_with("api_")
    }
}

/// PCE API client
#[derive(Debug, Clone)]
pub struct PceClient {
    http: HttpClient,
    org_id: u64,
}

impl PceClient {
    /// Create a client that authenticates with an API key
    ///
    /// # Arguments
    /// * `config` - connection settings; `user`/`secret` are the API key pair
    pub fn new(config: &PceConfig) -> Result<Self, PceError> {
        let client = Self::http_client(config)?;
        let credentials = Credentials {
            username: config.user.clone(),
            secret: config.secret.clone(),
        };

        Ok(Self {
            http: HttpClient::new(client, config.api_url(), credentials),
            org_id: config.org_id,
        })
    }

    /// Build a client for `config`, logging in first when the user is not an API key.
    ///
    /// Session login authenticates with the user's password, exchanges the
    /// returned auth token for a session token and takes the org id from the
    /// first org the user belongs to.
    pub async fn connect(config: &PceConfig) -> Result<Self, PceError> {
        if config.is_api_key() {
            debug!("Using API key {} for PCE {}", config.user, config.fqdn);
            return Self::new(config);
        }

        let client = Self::http_client(config)?;
        let api_url = config.api_url();

        info!("Logging in to PCE {} as {}", config.fqdn, config.user);
        let url = format!(
            "{}/login_users/authenticate?pce_fqdn={}",
            api_url,
            urlencoding::encode(&config.fqdn)
        );
        let response = client
            .post(&url)
            .basic_auth(&config.user, Some(&config.secret))
            .header("Accept", "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PceError::Authentication(format!(
                "Failed to authenticate {}: {} - {}",
                config.user, status, body
            )));
        }
        let auth: AuthenticateResponse = response.json().await?;

        let response = client
            .get(format!("{}/users/login", api_url))
            .header("Authorization", format!("Token token={}", auth.auth_token))
            .header("Accept", "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PceError::Authentication(format!(
                "Failed to open session for {}: {} - {}",
                config.user, status, body
            )));
        }
        let login: LoginResponse = response.json().await?;

        let org_id = login
            .orgs
            .first()
            .and_then(|org| org_id_from_href(&org.href))
            .ok_or_else(|| {
                PceError::Authentication(format!("User {} is not a member of any org", config.user))
            })?;
        debug!("Session opened for {} in org {}", login.auth_username, org_id);

        let credentials = Credentials {
            username: login.auth_username,
            secret: login.session_token,
        };
        Ok(Self {
            http: HttpClient::new(client, api_url, credentials),
            org_id,
        })
    }

    fn http_client(config: &PceConfig) -> Result<Client, PceError> {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(PceError::Http)
    }

    fn org_path(&self, path: &str) -> String {
        format!("/orgs/{}/{}", self.org_id, path)
    }

    /// Query IP lists in one policy version (`active` or `draft`) by name
    async fn query_ip_lists(&self, version: &str, name: &str) -> Result<Vec<IpList>, PceError> {
        let path = self.org_path(&format!("sec_policy/{}/ip_lists", version));
        self.http.get(&path, &[("name", name)]).await
    }

    /// Query labels with the given key
    async fn query_labels(&self, key: &str) -> Result<Vec<Label>, PceError> {
        self.http.get(&self.org_path("labels"), &[("key", key)]).await
    }
}

#[async_trait::async_trait]
impl PceClientTrait for PceClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn org_id(&self) -> u64 {
        self.org_id
    }

    async fn get_ip_list(&self, name: &str) -> Result<IpList, PceError> {
        for version in ["active", "draft"] {
            debug!("Looking up IP list {} in {} policy", name, version);
            // The name filter is a partial match
            let found = self
                .query_ip_lists(version, name)
                .await?
                .into_iter()
                .find(|list| list.name == name);
            if let Some(list) = found {
                return Ok(list);
            }
        }
        Err(PceError::NotFound(format!("IP list {} not found", name)))
    }

    async fn get_all_labels(&self) -> Result<Vec<Label>, PceError> {
        debug!("Fetching all labels");
        self.http.get(&self.org_path("labels"), &[]).await
    }

    async fn get_all_workloads(&self) -> Result<Vec<Workload>, PceError> {
        debug!("Fetching all workloads");
        self.http.get(&self.org_path("workloads"), &[]).await
    }

    async fn ensure_label(&self, key: &str, value: &str) -> Result<Label, PceError> {
        // The key filter is a partial match
        let existing = self.query_labels(key).await?;
        if let Some(label) = find_label(&existing, key, value) {
            return Ok(label.clone());
        }

        info!("Creating label {}={} in PCE", key, value);
        self.http
            .post(&self.org_path("labels"), &CreateLabelRequest { key, value })
            .await
    }

    async fn set_workload_label(
        &self,
        workload: &Workload,
        label: &Label,
    ) -> Result<Workload, PceError> {
        if workload.href.is_empty() {
            return Err(PceError::InvalidRequest(format!(
                "Workload {} has no href",
                workload.display_name()
            )));
        }

        let key = label.key.as_str();
        let same_key = self.query_labels(key).await?;
        let same_key_hrefs: HashSet<&str> = same_key
            .iter()
            .filter(|l| l.key == key)
            .map(|l| l.href.as_str())
            .collect();
        let labels = substitute_label(&workload.labels, key, &LabelRef::new(&label.href), |l| {
            same_key_hrefs.contains(l.href.as_str()).then_some(key)
        });

        self.http
            .put(&workload.href, &WorkloadLabelsUpdate { labels: &labels })
            .await?;

        Ok(Workload {
            labels,
            ..workload.clone()
        })
    }
}
