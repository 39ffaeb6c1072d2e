//! Common utilities for the PCE API client
//!
//! Provides the authenticated HTTP wrapper and helpers shared by the real
//! client and the mock.

pub mod query;

use crate::error::PceError;
use crate::models::{Label, LabelRef};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Username/secret pair sent as HTTP basic auth on every request.
///
/// For API keys this is the key's `api_...` username and secret; after a
/// session login it is the returned `auth_username` and `session_token`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    ///
    /// `base_url` is the API root, e.g. `https://pce.example.com:8443/api/v2`.
    pub fn new(client: Client, base_url: String, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path (hrefs returned by the PCE are org-relative paths)
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.credentials.username, Some(&self.credentials.secret))
            .header("Accept", "application/json")
    }

    /// Map non-success statuses onto `PceError`
    async fn check(
        &self,
        method: &str,
        path: &str,
        response: Response,
    ) -> Result<Response, PceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == 401 || status == 403 {
            return Err(PceError::Authentication(format!(
                "{} {} rejected: {} - {}",
                method, path, status, body
            )));
        }
        if status == 404 {
            return Err(PceError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }
        Err(PceError::Api(format!(
            "{} {} failed: {} - {}",
            method, path, status, body
        )))
    }

    /// Make a GET request with optional query filters
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        filters: &[(&str, &str)],
    ) -> Result<T, PceError> {
        let url = query::with_query(&self.build_url(path), filters);
        debug!("GET {}", url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(PceError::Http)?;
        let response = self.check("GET", path, response).await?;

        if let Some(total) = response
            .headers()
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
        {
            debug!("GET {} reports {} total objects", path, total);
        }

        let text = response.text().await?;
        decode(path, &text)
    }

    /// Make a POST request
    pub async fn post<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PceError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(PceError::Http)?;
        let response = self.check("POST", path, response).await?;

        response.json().await.map_err(PceError::Http)
    }

    /// Make a PUT request; the PCE answers updates with `204 No Content`
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), PceError> {
        let url = self.build_url(path);
        debug!("PUT {} with body: {}", url, serde_json::to_string(body).unwrap_or_default());

        let response = self
            .authorize(self.client.put(&url))
            .json(body)
            .send()
            .await
            .map_err(PceError::Http)?;
        self.check("PUT", path, response).await?;

        Ok(())
    }
}

/// Decode a JSON response body, logging the start of the body when it does not fit `T`
fn decode<T: for<'de> Deserialize<'de>>(path: &str, text: &str) -> Result<T, PceError> {
    serde_json::from_str(text).map_err(|e| {
        debug!(
            "Undecodable response from {}: {} - Response (first 500 chars): {}",
            path,
            e,
            text.chars().take(500).collect::<String>()
        );
        PceError::Serialization(e)
    })
}

/// Compute a workload's label set with every label of key `key` replaced by `replacement`.
///
/// The replacement takes the position of the first label of that key; any
/// further labels of the same key are dropped (a workload carries at most one
/// label per key). `key_of` resolves a reference to its key.
pub fn substitute_label<'a, F>(
    labels: &[LabelRef],
    key: &str,
    replacement: &LabelRef,
    key_of: F,
) -> Vec<LabelRef>
where
    F: Fn(&LabelRef) -> Option<&'a str>,
{
    let mut result = Vec::with_capacity(labels.len());
    let mut replaced = false;

    for label in labels {
        if key_of(label) == Some(key) {
            if !replaced {
                result.push(replacement.clone());
                replaced = true;
            }
        } else {
            result.push(label.clone());
        }
    }

    if !replaced {
        result.push(replacement.clone());
    }
    result
}

/// Find the label with exactly this key and value
pub fn find_label<'a>(labels: &'a [Label], key: &str, value: &str) -> Option<&'a Label> {
    labels.iter().find(|l| l.key == key && l.value == value)
}
