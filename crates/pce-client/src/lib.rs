//! Illumio PCE REST API Client
//!
//! A Rust client library for the parts of the PCE REST API that location-sync
//! needs: named IP lists, label definitions and workloads.
//!
//! # Example
//!
//! ```no_run
//! use pce_client::{PceClient, PceClientTrait, PceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PceConfig {
//!     fqdn: "pce.example.com".to_string(),
//!     port: 8443,
//!     user: "api_1a2b3c".to_string(),
//!     secret: "your-api-secret".to_string(),
//!     org_id: 1,
//!     insecure: false,
//! };
//! let client = PceClient::connect(&config).await?;
//!
//! let map = client.get_ip_list("LocationMap").await?;
//! let workloads = client.get_all_workloads().await?;
//! println!("{} ranges, {} workloads", map.ip_ranges.len(), workloads.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod pce_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{PceClient, PceConfig};
pub use common::{Credentials, HttpClient};
pub use error::PceError;
pub use models::*;
pub use pce_trait::PceClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockPceClient;
