//! Command-line and environment configuration.

use crate::error::SyncError;
use crate::reconciler::ReconcileOptions;
use clap::Parser;
use pce_client::PceConfig;

/// Default name of the IP list mapping subnets to locations
pub const DEFAULT_IP_LIST: &str = "LocationMap";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "location-sync",
    version,
    about = "Sets each workload's loc label from the PCE IP list mapping subnets to locations"
)]
pub struct Config {
    /// The fully qualified domain name of the PCE
    #[arg(long, env = "PCE_FQDN")]
    pub fqdn: String,

    /// The port of the PCE
    #[arg(long, env = "PCE_PORT", default_value_t = 8443)]
    pub port: u16,

    /// API user or email address
    #[arg(long, env = "PCE_USER")]
    pub user: String,

    /// API key if using an API user, password if using an email address
    #[arg(long, env = "PCE_PWD", hide_env_values = true)]
    pub pwd: String,

    /// Org id (API keys only; email logins use the org of the session)
    #[arg(long, env = "PCE_ORG", default_value_t = 1)]
    pub org: u64,

    /// IP list name to use as a reference
    #[arg(long, env = "LOCATION_IPL", default_value = DEFAULT_IP_LIST)]
    pub ipl: String,

    /// Disable TLS checking
    #[arg(short = 'x', long = "insecure")]
    pub disable_tls: bool,

    /// Report corrections without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum number of workload updates in flight
    #[arg(long, env = "LOCATION_SYNC_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Reject values clap accepts but the run cannot use
    pub fn validate(&self) -> Result<(), SyncError> {
        for (name, value) in [
            ("fqdn", &self.fqdn),
            ("user", &self.user),
            ("pwd", &self.pwd),
            ("ipl", &self.ipl),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::InvalidConfig(format!("--{} must not be empty", name)));
            }
        }
        if self.concurrency == 0 {
            return Err(SyncError::InvalidConfig("--concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn pce_config(&self) -> PceConfig {
        PceConfig {
            fqdn: self.fqdn.trim().to_string(),
            port: self.port,
            user: self.user.clone(),
            secret: self.pwd.clone(),
            org_id: self.org,
            insecure: self.disable_tls,
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: self.dry_run,
            concurrency: self.concurrency,
        }
    }
}
