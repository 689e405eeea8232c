//! Run configuration.
//!
//! Values come from the process environment, optionally seeded from an
//! `app.env` file (existing environment variables win).

use crate::azure::{DEFAULT_ARM_ENDPOINT, DEFAULT_AUTHORITY_HOST};
use crate::error::{Error, Result};
use crate::models::DEFAULT_ADDRESS_PREFIX;
use crate::reconcile::{FailurePolicy, PeeringNames};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Name of the optional env file read by [`Config::load`].
pub const ENV_FILE: &str = "app.env";

const REQUIRED: [&str; 10] = [
    "TENANT_ID",
    "CLIENT_ID",
    "CLIENT_SECRET",
    "SUBSCRIPTION_ID",
    "REMOTE_SUBSCRIPTION_ID",
    "HUB_RG_NAME",
    "HUB_VNET_NAME",
    "SPOKE_RG_NAME",
    "SPOKE_VNET_NAME",
    "SPOKE_ROUTE_TABLE_NAME",
];

/// Default route settings for the spoke route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    pub route_name: String,
    pub address_prefix: String,
    pub next_hop_ip: String,
    /// Location of the route table; read from the spoke vnet when unset.
    pub location: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Hub subscription.
    pub subscription_id: String,
    /// Spoke subscription.
    pub remote_subscription_id: String,
    pub hub_rg_name: String,
    pub hub_vnet_name: String,
    pub spoke_rg_name: String,
    pub spoke_vnet_name: String,
    pub spoke_route_table_name: String,
    pub peering_names: PeeringNames,
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub arm_endpoint: String,
    pub authority_host: String,
    /// Route reconciliation is skipped when `None`.
    pub route: Option<RouteSettings>,
    pub preflight: bool,
}

impl Config {
    /// Read `<dir>/app.env` if present, then the environment.
    pub fn load(dir: &Path) -> Result<Config> {
        let env_file = dir.join(ENV_FILE);
        match dotenv::from_path(&env_file) {
            Ok(()) => log::info!("loaded {}", env_file.display()),
            Err(e) => log::debug!("no env file {}: {e}", env_file.display()),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing required keys are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|&key| value(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required setting(s): {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| value(key).unwrap_or_default();
        let or_default = |key: &str, default: &str| value(key).unwrap_or_else(|| default.to_string());

        let secs = |key: &str, default: u64| -> Result<Duration> {
            match value(key) {
                None => Ok(Duration::from_secs(default)),
                Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    Error::Config(format!("{key} must be a number of seconds, got '{v}': {e}"))
                }),
            }
        };

        let failure_policy = match value("FAILURE_POLICY") {
            Some(v) => v.parse()?,
            None => FailurePolicy::default(),
        };
        let preflight = match value("PREFLIGHT").as_deref() {
            None => false,
            Some(v) => parse_bool("PREFLIGHT", v)?,
        };
        let route = value("SPOKE_ROUTE_NEXT_HOP_IP").map(|next_hop_ip| RouteSettings {
            route_name: or_default("SPOKE_ROUTE_NAME", "def-route"),
            address_prefix: or_default("SPOKE_ROUTE_ADDRESS_PREFIX", DEFAULT_ADDRESS_PREFIX),
            next_hop_ip,
            location: value("SPOKE_LOCATION"),
        });
        let defaults = PeeringNames::default();

        Ok(Config {
            tenant_id: required("TENANT_ID"),
            client_id: required("CLIENT_ID"),
            client_secret: lookup("CLIENT_SECRET").unwrap_or_default(),
            subscription_id: required("SUBSCRIPTION_ID"),
            remote_subscription_id: required("REMOTE_SUBSCRIPTION_ID"),
            hub_rg_name: required("HUB_RG_NAME"),
            hub_vnet_name: required("HUB_VNET_NAME"),
            spoke_rg_name: required("SPOKE_RG_NAME"),
            spoke_vnet_name: required("SPOKE_VNET_NAME"),
            spoke_route_table_name: required("SPOKE_ROUTE_TABLE_NAME"),
            peering_names: PeeringNames {
                hub_to_spoke: or_default("HUB_TO_SPOKE_PEERING_NAME", &defaults.hub_to_spoke),
                spoke_to_hub: or_default("SPOKE_TO_HUB_PEERING_NAME", &defaults.spoke_to_hub),
            },
            poll_interval: secs("POLL_INTERVAL_SECS", 10)?,
            operation_timeout: secs("OPERATION_TIMEOUT_SECS", 1800)?,
            failure_policy,
            arm_endpoint: or_default("ARM_ENDPOINT", DEFAULT_ARM_ENDPOINT),
            authority_host: or_default("AUTHORITY_HOST", DEFAULT_AUTHORITY_HOST),
            route,
            preflight,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::Config(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("remote_subscription_id", &self.remote_subscription_id)
            .field("hub", &(&self.hub_rg_name, &self.hub_vnet_name))
            .field("spoke", &(&self.spoke_rg_name, &self.spoke_vnet_name))
            .field("spoke_route_table_name", &self.spoke_route_table_name)
            .field("peering_names", &self.peering_names)
            .field("poll_interval", &self.poll_interval)
            .field("operation_timeout", &self.operation_timeout)
            .field("failure_policy", &self.failure_policy)
            .field("arm_endpoint", &self.arm_endpoint)
            .field("route", &self.route)
            .field("preflight", &self.preflight)
            .finish()
    }
}
