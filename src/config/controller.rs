//! # Controller Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `POD_NAMESPACE` | `kyma-integration` |
//! | `SYNC_INTERVAL_SECS` | `60` (minimum 5) |
//! | `MAX_CONCURRENT_APPLICATIONS` | `4` (minimum 1) |
//! | `DESIRED_STATE_PATH` | `/etc/application-sync/desired.yaml` |
//! | `METRICS_PORT` | `5000` |
//! | `LOG_LEVEL` | `INFO` |
//! | `LOG_FORMAT` | `json` |
//! | `ENABLE_METRICS` | `true` |
//! | `MANAGED_BY_LABEL_VALUE` | `application-sync-controller` |
//!
//! Unparseable values fall back to the default.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DESIRED_STATE_PATH, DEFAULT_MANAGED_BY, DEFAULT_MAX_CONCURRENT_APPLICATIONS,
    DEFAULT_METRICS_PORT, DEFAULT_NAMESPACE, DEFAULT_SYNC_INTERVAL_SECS, MIN_SYNC_INTERVAL_SECS,
};
use crate::crd::MANAGED_BY_LABEL;
use crate::observability::LogFormat;
use crate::provider::ListFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace for secrets and documentation ConfigMaps
    pub namespace: String,
    pub sync_interval_secs: u64,
    pub max_concurrent_applications: usize,
    pub desired_state_path: PathBuf,
    pub metrics_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub enable_metrics: bool,
    /// Value of `app.kubernetes.io/managed-by` on everything the controller writes
    pub managed_by: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            max_concurrent_applications: DEFAULT_MAX_CONCURRENT_APPLICATIONS,
            desired_state_path: PathBuf::from(DEFAULT_DESIRED_STATE_PATH),
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Json,
            enable_metrics: true,
            managed_by: DEFAULT_MANAGED_BY.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            namespace: var_or_default_str(&lookup, "POD_NAMESPACE", &defaults.namespace),
            sync_interval_secs: var_or_default(
                &lookup,
                "SYNC_INTERVAL_SECS",
                defaults.sync_interval_secs,
            )
            .max(MIN_SYNC_INTERVAL_SECS),
            max_concurrent_applications: var_or_default(
                &lookup,
                "MAX_CONCURRENT_APPLICATIONS",
                defaults.max_concurrent_applications,
            )
            .max(1),
            desired_state_path: lookup("DESIRED_STATE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map_or(defaults.desired_state_path, PathBuf::from),
            metrics_port: var_or_default(&lookup, "METRICS_PORT", defaults.metrics_port),
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", &defaults.log_level),
            log_format: var_or_default(&lookup, "LOG_FORMAT", defaults.log_format),
            enable_metrics: var_or_default_bool(&lookup, "ENABLE_METRICS", defaults.enable_metrics),
            managed_by: var_or_default_str(&lookup, "MANAGED_BY_LABEL_VALUE", &defaults.managed_by),
        }
    }

    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Label selector matching applications written by this controller
    #[must_use]
    pub fn managed_selector(&self) -> ListFilter {
        ListFilter::with_label_selector(format!("{MANAGED_BY_LABEL}={}", self.managed_by))
    }
}

/// Read variable and parse it or return default
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read variable as boolean or return default
fn var_or_default_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read variable as string or return default
fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
