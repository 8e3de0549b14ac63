//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default namespace for credential secrets and documentation ConfigMaps
pub const DEFAULT_NAMESPACE: &str = "kyma-integration";

/// Default interval between reconciliation passes (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Minimum interval between reconciliation passes (seconds)
pub const MIN_SYNC_INTERVAL_SECS: u64 = 5;

/// Default number of applications processed concurrently within one pass
pub const DEFAULT_MAX_CONCURRENT_APPLICATIONS: usize = 4;

/// Default path of the desired-state snapshot
pub const DEFAULT_DESIRED_STATE_PATH: &str = "/etc/application-sync/desired.yaml";

/// Value of the managed-by label on every object this controller writes
pub const DEFAULT_MANAGED_BY: &str = "application-sync-controller";

/// Field manager used for server-side apply and create/replace calls
pub const FIELD_MANAGER: &str = "application-sync-controller";

/// Label carrying the owning application name on secrets
pub const APPLICATION_NAME_LABEL: &str = "applicationconnector.sync.io/application";

/// Label carrying the package id on secrets and documentation ConfigMaps
pub const PACKAGE_ID_LABEL: &str = "applicationconnector.sync.io/package-id";

/// Description written when the directory provides none
pub const DEFAULT_APPLICATION_DESCRIPTION: &str = "Description not provided";

/// Secret data keys
pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const CLIENT_ID_KEY: &str = "clientId";
pub const CLIENT_SECRET_KEY: &str = "clientSecret";
pub const HEADERS_KEY: &str = "headers";
pub const QUERY_PARAMETERS_KEY: &str = "queryParameters";

/// ConfigMap key listing the assets of a documentation bundle
pub const ASSETS_INDEX_KEY: &str = "assets.json";
