//! Application Sync Controller Library
//!
//! Reconciles the applications registered in a directory service (API
//! definitions, credentials, request parameters and documentation) into
//! runtime `Application` resources and their secrets.
//!
//! ## Module Structure
//!
//! - `model` - desired-state types as delivered by the directory
//! - `crd` - runtime `Application` custom resource
//! - `provider` - store traits with Kubernetes and in-memory implementations
//! - `controller` - converter, diff engine and reconciliation orchestrator
//! - `config` - environment-based configuration
//! - `observability` - metrics and logging
//! - `server` - metrics and probe endpoints

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod model;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod server;
