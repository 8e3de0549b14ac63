//! # Reconciler
//!
//! Reconciles runtime `Application` resources towards the desired set of
//! directory applications.
//!
//! The reconciler:
//! - Lists the existing applications and keeps the managed ones
//! - Splits desired against existing into creates, updates and deletes
//! - Publishes documentation and stores credential and request-parameter secrets per package
//! - Writes the `Application` record once its package steps succeeded
//! - Returns one result per processed application
//!
//! ## Reconciliation Flow
//!
//! 1. `repository.list` (the only fatal step)
//! 2. Diff by application name, then by package id for updates
//! 3. Process each application with bounded concurrency
//! 4. Collect results in diff order

mod application;
pub mod apply;
pub mod assets;
pub mod compensation;
pub mod diff;
mod secrets;
pub mod types;

pub use assets::extract_assets;
pub use compensation::{CompensationHook, FailedApplication, LogOnlyCompensation};
pub use diff::{diff_applications, diff_packages, ApplicationDiff, PackageDiff, UpdatePair};
pub use types::{
    ApplicationResult, Operation, PassSummary, Reconciler, ReconcilerError, ReconcilerOptions,
    SideEffect, SyncError,
};
