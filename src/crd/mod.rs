//! # Custom Resource Definitions
//!
//! CRD types for the Application Sync Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Application` resource, its spec and the managed marker
//! - `service.rs` - Services and entries, one service per API package

mod service;
mod spec;

// Re-export all public types
pub use service::{
    EntryCredentials, Service, ServiceEntry, ENTRY_TYPE_API, ENTRY_TYPE_EVENTS,
};
pub use spec::{
    Application, ApplicationSpec, Authentication, DirectoryMetadata, APPLICATION_GROUP,
    MANAGED_BY_LABEL,
};

/// Runtime mirror of a directory application
pub type RuntimeApplication = Application;
