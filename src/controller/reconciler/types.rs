//! # Types
//!
//! Core types for the reconciler.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::constants::DEFAULT_MAX_CONCURRENT_APPLICATIONS;
use crate::controller::converter::Converter;
use crate::controller::reconciler::compensation::{CompensationHook, LogOnlyCompensation};
use crate::provider::{
    ApplicationRepository, AssetPublisher, CredentialsStore, ListFilter, RequestParametersStore,
    StoreError,
};

/// Fatal errors; a pass that returns one produced no results
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Failed to list existing applications: {0}")]
    ListApplications(#[source] StoreError),
}

/// Per-application failure, recorded in its [`ApplicationResult`]
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to create application '{name}': {source}")]
    CreateApplication {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to update application '{name}': {source}")]
    UpdateApplication {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete application '{name}': {source}")]
    DeleteApplication {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read UID of application '{name}': {source}")]
    ReadUid {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("application '{name}' has no UID assigned")]
    MissingUid { name: String },

    #[error("packages '{first}' and '{second}' both map to '{resource_name}'")]
    NameCollision {
        first: String,
        second: String,
        resource_name: String,
    },

    #[error("failed to publish documentation for package '{package_id}': {source}")]
    PublishAssets {
        package_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete documentation for package '{package_id}': {source}")]
    DeleteAssets {
        package_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to upsert credentials for package '{package_id}': {source}")]
    UpsertCredentials {
        package_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete credentials secret '{secret_name}' of package '{package_id}': {source}")]
    DeleteCredentials {
        package_id: String,
        secret_name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to upsert request parameters for package '{package_id}': {source}")]
    UpsertRequestParameters {
        package_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete request parameters secret '{secret_name}' of package '{package_id}': {source}")]
    DeleteRequestParameters {
        package_id: String,
        secret_name: String,
        #[source]
        source: StoreError,
    },

    #[error("{} errors: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<SyncError>),
}

fn join_errors(errors: &[SyncError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SyncError {
    /// Combine collected errors: none, the single error, or `Multiple`
    #[must_use]
    pub fn collect(mut errors: Vec<SyncError>) -> Option<SyncError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(SyncError::Multiple(errors)),
        }
    }

    /// Flattened view of the individual failures
    #[must_use]
    pub fn errors(&self) -> Vec<&SyncError> {
        match self {
            SyncError::Multiple(errors) => errors.iter().flat_map(SyncError::errors).collect(),
            other => vec![other],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one processed application
#[derive(Debug)]
pub struct ApplicationResult {
    pub application_name: String,
    /// Directory id for creates and updates, empty for deletes
    pub application_id: String,
    pub operation: Operation,
    pub error: Option<SyncError>,
}

impl ApplicationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Counts over the results of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl PassSummary {
    #[must_use]
    pub fn from_results(results: &[ApplicationResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            if result.is_success() {
                match result.operation {
                    Operation::Create => summary.created += 1,
                    Operation::Update => summary.updated += 1,
                    Operation::Delete => summary.deleted += 1,
                }
            } else {
                summary.failed += 1;
            }
            summary
        })
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} deleted={} failed={}",
            self.created, self.updated, self.deleted, self.failed
        )
    }
}

/// A side effect that landed, journalled per application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    AssetsPublished { package_id: String },
    AssetsDeleted { package_id: String },
    CredentialsUpserted { package_id: String, secret_name: String },
    CredentialsDeleted { secret_name: String },
    RequestParametersUpserted { package_id: String, secret_name: String },
    RequestParametersDeleted { secret_name: String },
    ApplicationCreated { name: String, uid: Option<String> },
    ApplicationUpdated { name: String },
    ApplicationDeleted { name: String },
}

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Upper bound on applications processed at the same time (at least 1)
    pub max_concurrent_applications: usize,
    /// Filter used when listing existing applications
    pub list_filter: ListFilter,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_applications: DEFAULT_MAX_CONCURRENT_APPLICATIONS,
            list_filter: ListFilter::default(),
        }
    }
}

/// Reconciliation orchestrator
///
/// Holds the collaborators as trait objects; cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) repository: Arc<dyn ApplicationRepository>,
    pub(crate) converter: Arc<dyn Converter>,
    pub(crate) assets: Arc<dyn AssetPublisher>,
    pub(crate) credentials: Arc<dyn CredentialsStore>,
    pub(crate) request_parameters: Arc<dyn RequestParametersStore>,
    pub(crate) compensation: Arc<dyn CompensationHook>,
    pub(crate) options: ReconcilerOptions,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        converter: Arc<dyn Converter>,
        assets: Arc<dyn AssetPublisher>,
        credentials: Arc<dyn CredentialsStore>,
        request_parameters: Arc<dyn RequestParametersStore>,
    ) -> Self {
        Self {
            repository,
            converter,
            assets,
            credentials,
            request_parameters,
            compensation: Arc::new(LogOnlyCompensation),
            options: ReconcilerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_compensation(mut self, compensation: Arc<dyn CompensationHook>) -> Self {
        self.compensation = compensation;
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrent_applications: usize) -> Self {
        self.options.max_concurrent_applications = max_concurrent_applications.max(1);
        self
    }

    #[must_use]
    pub fn with_list_filter(mut self, list_filter: ListFilter) -> Self {
        self.options.list_filter = list_filter;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_error() -> StoreError {
        StoreError::Other("some error".to_string())
    }

    #[test]
    fn test_collect_errors() {
        assert!(SyncError::collect(vec![]).is_none());

        let single = SyncError::collect(vec![SyncError::MissingUid {
            name: "name1".to_string(),
        }]);
        assert!(matches!(single, Some(SyncError::MissingUid { .. })));

        let multiple = SyncError::collect(vec![
            SyncError::PublishAssets {
                package_id: "package1".to_string(),
                source: store_error(),
            },
            SyncError::UpsertCredentials {
                package_id: "package2".to_string(),
                source: store_error(),
            },
        ])
        .unwrap();
        assert_eq!(multiple.errors().len(), 2);
        let message = multiple.to_string();
        assert!(message.starts_with("2 errors:"));
        assert!(message.contains("package 'package1'"));
        assert!(message.contains("package 'package2'"));
    }

    #[test]
    fn test_pass_summary() {
        let results = vec![
            ApplicationResult {
                application_name: "name1".to_string(),
                application_id: "id1".to_string(),
                operation: Operation::Create,
                error: None,
            },
            ApplicationResult {
                application_name: "name2".to_string(),
                application_id: String::new(),
                operation: Operation::Delete,
                error: Some(SyncError::DeleteApplication {
                    name: "name2".to_string(),
                    source: store_error(),
                }),
            },
        ];

        let summary = PassSummary::from_results(&results);
        assert_eq!(
            summary,
            PassSummary {
                created: 1,
                updated: 0,
                deleted: 0,
                failed: 1
            }
        );
        assert_eq!(summary.to_string(), "created=1 updated=0 deleted=0 failed=1");
    }
}
