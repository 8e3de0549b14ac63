//! # Apply
//!
//! One reconciliation pass: list existing managed applications, diff them
//! against the desired set and process every change.
//!
//! Applications are processed concurrently up to
//! `max_concurrent_applications`, and results come back in diff order:
//! creates, then updates, then deletes.

use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::controller::reconciler::diff::{diff_applications, UpdatePair};
use crate::controller::reconciler::types::{
    ApplicationResult, Operation, PassSummary, Reconciler, ReconcilerError,
};
use crate::crd::RuntimeApplication;
use crate::model::Application;
use crate::observability::metrics;

enum Change<'a> {
    Create(&'a Application),
    Update(UpdatePair<'a>),
    Delete(&'a RuntimeApplication),
}

impl Change<'_> {
    fn name(&self) -> &str {
        match self {
            Change::Create(desired) => &desired.name,
            Change::Update(pair) => &pair.desired.name,
            Change::Delete(existing) => existing.name_str(),
        }
    }

    fn operation(&self) -> Operation {
        match self {
            Change::Create(_) => Operation::Create,
            Change::Update(_) => Operation::Update,
            Change::Delete(_) => Operation::Delete,
        }
    }
}

impl Reconciler {
    /// Reconcile the runtime towards `desired`
    ///
    /// # Errors
    ///
    /// Returns `ReconcilerError::ListApplications` if existing applications
    /// cannot be listed. Every other failure is reported in the result of the
    /// application it belongs to.
    pub async fn apply(
        &self,
        desired: &[Application],
    ) -> Result<Vec<ApplicationResult>, ReconcilerError> {
        self.apply_with_cancellation(desired, &CancellationToken::new())
            .await
    }

    /// Like [`Reconciler::apply`], but starts no new application once `cancel`
    /// is cancelled. Applications already in flight finish and their results
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns `ReconcilerError::ListApplications` if existing applications
    /// cannot be listed.
    pub async fn apply_with_cancellation(
        &self,
        desired: &[Application],
        cancel: &CancellationToken,
    ) -> Result<Vec<ApplicationResult>, ReconcilerError> {
        let span = info_span!("reconciler.apply", desired = desired.len());
        async move {
            let start = Instant::now();
            metrics::increment_passes();

            let existing = match self.repository.list(&self.options.list_filter).await {
                Ok(existing) => existing,
                Err(e) => {
                    error!("Failed to list existing applications: {}", e);
                    metrics::increment_pass_errors();
                    metrics::observe_pass_duration(start.elapsed().as_secs_f64());
                    return Err(ReconcilerError::ListApplications(e));
                }
            };

            let listed = existing.len();
            let managed: Vec<RuntimeApplication> = existing
                .into_iter()
                .filter(RuntimeApplication::is_managed)
                .collect();
            if managed.len() < listed {
                debug!(
                    "Ignoring {} unmanaged applications",
                    listed - managed.len()
                );
            }
            metrics::set_applications_managed(managed.len());

            let diff = diff_applications(desired, &managed);
            info!(
                "Applying {} creates, {} updates, {} deletes",
                diff.to_create.len(),
                diff.to_update.len(),
                diff.to_delete.len()
            );

            let changes: Vec<Change<'_>> = diff
                .to_create
                .iter()
                .copied()
                .map(Change::Create)
                .chain(diff.to_update.iter().copied().map(Change::Update))
                .chain(diff.to_delete.iter().copied().map(Change::Delete))
                .collect();
            let total = changes.len();

            let results: Vec<ApplicationResult> = stream::iter(changes)
                .map(|change| self.process(change, cancel))
                .buffered(self.options.max_concurrent_applications.max(1))
                .filter_map(futures::future::ready)
                .collect()
                .await;

            if results.len() < total {
                warn!(
                    "Reconciliation cancelled, {} of {} applications not processed",
                    total - results.len(),
                    total
                );
            }

            let summary = PassSummary::from_results(&results);
            info!("Reconciliation pass finished: {}", summary);
            metrics::observe_pass_duration(start.elapsed().as_secs_f64());
            Ok(results)
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        change: Change<'_>,
        cancel: &CancellationToken,
    ) -> Option<ApplicationResult> {
        if cancel.is_cancelled() {
            debug!("Skipping application {} after cancellation", change.name());
            return None;
        }

        let span = info_span!(
            "reconciler.application",
            application.name = %change.name(),
            operation = change.operation().as_str()
        );
        let result = match change {
            Change::Create(desired) => self.create_application(desired).instrument(span).await,
            Change::Update(pair) => self.update_application(pair).instrument(span).await,
            Change::Delete(existing) => self.delete_application(existing).instrument(span).await,
        };
        Some(result)
    }
}
