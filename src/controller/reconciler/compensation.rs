//! # Compensation
//!
//! Side effects across stores are not transactional. When an application ends
//! failed after some of its side effects landed, the journal of those effects
//! is handed to a [`CompensationHook`]. The default hook only logs it.

use async_trait::async_trait;
use tracing::warn;

use crate::controller::reconciler::types::{Operation, SideEffect};

/// Application that failed after some side effects were applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedApplication {
    pub application_name: String,
    pub operation: Operation,
    /// Side effects that landed, in the order they were applied
    pub applied: Vec<SideEffect>,
    pub error: String,
}

#[async_trait]
pub trait CompensationHook: Send + Sync {
    async fn on_failure(&self, failed: FailedApplication);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyCompensation;

#[async_trait]
impl CompensationHook for LogOnlyCompensation {
    async fn on_failure(&self, failed: FailedApplication) {
        warn!(
            application.name = %failed.application_name,
            operation = %failed.operation,
            applied = failed.applied.len(),
            "Application {} left partially applied: {:?}",
            failed.application_name,
            failed.applied
        );
    }
}
