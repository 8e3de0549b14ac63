//! # Kubernetes Stores
//!
//! Production implementations of the collaborator traits:
//!
//! - `applications`: `Application` custom resources (cluster scoped)
//! - `credentials`: credential `Secret`s owned by the application
//! - `request_parameters`: request-parameter `Secret`s owned by the application
//! - `assets`: per-package documentation `ConfigMap`s
//!
//! Secrets and documentation are written with server-side apply so repeated
//! upserts converge on the same object.

use kube::Client;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::constants::{APPLICATION_NAME_LABEL, PACKAGE_ID_LABEL};
use crate::crd::{Application, MANAGED_BY_LABEL};
use crate::observability::metrics;
use crate::provider::StoreError;

mod applications;
mod assets;
mod credentials;
mod request_parameters;

pub use applications::KubeApplicationRepository;
pub use assets::ConfigMapAssetPublisher;
pub use credentials::SecretCredentialsStore;
pub use request_parameters::SecretRequestParametersStore;

/// Client, namespace and field manager shared by the Kubernetes stores
#[derive(Clone)]
pub struct KubernetesBackend {
    client: Client,
    namespace: String,
    field_manager: String,
    managed_by: String,
}

impl std::fmt::Debug for KubernetesBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubernetesBackend")
            .field("namespace", &self.namespace)
            .field("field_manager", &self.field_manager)
            .field("managed_by", &self.managed_by)
            .finish_non_exhaustive()
    }
}

impl KubernetesBackend {
    #[must_use]
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        field_manager: impl Into<String>,
        managed_by: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            field_manager: field_manager.into(),
            managed_by: managed_by.into(),
        }
    }

    #[must_use]
    pub fn applications(&self) -> KubeApplicationRepository {
        KubeApplicationRepository::new(self.clone())
    }

    #[must_use]
    pub fn credentials(&self) -> SecretCredentialsStore {
        SecretCredentialsStore::new(self.clone())
    }

    #[must_use]
    pub fn request_parameters(&self) -> SecretRequestParametersStore {
        SecretRequestParametersStore::new(self.clone())
    }

    #[must_use]
    pub fn assets(&self) -> ConfigMapAssetPublisher {
        ConfigMapAssetPublisher::new(self.clone())
    }

    /// Labels for a secret or ConfigMap written for a package
    fn package_labels(
        &self,
        application: Option<&str>,
        package_id: &str,
    ) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), self.managed_by.clone()),
            (PACKAGE_ID_LABEL.to_string(), label_value(package_id)),
        ]);
        if let Some(application) = application {
            labels.insert(APPLICATION_NAME_LABEL.to_string(), label_value(application));
        }
        labels
    }
}

/// Owner reference pointing at the application record, so secrets are
/// garbage collected with it
fn application_owner(application: &str, application_uid: &str) -> OwnerReference {
    OwnerReference {
        api_version: Application::api_version(&()).to_string(),
        kind: Application::kind(&()).to_string(),
        name: application.to_string(),
        uid: application_uid.to_string(),
        block_owner_deletion: None,
        controller: Some(false),
    }
}

/// Truncate to the 63 character label value limit
fn label_value(value: &str) -> String {
    value
        .chars()
        .take(63)
        .collect::<String>()
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

/// Run one store call and record its outcome and duration
async fn observe<T, F>(store: &str, operation: &str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let start = Instant::now();
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(e) if e.is_not_found() => "not_found",
        Err(_) => "error",
    };
    metrics::record_store_operation(store, operation, outcome, start.elapsed().as_secs_f64());
    result
}
