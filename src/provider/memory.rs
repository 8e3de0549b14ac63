//! # In-Memory Stores
//!
//! Implementations of every collaborator trait over a shared in-process state.
//! Used by the `--dry-run` mode of the binary and by tests.
//!
//! All stores created from one [`MemoryBackend`] share a call log and a set of
//! fail points, so a test can assert on the exact sequence of store calls and
//! make any single call fail.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::crd::RuntimeApplication;
use crate::model::{Credentials, CredentialsType, RequestParameters};
use crate::provider::naming::{credentials_secret_name, request_parameters_secret_name};
use crate::provider::{
    ApplicationRepository, Asset, AssetPublisher, CredentialsRef, CredentialsStore, ListFilter,
    RequestParametersStore, StoreError,
};

/// A store call as recorded in the call log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListApplications,
    GetApplication(String),
    CreateApplication(String),
    UpdateApplication(String),
    DeleteApplication(String),
    UpsertCredentials {
        application: String,
        application_uid: String,
        package_id: String,
        credentials_type: CredentialsType,
    },
    DeleteCredentials(String),
    UpsertRequestParameters {
        application: String,
        application_uid: String,
        package_id: String,
    },
    DeleteRequestParameters(String),
    PutAssets {
        package_id: String,
        asset_ids: Vec<String>,
    },
    DeleteAssets(String),
}

/// A call that should fail with `StoreError::Other`
///
/// Application fail points match the application name, secret upserts and
/// asset calls match the package id, secret deletes match the secret name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ListApplications,
    GetApplication(String),
    CreateApplication(String),
    UpdateApplication(String),
    DeleteApplication(String),
    UpsertCredentials(String),
    DeleteCredentials(String),
    UpsertRequestParameters(String),
    DeleteRequestParameters(String),
    PutAssets(String),
    DeleteAssets(String),
}

/// Stored credentials secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub owner_uid: String,
    pub credentials: Credentials,
}

/// Stored request-parameters secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRequestParameters {
    pub owner_uid: String,
    pub parameters: RequestParameters,
}

#[derive(Debug, Default)]
struct State {
    // Insertion order is kept so listing is deterministic
    applications: Vec<RuntimeApplication>,
    credentials: BTreeMap<String, StoredCredentials>,
    request_parameters: BTreeMap<String, StoredRequestParameters>,
    assets: BTreeMap<String, Vec<Asset>>,
    calls: Vec<StoreCall>,
    fail_points: HashSet<FailPoint>,
    next_uid: u64,
}

impl State {
    fn record(&mut self, call: StoreCall) {
        self.calls.push(call);
    }

    fn check(&self, fail_point: &FailPoint) -> Result<(), StoreError> {
        if self.fail_points.contains(fail_point) {
            return Err(StoreError::Other(format!("injected failure: {fail_point:?}")));
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.applications
            .iter()
            .position(|app| app.metadata.name.as_deref() == Some(name))
    }

    fn assign_uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }
}

/// Shared state behind the in-memory stores
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn applications(&self) -> MemoryApplicationRepository {
        MemoryApplicationRepository {
            backend: self.clone(),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> MemoryCredentialsStore {
        MemoryCredentialsStore {
            backend: self.clone(),
        }
    }

    #[must_use]
    pub fn request_parameters(&self) -> MemoryRequestParametersStore {
        MemoryRequestParametersStore {
            backend: self.clone(),
        }
    }

    #[must_use]
    pub fn assets(&self) -> MemoryAssetPublisher {
        MemoryAssetPublisher {
            backend: self.clone(),
        }
    }

    /// Insert an existing application without recording a call
    ///
    /// A UID is assigned when the record carries none. Returns the stored record.
    pub fn seed(&self, application: RuntimeApplication) -> RuntimeApplication {
        let mut state = self.lock();
        let mut application = application;
        if application.metadata.uid.as_deref().is_none_or(str::is_empty) {
            application.metadata.uid = Some(state.assign_uid());
        }
        if application.metadata.resource_version.is_none() {
            application.metadata.resource_version = Some("1".to_string());
        }
        let name = application.metadata.name.clone().unwrap_or_default();
        match state.position(&name) {
            Some(index) => state.applications[index] = application.clone(),
            None => state.applications.push(application.clone()),
        }
        application
    }

    /// Insert an existing credentials secret without recording a call
    pub fn seed_credentials(&self, secret_name: &str, stored: StoredCredentials) {
        self.lock().credentials.insert(secret_name.to_string(), stored);
    }

    /// Insert an existing request-parameters secret without recording a call
    pub fn seed_request_parameters(&self, secret_name: &str, stored: StoredRequestParameters) {
        self.lock()
            .request_parameters
            .insert(secret_name.to_string(), stored);
    }

    /// Insert an existing asset bundle without recording a call
    pub fn seed_assets(&self, package_id: &str, assets: Vec<Asset>) {
        self.lock().assets.insert(package_id.to_string(), assets);
    }

    pub fn fail_on(&self, fail_point: FailPoint) {
        self.lock().fail_points.insert(fail_point);
    }

    pub fn clear_fail_points(&self) {
        self.lock().fail_points.clear();
    }

    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    #[must_use]
    pub fn application(&self, name: &str) -> Option<RuntimeApplication> {
        let state = self.lock();
        state.position(name).map(|index| state.applications[index].clone())
    }

    #[must_use]
    pub fn application_names(&self) -> Vec<String> {
        self.lock()
            .applications
            .iter()
            .filter_map(|app| app.metadata.name.clone())
            .collect()
    }

    #[must_use]
    pub fn credentials_secret(&self, secret_name: &str) -> Option<StoredCredentials> {
        self.lock().credentials.get(secret_name).cloned()
    }

    #[must_use]
    pub fn request_parameters_secret(&self, secret_name: &str) -> Option<StoredRequestParameters> {
        self.lock().request_parameters.get(secret_name).cloned()
    }

    #[must_use]
    pub fn published_assets(&self, package_id: &str) -> Option<Vec<Asset>> {
        self.lock().assets.get(package_id).cloned()
    }
}

/// Equality-based label selector match (`k1=v1,k2=v2`)
fn matches_selector(application: &RuntimeApplication, selector: &str) -> bool {
    let labels = application.metadata.labels.as_ref();
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels
                .and_then(|labels| labels.get(key.trim()))
                .is_some_and(|actual| actual == value.trim()),
            None => labels.is_some_and(|labels| labels.contains_key(term)),
        })
}

#[derive(Debug, Clone)]
pub struct MemoryApplicationRepository {
    backend: MemoryBackend,
}

#[async_trait]
impl ApplicationRepository for MemoryApplicationRepository {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<RuntimeApplication>, StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::ListApplications);
        state.check(&FailPoint::ListApplications)?;

        Ok(state
            .applications
            .iter()
            .filter(|app| {
                filter
                    .label_selector
                    .as_deref()
                    .is_none_or(|selector| matches_selector(app, selector))
            })
            .cloned()
            .collect())
    }

    async fn get(&self, name: &str) -> Result<RuntimeApplication, StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::GetApplication(name.to_string()));
        state.check(&FailPoint::GetApplication(name.to_string()))?;

        state
            .position(name)
            .map(|index| state.applications[index].clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "Application",
                name: name.to_string(),
            })
    }

    async fn create(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError> {
        let name = application.metadata.name.clone().unwrap_or_default();
        let mut state = self.backend.lock();
        state.record(StoreCall::CreateApplication(name.clone()));
        state.check(&FailPoint::CreateApplication(name.clone()))?;

        if state.position(&name).is_some() {
            return Err(StoreError::Conflict {
                kind: "Application",
                name,
            });
        }

        let mut created = application.clone();
        created.metadata.uid = Some(state.assign_uid());
        created.metadata.resource_version = Some("1".to_string());
        state.applications.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError> {
        let name = application.metadata.name.clone().unwrap_or_default();
        let mut state = self.backend.lock();
        state.record(StoreCall::UpdateApplication(name.clone()));
        state.check(&FailPoint::UpdateApplication(name.clone()))?;

        let Some(index) = state.position(&name) else {
            return Err(StoreError::NotFound {
                kind: "Application",
                name,
            });
        };

        let current = &state.applications[index];
        let version = current
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let mut updated = application.clone();
        updated.metadata.uid.clone_from(&current.metadata.uid);
        updated.metadata.resource_version = Some((version + 1).to_string());
        state.applications[index] = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::DeleteApplication(name.to_string()));
        state.check(&FailPoint::DeleteApplication(name.to_string()))?;

        match state.position(name) {
            Some(index) => {
                state.applications.remove(index);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: "Application",
                name: name.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCredentialsStore {
    backend: MemoryBackend,
}

#[async_trait]
impl CredentialsStore for MemoryCredentialsStore {
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        credentials: &Credentials,
    ) -> Result<CredentialsRef, StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::UpsertCredentials {
            application: application.to_string(),
            application_uid: application_uid.to_string(),
            package_id: package_id.to_string(),
            credentials_type: credentials.credentials_type(),
        });
        state.check(&FailPoint::UpsertCredentials(package_id.to_string()))?;

        let secret_name = credentials_secret_name(application, package_id);
        state.credentials.insert(
            secret_name.clone(),
            StoredCredentials {
                owner_uid: application_uid.to_string(),
                credentials: credentials.clone(),
            },
        );

        Ok(CredentialsRef {
            credentials_type: credentials.credentials_type(),
            secret_name,
            authentication_url: credentials.authentication_url().map(str::to_string),
        })
    }

    async fn delete(&self, secret_name: &str) -> Result<(), StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::DeleteCredentials(secret_name.to_string()));
        state.check(&FailPoint::DeleteCredentials(secret_name.to_string()))?;

        state
            .credentials
            .remove(secret_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "Secret",
                name: secret_name.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRequestParametersStore {
    backend: MemoryBackend,
}

#[async_trait]
impl RequestParametersStore for MemoryRequestParametersStore {
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        parameters: &RequestParameters,
    ) -> Result<String, StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::UpsertRequestParameters {
            application: application.to_string(),
            application_uid: application_uid.to_string(),
            package_id: package_id.to_string(),
        });
        state.check(&FailPoint::UpsertRequestParameters(package_id.to_string()))?;

        let secret_name = request_parameters_secret_name(application, package_id);
        state.request_parameters.insert(
            secret_name.clone(),
            StoredRequestParameters {
                owner_uid: application_uid.to_string(),
                parameters: parameters.clone(),
            },
        );
        Ok(secret_name)
    }

    async fn delete(&self, secret_name: &str) -> Result<(), StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::DeleteRequestParameters(secret_name.to_string()));
        state.check(&FailPoint::DeleteRequestParameters(secret_name.to_string()))?;

        state
            .request_parameters
            .remove(secret_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "Secret",
                name: secret_name.to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryAssetPublisher {
    backend: MemoryBackend,
}

#[async_trait]
impl AssetPublisher for MemoryAssetPublisher {
    async fn put(&self, package_id: &str, assets: &[Asset]) -> Result<(), StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::PutAssets {
            package_id: package_id.to_string(),
            asset_ids: assets.iter().map(|asset| asset.id.clone()).collect(),
        });
        state.check(&FailPoint::PutAssets(package_id.to_string()))?;

        state.assets.insert(package_id.to_string(), assets.to_vec());
        Ok(())
    }

    async fn delete(&self, package_id: &str) -> Result<(), StoreError> {
        let mut state = self.backend.lock();
        state.record(StoreCall::DeleteAssets(package_id.to_string()));
        state.check(&FailPoint::DeleteAssets(package_id.to_string()))?;

        state
            .assets
            .remove(package_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "ConfigMap",
                name: package_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ApplicationSpec;
    use crate::model::BasicCredentials;
    use std::collections::BTreeMap;

    fn runtime_application(name: &str, managed_by: Option<&str>) -> RuntimeApplication {
        let mut app = RuntimeApplication::new(name, ApplicationSpec::default());
        app.metadata.labels = managed_by.map(|value| {
            BTreeMap::from([(
                "app.kubernetes.io/managed-by".to_string(),
                value.to_string(),
            )])
        });
        app
    }

    #[tokio::test]
    async fn test_create_assigns_uid_and_rejects_duplicates() {
        let backend = MemoryBackend::new();
        let repository = backend.applications();

        let created = repository
            .create(&runtime_application("name1", None))
            .await
            .unwrap();
        assert!(created.metadata.uid.is_some());

        let err = repository
            .create(&runtime_application("name1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_uid_and_bumps_resource_version() {
        let backend = MemoryBackend::new();
        let seeded = backend.seed(runtime_application("name1", None));
        let repository = backend.applications();

        let updated = repository
            .update(&runtime_application("name1", None))
            .await
            .unwrap();
        assert_eq!(updated.metadata.uid, seeded.metadata.uid);
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_list_applies_label_selector() {
        let backend = MemoryBackend::new();
        backend.seed(runtime_application("name1", Some("application-sync-controller")));
        backend.seed(runtime_application("name2", None));

        let listed = backend
            .applications()
            .list(&ListFilter::with_label_selector(
                "app.kubernetes.io/managed-by=application-sync-controller",
            ))
            .await
            .unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.name.as_deref(), Some("name1"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let backend = MemoryBackend::new();

        let err = backend.credentials().delete("missing").await.unwrap_err();
        assert!(err.is_not_found());
        let err = backend.assets().delete("package1").await.unwrap_err();
        assert!(err.is_not_found());
        let err = backend.applications().delete("name1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_credentials_upsert_records_call_and_secret() {
        let backend = MemoryBackend::new();
        let credentials = Credentials::Basic(BasicCredentials {
            username: "u".to_string(),
            password: "p".to_string(),
        });

        let reference = backend
            .credentials()
            .upsert("name1", "uid1", "package1", &credentials)
            .await
            .unwrap();

        assert_eq!(reference.secret_name, "name1-package1");
        assert_eq!(reference.credentials_type, CredentialsType::Basic);
        assert_eq!(
            backend.credentials_secret("name1-package1").map(|s| s.owner_uid),
            Some("uid1".to_string())
        );
        assert_eq!(
            backend.calls(),
            vec![StoreCall::UpsertCredentials {
                application: "name1".to_string(),
                application_uid: "uid1".to_string(),
                package_id: "package1".to_string(),
                credentials_type: CredentialsType::Basic,
            }]
        );
    }

    #[tokio::test]
    async fn test_fail_point_injects_error() {
        let backend = MemoryBackend::new();
        backend.fail_on(FailPoint::PutAssets("package1".to_string()));

        let err = backend.assets().put("package1", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Other(_)));
        assert!(backend.assets().put("package2", &[]).await.is_ok());
    }
}
