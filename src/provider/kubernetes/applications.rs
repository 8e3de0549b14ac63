//! `Application` custom resource repository.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use tracing::debug;

use super::{observe, KubernetesBackend};
use crate::crd::{Application, RuntimeApplication};
use crate::provider::{ApplicationRepository, ListFilter, StoreError};

const STORE: &str = "application";
const KIND: &str = "Application";

#[derive(Debug, Clone)]
pub struct KubeApplicationRepository {
    backend: KubernetesBackend,
}

impl KubeApplicationRepository {
    pub(super) fn new(backend: KubernetesBackend) -> Self {
        Self { backend }
    }

    fn api(&self) -> Api<Application> {
        Api::all(self.backend.client.clone())
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.backend.field_manager.clone()),
        }
    }
}

fn application_name(application: &RuntimeApplication) -> Result<String, StoreError> {
    application
        .metadata
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoreError::Other("Application has no metadata.name".to_string()))
}

#[async_trait]
impl ApplicationRepository for KubeApplicationRepository {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<RuntimeApplication>, StoreError> {
        observe(STORE, "list", async {
            let mut params = ListParams::default();
            if let Some(selector) = filter.label_selector.as_deref() {
                params = params.labels(selector);
            }
            let list = self
                .api()
                .list(&params)
                .await
                .map_err(|e| StoreError::from_kube(KIND, "*", e))?;
            debug!("Listed {} applications", list.items.len());
            Ok(list.items)
        })
        .await
    }

    async fn get(&self, name: &str) -> Result<RuntimeApplication, StoreError> {
        observe(STORE, "get", async {
            self.api()
                .get(name)
                .await
                .map_err(|e| StoreError::from_kube(KIND, name, e))
        })
        .await
    }

    async fn create(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError> {
        observe(STORE, "create", async {
            let name = application_name(application)?;
            self.api()
                .create(&self.post_params(), application)
                .await
                .map_err(|e| StoreError::from_kube(KIND, &name, e))
        })
        .await
    }

    async fn update(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError> {
        observe(STORE, "update", async {
            let name = application_name(application)?;
            self.api()
                .replace(&name, &self.post_params(), application)
                .await
                .map_err(|e| StoreError::from_kube(KIND, &name, e))
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        observe(STORE, "delete", async {
            self.api()
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ())
                .map_err(|e| StoreError::from_kube(KIND, name, e))
        })
        .await
    }
}
