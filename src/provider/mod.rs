//! # Provider Modules
//!
//! Collaborator interfaces consumed by the reconciler and their implementations.
//!
//! Each store implements one of:
//! - `ApplicationRepository` for runtime `Application` records
//! - `CredentialsStore` for credential secrets
//! - `RequestParametersStore` for request-parameter secrets
//! - `AssetPublisher` for per-package documentation bundles
//!
//! Two implementations ship with the crate: `kubernetes` (the production
//! stores) and `memory` (used by tests and dry runs).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crd::RuntimeApplication;
use crate::model::{Credentials, CredentialsType, RequestParameters};

pub mod error;
pub mod kubernetes;
pub mod memory;
pub mod naming;

pub use error::StoreError;

/// Filter applied when listing runtime applications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Kubernetes label selector, e.g. `app.kubernetes.io/managed-by=application-sync-controller`
    pub label_selector: Option<String>,
}

impl ListFilter {
    #[must_use]
    pub fn with_label_selector(selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(selector.into()),
        }
    }
}

/// Persistence of runtime `Application` records
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn list(&self, filter: &ListFilter) -> Result<Vec<RuntimeApplication>, StoreError>;

    /// Returns `StoreError::NotFound` when no application has this name
    async fn get(&self, name: &str) -> Result<RuntimeApplication, StoreError>;

    async fn create(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError>;

    async fn update(
        &self,
        application: &RuntimeApplication,
    ) -> Result<RuntimeApplication, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Reference to stored credentials, as recorded on runtime entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsRef {
    pub credentials_type: CredentialsType,
    pub secret_name: String,
    pub authentication_url: Option<String>,
}

/// Secret store for package credentials
#[async_trait]
pub trait CredentialsStore: Send + Sync {
    /// Create or replace the credentials secret of a package
    ///
    /// `application_uid` is the store-assigned UID of the owning application.
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        credentials: &Credentials,
    ) -> Result<CredentialsRef, StoreError>;

    async fn delete(&self, secret_name: &str) -> Result<(), StoreError>;
}

/// Secret store for package request parameters
#[async_trait]
pub trait RequestParametersStore: Send + Sync {
    /// Create or replace the request-parameters secret of a package, returning its name
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        parameters: &RequestParameters,
    ) -> Result<String, StoreError>;

    async fn delete(&self, secret_name: &str) -> Result<(), StoreError>;
}

/// Publisher of per-package documentation bundles
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    /// Replace the bundle of a package
    async fn put(&self, package_id: &str, assets: &[Asset]) -> Result<(), StoreError>;

    async fn delete(&self, package_id: &str) -> Result<(), StoreError>;
}

/// Single documentation asset of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// `{type}-{definition id}`
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub format: AssetFormat,
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    OpenApi,
    OData,
    AsyncApi,
}

impl AssetType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::OpenApi => "openapi",
            AssetType::OData => "odata",
            AssetType::AsyncApi => "asyncapi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Json,
    Yaml,
    Xml,
}

impl AssetFormat {
    /// File extension used when the asset is stored
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            AssetFormat::Json => "json",
            AssetFormat::Yaml => "yaml",
            AssetFormat::Xml => "xml",
        }
    }
}
