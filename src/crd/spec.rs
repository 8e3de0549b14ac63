//! # Application Spec
//!
//! The `Application` custom resource mirrored from the directory service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Service;

/// API group of the `Application` resource
pub const APPLICATION_GROUP: &str = "applicationconnector.sync.io";

/// Label carried by every resource written by the controller
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Application Custom Resource Definition
///
/// One `Application` exists per directory application. Cluster scoped, its
/// name is the directory application name.
///
/// # Example
///
/// ```yaml
/// apiVersion: applicationconnector.sync.io/v1alpha1
/// kind: Application
/// metadata:
///   name: orders
///   labels:
///     app.kubernetes.io/managed-by: application-sync-controller
/// spec:
///   description: Orders backend
///   directoryMetadata:
///     applicationId: 6d3c4c3e-0000-0000-0000-000000000001
///     authentication:
///       clientIds: ["6d3c4c3e-0000-0000-0000-000000000001"]
///   services:
///     - id: package1
///       name: orders-api
///       displayName: Orders API
///       entries:
///         - id: api1
///           name: orders
///           type: API
///           targetUrl: https://orders.example.com
///           credentials:
///             type: Basic
///             secretName: orders-package1
///           requestParametersSecretName: params-orders-package1
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema,
)]
#[kube(
    kind = "Application",
    group = "applicationconnector.sync.io",
    version = "v1alpha1",
    shortname = "app",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default)]
    pub description: String,
    /// Reconciliation marker. Applications without it are never touched by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_metadata: Option<DirectoryMetadata>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// One service per API package, in directory order
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Directory-side identity of a managed application
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryMetadata {
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub authentication: Authentication,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default)]
    pub client_ids: Vec<String>,
}

impl Application {
    /// Whether the application carries the reconciliation marker
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.spec.directory_metadata.is_some()
    }

    /// Store-assigned UID, present once the resource has been persisted
    #[must_use]
    pub fn uid_str(&self) -> Option<&str> {
        self.metadata.uid.as_deref().filter(|uid| !uid.is_empty())
    }

    /// Name of the resource, empty if unset
    #[must_use]
    pub fn name_str(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Find a service by package id
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.spec.services.iter().find(|service| service.id == id)
    }
}
