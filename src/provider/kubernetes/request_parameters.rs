//! Request-parameter secrets.
//!
//! One `Secret` per (application, package), named `params-{application}-{package}`,
//! holding the JSON-encoded `headers` and `queryParameters` maps.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{application_owner, observe, KubernetesBackend};
use crate::constants::{HEADERS_KEY, QUERY_PARAMETERS_KEY};
use crate::model::RequestParameters;
use crate::provider::naming::request_parameters_secret_name;
use crate::provider::{RequestParametersStore, StoreError};

const STORE: &str = "request_parameters";
const KIND: &str = "Secret";

#[derive(Debug, Clone)]
pub struct SecretRequestParametersStore {
    backend: KubernetesBackend,
}

impl SecretRequestParametersStore {
    pub(super) fn new(backend: KubernetesBackend) -> Self {
        Self { backend }
    }

    fn api(&self) -> Api<Secret> {
        Api::namespaced(self.backend.client.clone(), &self.backend.namespace)
    }
}

/// Secret data for request parameters; absent maps produce no key
pub(super) fn request_parameters_data(
    parameters: &RequestParameters,
) -> Result<BTreeMap<String, ByteString>, StoreError> {
    let mut data = BTreeMap::new();
    if let Some(headers) = &parameters.headers {
        let encoded = serde_json::to_vec(headers).map_err(|source| StoreError::Serialization {
            what: "request headers",
            source,
        })?;
        data.insert(HEADERS_KEY.to_string(), ByteString(encoded));
    }
    if let Some(query_parameters) = &parameters.query_parameters {
        let encoded =
            serde_json::to_vec(query_parameters).map_err(|source| StoreError::Serialization {
                what: "query parameters",
                source,
            })?;
        data.insert(QUERY_PARAMETERS_KEY.to_string(), ByteString(encoded));
    }
    Ok(data)
}

#[async_trait]
impl RequestParametersStore for SecretRequestParametersStore {
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        parameters: &RequestParameters,
    ) -> Result<String, StoreError> {
        observe(STORE, "upsert", async {
            let secret_name = request_parameters_secret_name(application, package_id);
            let secret = Secret {
                metadata: ObjectMeta {
                    name: Some(secret_name.clone()),
                    namespace: Some(self.backend.namespace.clone()),
                    labels: Some(self.backend.package_labels(Some(application), package_id)),
                    owner_references: Some(vec![application_owner(application, application_uid)]),
                    ..Default::default()
                },
                data: Some(request_parameters_data(parameters)?),
                type_: Some("Opaque".to_string()),
                ..Default::default()
            };

            self.api()
                .patch(
                    &secret_name,
                    &PatchParams::apply(&self.backend.field_manager).force(),
                    &Patch::Apply(&secret),
                )
                .await
                .map_err(|e| StoreError::from_kube(KIND, &secret_name, e))?;

            info!(
                "Upserted request parameters secret {}/{}",
                self.backend.namespace, secret_name
            );
            Ok(secret_name)
        })
        .await
    }

    async fn delete(&self, secret_name: &str) -> Result<(), StoreError> {
        observe(STORE, "delete", async {
            self.api()
                .delete(secret_name, &DeleteParams::default())
                .await
                .map_err(|e| StoreError::from_kube(KIND, secret_name, e))?;
            debug!(
                "Deleted request parameters secret {}/{}",
                self.backend.namespace, secret_name
            );
            Ok(())
        })
        .await
    }
}
