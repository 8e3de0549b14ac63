//! Credential secrets.
//!
//! One `Secret` per (application, package), named `{application}-{package}`:
//!
//! - Basic: `username`, `password`
//! - OAuth: `clientId`, `clientSecret`; the token URL is recorded on the
//!   application entry, not in the secret

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{application_owner, observe, KubernetesBackend};
use crate::constants::{CLIENT_ID_KEY, CLIENT_SECRET_KEY, PASSWORD_KEY, USERNAME_KEY};
use crate::model::Credentials;
use crate::provider::naming::credentials_secret_name;
use crate::provider::{CredentialsRef, CredentialsStore, StoreError};

const STORE: &str = "credentials";
const KIND: &str = "Secret";

#[derive(Debug, Clone)]
pub struct SecretCredentialsStore {
    backend: KubernetesBackend,
}

impl SecretCredentialsStore {
    pub(super) fn new(backend: KubernetesBackend) -> Self {
        Self { backend }
    }

    fn api(&self) -> Api<Secret> {
        Api::namespaced(self.backend.client.clone(), &self.backend.namespace)
    }
}

/// Secret data for a credentials variant
pub(super) fn credentials_data(credentials: &Credentials) -> BTreeMap<String, ByteString> {
    let entry = |key: &str, value: &str| (key.to_string(), ByteString(value.as_bytes().to_vec()));
    match credentials {
        Credentials::Basic(basic) => BTreeMap::from([
            entry(USERNAME_KEY, &basic.username),
            entry(PASSWORD_KEY, &basic.password),
        ]),
        Credentials::OAuth(oauth) => BTreeMap::from([
            entry(CLIENT_ID_KEY, &oauth.client_id),
            entry(CLIENT_SECRET_KEY, &oauth.client_secret),
        ]),
    }
}

#[async_trait]
impl CredentialsStore for SecretCredentialsStore {
    async fn upsert(
        &self,
        application: &str,
        application_uid: &str,
        package_id: &str,
        credentials: &Credentials,
    ) -> Result<CredentialsRef, StoreError> {
        observe(STORE, "upsert", async {
            let secret_name = credentials_secret_name(application, package_id);
            let secret = Secret {
                metadata: ObjectMeta {
                    name: Some(secret_name.clone()),
                    namespace: Some(self.backend.namespace.clone()),
                    labels: Some(self.backend.package_labels(Some(application), package_id)),
                    owner_references: Some(vec![application_owner(application, application_uid)]),
                    ..Default::default()
                },
                data: Some(credentials_data(credentials)),
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
                "Upserted {} credentials secret {}/{}",
                credentials.credentials_type(),
                self.backend.namespace,
                secret_name
            );

            Ok(CredentialsRef {
                credentials_type: credentials.credentials_type(),
                secret_name,
                authentication_url: credentials.authentication_url().map(str::to_string),
            })
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
                "Deleted credentials secret {}/{}",
                self.backend.namespace, secret_name
            );
            Ok(())
        })
        .await
    }
}
