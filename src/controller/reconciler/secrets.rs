//! # Package Secrets
//!
//! Credential and request-parameter secrets of a package. The two have
//! independent lifecycles: each is upserted when present and removed when it
//! disappears, regardless of the other.
//!
//! The names to delete come from the references recorded on the service
//! entries. A service without entries has nowhere to record them, so the
//! names the stores derive for its package are used instead.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::controller::reconciler::application::Progress;
use crate::controller::reconciler::types::{SideEffect, SyncError};
use crate::crd::Service;
use crate::model::ApiPackage;
use crate::provider::naming::{credentials_secret_name, request_parameters_secret_name};
use crate::provider::{CredentialsStore, RequestParametersStore};

/// Secret stores used for one application
#[derive(Clone, Copy)]
pub(crate) struct SecretStores<'a> {
    pub credentials: &'a dyn CredentialsStore,
    pub request_parameters: &'a dyn RequestParametersStore,
}

/// Upsert whatever secret material the package carries
pub(crate) async fn upsert_package_secrets(
    stores: SecretStores<'_>,
    application: &str,
    application_uid: &str,
    package: &ApiPackage,
    progress: &mut Progress,
) {
    if let Some(credentials) = package.credentials() {
        match stores
            .credentials
            .upsert(application, application_uid, &package.id, credentials)
            .await
        {
            Ok(reference) => {
                info!(
                    "Stored {} credentials for package {} in {}",
                    reference.credentials_type, package.id, reference.secret_name
                );
                progress.record(SideEffect::CredentialsUpserted {
                    package_id: package.id.clone(),
                    secret_name: reference.secret_name,
                });
            }
            Err(source) => progress.fail(SyncError::UpsertCredentials {
                package_id: package.id.clone(),
                source,
            }),
        }
    }

    if let Some(parameters) = package.request_parameters() {
        match stores
            .request_parameters
            .upsert(application, application_uid, &package.id, parameters)
            .await
        {
            Ok(secret_name) => {
                info!(
                    "Stored request parameters for package {} in {}",
                    package.id, secret_name
                );
                progress.record(SideEffect::RequestParametersUpserted {
                    package_id: package.id.clone(),
                    secret_name,
                });
            }
            Err(source) => progress.fail(SyncError::UpsertRequestParameters {
                package_id: package.id.clone(),
                source,
            }),
        }
    }
}

/// Secret names an existing service owns
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RecordedSecrets {
    pub credentials: Option<String>,
    pub request_parameters: Option<String>,
}

impl RecordedSecrets {
    pub(crate) fn of(application: &str, service: &Service) -> Self {
        if service.entries.is_empty() {
            return Self {
                credentials: Some(credentials_secret_name(application, &service.id)),
                request_parameters: Some(request_parameters_secret_name(
                    application,
                    &service.id,
                )),
            };
        }
        Self {
            credentials: service.credentials_secret_name().map(str::to_string),
            request_parameters: service.request_parameters_secret_name().map(str::to_string),
        }
    }
}

/// Delete the secrets an existing package recorded but no longer carries
///
/// Upserts for material that is still present go through
/// [`upsert_package_secrets`].
pub(crate) async fn delete_dropped_secrets(
    stores: SecretStores<'_>,
    application: &str,
    package: &ApiPackage,
    service: &Service,
    progress: &mut Progress,
) {
    let recorded = RecordedSecrets::of(application, service);
    if package.credentials().is_none() {
        if let Some(secret_name) = recorded.credentials.as_deref() {
            delete_credentials(stores, &service.id, secret_name, progress).await;
        }
    }
    if package.request_parameters().is_none() {
        if let Some(secret_name) = recorded.request_parameters.as_deref() {
            delete_request_parameters(stores, &service.id, secret_name, progress).await;
        }
    }
}

/// Delete every secret the service owns, except names in `keep`
///
/// `keep` holds names another package of the application writes in the same
/// pass.
pub(crate) async fn delete_service_secrets(
    stores: SecretStores<'_>,
    application: &str,
    service: &Service,
    keep: &HashSet<String>,
    progress: &mut Progress,
) {
    let recorded = RecordedSecrets::of(application, service);
    let owned = |name: Option<String>| {
        name.filter(|name| {
            let claimed = keep.contains(name);
            if claimed {
                debug!("Keeping secret {} claimed by another package", name);
            }
            !claimed
        })
    };

    if let Some(secret_name) = owned(recorded.credentials) {
        delete_credentials(stores, &service.id, &secret_name, progress).await;
    }
    if let Some(secret_name) = owned(recorded.request_parameters) {
        delete_request_parameters(stores, &service.id, &secret_name, progress).await;
    }
}

async fn delete_credentials(
    stores: SecretStores<'_>,
    package_id: &str,
    secret_name: &str,
    progress: &mut Progress,
) {
    match stores.credentials.delete(secret_name).await {
        Ok(()) => {
            info!("Deleted credentials secret {}", secret_name);
            progress.record(SideEffect::CredentialsDeleted {
                secret_name: secret_name.to_string(),
            });
        }
        Err(e) if e.is_not_found() => {
            debug!("Credentials secret {} already absent", secret_name);
        }
        Err(source) => progress.fail(SyncError::DeleteCredentials {
            package_id: package_id.to_string(),
            secret_name: secret_name.to_string(),
            source,
        }),
    }
}

async fn delete_request_parameters(
    stores: SecretStores<'_>,
    package_id: &str,
    secret_name: &str,
    progress: &mut Progress,
) {
    match stores.request_parameters.delete(secret_name).await {
        Ok(()) => {
            info!("Deleted request parameters secret {}", secret_name);
            progress.record(SideEffect::RequestParametersDeleted {
                secret_name: secret_name.to_string(),
            });
        }
        Err(e) if e.is_not_found() => {
            debug!("Request parameters secret {} already absent", secret_name);
        }
        Err(source) => progress.fail(SyncError::DeleteRequestParameters {
            package_id: package_id.to_string(),
            secret_name: secret_name.to_string(),
            source,
        }),
    }
}
