//! # Application Processing
//!
//! Create, update and delete of a single application across the four stores.
//!
//! ## Step order
//!
//! - **Create**: publish documentation, create the record, read its UID, store secrets
//! - **Update**: per package (created, updated, deleted) documentation and
//!   secrets, then the record
//! - **Delete**: documentation and secrets of every service, then the record
//!
//! A failed step does not stop the independent steps of other packages, but
//! the record write that follows them is skipped. Secrets on create are the
//! exception: they need the UID the store assigns, so they come after the write.
//!
//! Object names are derived from sanitized package ids. Two packages of one
//! application whose names collide fail the application before any step runs.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::controller::reconciler::assets::{
    delete_assets, extract_assets, publish_assets, republish_assets,
};
use crate::controller::reconciler::compensation::FailedApplication;
use crate::controller::reconciler::diff::{diff_packages, UpdatePair};
use crate::controller::reconciler::secrets::{
    delete_dropped_secrets, delete_service_secrets, upsert_package_secrets, SecretStores,
};
use crate::controller::reconciler::types::{
    ApplicationResult, Operation, Reconciler, SideEffect, SyncError,
};
use crate::crd::RuntimeApplication;
use crate::model::{ApiPackage, Application};
use crate::observability::metrics;
use crate::provider::naming::{
    assets_bundle_name, credentials_secret_name, request_parameters_secret_name,
};

/// Side effects applied so far and errors collected for one application
#[derive(Debug, Default)]
pub(crate) struct Progress {
    applied: Vec<SideEffect>,
    errors: Vec<SyncError>,
}

impl Progress {
    pub(crate) fn record(&mut self, effect: SideEffect) {
        self.applied.push(effect);
    }

    pub(crate) fn fail(&mut self, error: SyncError) {
        warn!("{}", error);
        self.errors.push(error);
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl Reconciler {
    fn secret_stores(&self) -> SecretStores<'_> {
        SecretStores {
            credentials: self.credentials.as_ref(),
            request_parameters: self.request_parameters.as_ref(),
        }
    }

    /// UID assigned by the store, read back with `get`
    async fn read_uid(&self, name: &str) -> Result<String, SyncError> {
        let application = self
            .repository
            .get(name)
            .await
            .map_err(|source| SyncError::ReadUid {
                name: name.to_string(),
                source,
            })?;
        application
            .uid_str()
            .map(str::to_string)
            .ok_or_else(|| SyncError::MissingUid {
                name: name.to_string(),
            })
    }

    pub(crate) async fn create_application(&self, desired: &Application) -> ApplicationResult {
        let name = desired.name.as_str();
        let mut progress = Progress::default();
        if let Err(e) = check_name_collisions(desired) {
            progress.fail(e);
            return self
                .finish(name, &desired.id, Operation::Create, progress)
                .await;
        }
        let runtime = self.converter.convert(desired);

        for package in &desired.api_packages {
            publish_assets(self.assets.as_ref(), package, &mut progress).await;
        }

        if progress.has_errors() {
            debug!("Skipping creation of application {} after documentation failures", name);
        } else {
            match self.repository.create(&runtime).await {
                Ok(created) => {
                    info!("Created application {}", name);
                    progress.record(SideEffect::ApplicationCreated {
                        name: name.to_string(),
                        uid: created.uid_str().map(str::to_string),
                    });
                    self.store_new_secrets(desired, &mut progress).await;
                }
                Err(source) => progress.fail(SyncError::CreateApplication {
                    name: name.to_string(),
                    source,
                }),
            }
        }

        self.finish(name, &desired.id, Operation::Create, progress)
            .await
    }

    async fn store_new_secrets(&self, desired: &Application, progress: &mut Progress) {
        if !desired
            .api_packages
            .iter()
            .any(ApiPackage::has_secret_material)
        {
            return;
        }

        let uid = match self.read_uid(&desired.name).await {
            Ok(uid) => uid,
            Err(e) => {
                progress.fail(e);
                return;
            }
        };

        for package in &desired.api_packages {
            upsert_package_secrets(self.secret_stores(), &desired.name, &uid, package, progress)
                .await;
        }
    }

    pub(crate) async fn update_application(&self, pair: UpdatePair<'_>) -> ApplicationResult {
        let UpdatePair { desired, existing } = pair;
        let name = desired.name.as_str();
        let mut progress = Progress::default();
        if let Err(e) = check_name_collisions(desired) {
            progress.fail(e);
            return self
                .finish(name, &desired.id, Operation::Update, progress)
                .await;
        }
        let runtime = self.converter.convert(desired);
        let diff = diff_packages(&desired.api_packages, &existing.spec.services);

        let needs_uid = diff
            .created
            .iter()
            .copied()
            .chain(diff.updated.iter().map(|(package, _)| *package))
            .any(ApiPackage::has_secret_material);
        let uid = if needs_uid {
            match existing.uid_str() {
                Some(uid) => Some(uid.to_string()),
                None => match self.read_uid(name).await {
                    Ok(uid) => Some(uid),
                    Err(e) => {
                        progress.fail(e);
                        None
                    }
                },
            }
        } else {
            None
        };

        for package in &diff.created {
            publish_assets(self.assets.as_ref(), package, &mut progress).await;
            if let Some(uid) = uid.as_deref() {
                upsert_package_secrets(self.secret_stores(), name, uid, package, &mut progress)
                    .await;
            }
        }

        for (package, service) in &diff.updated {
            republish_assets(self.assets.as_ref(), package, &mut progress).await;
            if let Some(uid) = uid.as_deref() {
                upsert_package_secrets(self.secret_stores(), name, uid, package, &mut progress)
                    .await;
            }
            delete_dropped_secrets(self.secret_stores(), name, package, service, &mut progress)
                .await;
        }

        let claimed = claimed_names(name, &desired.api_packages);
        for service in &diff.deleted {
            if claimed.contains(&assets_bundle_name(&service.id)) {
                debug!(
                    "Keeping documentation of package {} claimed by another package",
                    service.id
                );
            } else {
                delete_assets(self.assets.as_ref(), &service.id, &mut progress).await;
            }
            delete_service_secrets(self.secret_stores(), name, service, &claimed, &mut progress)
                .await;
        }

        if progress.has_errors() {
            debug!("Skipping update of application {} after package failures", name);
        } else {
            let updated = carry_over_metadata(runtime, existing);
            match self.repository.update(&updated).await {
                Ok(_) => {
                    info!("Updated application {}", name);
                    progress.record(SideEffect::ApplicationUpdated {
                        name: name.to_string(),
                    });
                }
                Err(source) => progress.fail(SyncError::UpdateApplication {
                    name: name.to_string(),
                    source,
                }),
            }
        }

        self.finish(name, &desired.id, Operation::Update, progress)
            .await
    }

    pub(crate) async fn delete_application(
        &self,
        existing: &RuntimeApplication,
    ) -> ApplicationResult {
        let name = existing.name_str();
        let mut progress = Progress::default();

        let keep = HashSet::new();
        for service in &existing.spec.services {
            delete_assets(self.assets.as_ref(), &service.id, &mut progress).await;
            delete_service_secrets(self.secret_stores(), name, service, &keep, &mut progress)
                .await;
        }

        if progress.has_errors() {
            debug!("Skipping deletion of application {} after package failures", name);
        } else {
            match self.repository.delete(name).await {
                Ok(()) => {
                    info!("Deleted application {}", name);
                    progress.record(SideEffect::ApplicationDeleted {
                        name: name.to_string(),
                    });
                }
                Err(e) if e.is_not_found() => {
                    debug!("Application {} already absent", name);
                }
                Err(source) => progress.fail(SyncError::DeleteApplication {
                    name: name.to_string(),
                    source,
                }),
            }
        }

        self.finish(name, "", Operation::Delete, progress).await
    }

    async fn finish(
        &self,
        name: &str,
        id: &str,
        operation: Operation,
        progress: Progress,
    ) -> ApplicationResult {
        let Progress { applied, errors } = progress;
        let error = SyncError::collect(errors);

        if let Some(error) = &error {
            warn!("Failed to {} application {}: {}", operation, name, error);
            if !applied.is_empty() {
                self.compensation
                    .on_failure(FailedApplication {
                        application_name: name.to_string(),
                        operation,
                        applied,
                        error: error.to_string(),
                    })
                    .await;
            }
        }
        metrics::record_application_outcome(operation.as_str(), error.is_none());

        ApplicationResult {
            application_name: name.to_string(),
            application_id: id.to_string(),
            operation,
            error,
        }
    }
}

/// Reject applications where two package ids sanitize to the same object name
fn check_name_collisions(application: &Application) -> Result<(), SyncError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for package in &application.api_packages {
        let names = [
            credentials_secret_name(&application.name, &package.id),
            assets_bundle_name(&package.id),
        ];
        for resource_name in names {
            match seen.get(resource_name.as_str()) {
                Some(&first) if first != package.id => {
                    return Err(SyncError::NameCollision {
                        first: first.to_string(),
                        second: package.id.clone(),
                        resource_name,
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(resource_name, &package.id);
                }
            }
        }
    }
    Ok(())
}

/// Names of the objects the desired packages write in this pass
fn claimed_names(application: &str, packages: &[ApiPackage]) -> HashSet<String> {
    let mut claimed = HashSet::new();
    for package in packages {
        if package.credentials().is_some() {
            claimed.insert(credentials_secret_name(application, &package.id));
        }
        if package.request_parameters().is_some() {
            claimed.insert(request_parameters_secret_name(application, &package.id));
        }
        if !extract_assets(package).is_empty() {
            claimed.insert(assets_bundle_name(&package.id));
        }
    }
    claimed
}

/// Keep the identity and version of the existing record on the converted one
fn carry_over_metadata(
    mut runtime: RuntimeApplication,
    existing: &RuntimeApplication,
) -> RuntimeApplication {
    runtime
        .metadata
        .resource_version
        .clone_from(&existing.metadata.resource_version);
    runtime.metadata.uid.clone_from(&existing.metadata.uid);
    runtime
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ApplicationSpec;

    #[test]
    fn test_carry_over_metadata() {
        let mut existing = RuntimeApplication::new("name1", ApplicationSpec::default());
        existing.metadata.uid = Some("uid1".to_string());
        existing.metadata.resource_version = Some("42".to_string());

        let runtime = RuntimeApplication::new(
            "name1",
            ApplicationSpec {
                description: "new".to_string(),
                ..Default::default()
            },
        );
        let updated = carry_over_metadata(runtime, &existing);

        assert_eq!(updated.metadata.uid.as_deref(), Some("uid1"));
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(updated.spec.description, "new");
    }

    fn package(id: &str) -> ApiPackage {
        ApiPackage {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn application(packages: Vec<ApiPackage>) -> Application {
        Application {
            id: "id1".to_string(),
            name: "name1".to_string(),
            api_packages: packages,
            ..Default::default()
        }
    }

    #[test]
    fn test_name_collision_between_sanitized_package_ids() {
        let err = check_name_collisions(&application(vec![
            package("package-1"),
            package("Package_1"),
        ]))
        .unwrap_err();

        match err {
            SyncError::NameCollision {
                first,
                second,
                resource_name,
            } => {
                assert_eq!(first, "package-1");
                assert_eq!(second, "Package_1");
                assert_eq!(resource_name, "name1-package-1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_distinct_package_ids_do_not_collide() {
        assert!(check_name_collisions(&application(vec![
            package("package1"),
            package("package2"),
        ]))
        .is_ok());
    }

    #[test]
    fn test_claimed_names_cover_written_objects_only() {
        let with_credentials = ApiPackage {
            default_instance_auth: Some(crate::model::Auth {
                credentials: Some(crate::model::Credentials::Basic(
                    crate::model::BasicCredentials {
                        username: "u".to_string(),
                        password: "p".to_string(),
                    },
                )),
                request_parameters: None,
            }),
            ..package("package1")
        };

        let claimed = claimed_names("name1", &[with_credentials, package("package2")]);

        assert_eq!(claimed, HashSet::from(["name1-package1".to_string()]));
    }

    #[test]
    fn test_progress_tracks_errors() {
        let mut progress = Progress::default();
        assert!(!progress.has_errors());
        progress.fail(SyncError::MissingUid {
            name: "name1".to_string(),
        });
        assert!(progress.has_errors());
    }
}
