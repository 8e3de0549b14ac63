//! # Converter
//!
//! Pure mapping from a directory [`Application`](crate::model::Application) to
//! the runtime `Application` resource.
//!
//! Secret references are written into the entries up front using the same
//! naming functions the stores use, so the resource can be persisted before
//! the secrets it points at exist. Every entry of a package carries them, API
//! and event entries alike.

use std::collections::BTreeMap;

use crate::constants::DEFAULT_APPLICATION_DESCRIPTION;
use crate::crd::{
    ApplicationSpec, Authentication, DirectoryMetadata, EntryCredentials, RuntimeApplication,
    Service, ServiceEntry, ENTRY_TYPE_API, ENTRY_TYPE_EVENTS, MANAGED_BY_LABEL,
};
use crate::model::{ApiDefinition, ApiPackage, Application, EventApiDefinition};
use crate::provider::naming::{
    credentials_secret_name, request_parameters_secret_name, sanitize_resource_name,
};

/// Maps a directory application onto its runtime representation
pub trait Converter: Send + Sync {
    fn convert(&self, application: &Application) -> RuntimeApplication;
}

/// Default converter; marks every resource as managed
#[derive(Debug, Clone)]
pub struct DefaultConverter {
    managed_by: String,
}

impl DefaultConverter {
    #[must_use]
    pub fn new(managed_by: impl Into<String>) -> Self {
        Self {
            managed_by: managed_by.into(),
        }
    }
}

impl Converter for DefaultConverter {
    fn convert(&self, application: &Application) -> RuntimeApplication {
        let spec = ApplicationSpec {
            description: description_or_default(application.description.as_deref()),
            directory_metadata: Some(DirectoryMetadata {
                application_id: application.id.clone(),
                authentication: Authentication {
                    client_ids: vec![application.id.clone()],
                },
            }),
            labels: application.labels.clone(),
            services: application
                .api_packages
                .iter()
                .map(|package| convert_package(&application.name, package))
                .collect(),
        };

        let mut runtime = RuntimeApplication::new(&application.name, spec);
        runtime.metadata.labels = Some(BTreeMap::from([(
            MANAGED_BY_LABEL.to_string(),
            self.managed_by.clone(),
        )]));
        runtime
    }
}

fn description_or_default(description: Option<&str>) -> String {
    description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_APPLICATION_DESCRIPTION)
        .to_string()
}

fn convert_package(application: &str, package: &ApiPackage) -> Service {
    let credentials = package
        .credentials()
        .map(|credentials| EntryCredentials {
            credentials_type: credentials.credentials_type().as_str().to_string(),
            secret_name: credentials_secret_name(application, &package.id),
            authentication_url: credentials
                .authentication_url()
                .unwrap_or_default()
                .to_string(),
        })
        .unwrap_or_default();

    let request_parameters_secret_name = if package.request_parameters().is_some() {
        request_parameters_secret_name(application, &package.id)
    } else {
        String::new()
    };

    let references = |entry: ServiceEntry| ServiceEntry {
        credentials: credentials.clone(),
        request_parameters_secret_name: request_parameters_secret_name.clone(),
        ..entry
    };
    let api_entries = package.api_definitions.iter().map(api_entry).map(references);
    let event_entries = package
        .event_definitions
        .iter()
        .map(event_entry)
        .map(references);

    let name = if package.name.is_empty() {
        sanitize_resource_name(&package.id)
    } else {
        sanitize_resource_name(&package.name)
    };

    Service {
        id: package.id.clone(),
        name,
        display_name: package.name.clone(),
        description: description_or_default(package.description.as_deref()),
        entries: api_entries.chain(event_entries).collect(),
    }
}

fn api_entry(definition: &ApiDefinition) -> ServiceEntry {
    ServiceEntry {
        id: definition.id.clone(),
        name: definition.name.clone(),
        entry_type: ENTRY_TYPE_API.to_string(),
        target_url: definition.target_url.clone(),
        ..Default::default()
    }
}

fn event_entry(definition: &EventApiDefinition) -> ServiceEntry {
    ServiceEntry {
        id: definition.id.clone(),
        name: definition.name.clone(),
        entry_type: ENTRY_TYPE_EVENTS.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Auth, Credentials, OAuthCredentials, RequestParameters};

    fn package_with_auth(auth: Option<Auth>) -> ApiPackage {
        ApiPackage {
            id: "package1".to_string(),
            name: "Orders Package".to_string(),
            api_definitions: vec![ApiDefinition {
                id: "API1".to_string(),
                name: "orders".to_string(),
                target_url: "https://orders.example.com".to_string(),
                ..Default::default()
            }],
            event_definitions: vec![EventApiDefinition {
                id: "EventAPI1".to_string(),
                name: "order-events".to_string(),
                ..Default::default()
            }],
            default_instance_auth: auth,
            ..Default::default()
        }
    }

    fn application(packages: Vec<ApiPackage>) -> Application {
        Application {
            id: "id1".to_string(),
            name: "name1".to_string(),
            description: None,
            labels: BTreeMap::from([("team".to_string(), "orders".to_string())]),
            api_packages: packages,
        }
    }

    #[test]
    fn test_convert_marks_application_as_managed() {
        let converter = DefaultConverter::new("application-sync-controller");
        let runtime = converter.convert(&application(vec![]));

        assert_eq!(runtime.metadata.name.as_deref(), Some("name1"));
        assert!(runtime.is_managed());
        assert_eq!(
            runtime.spec.directory_metadata.as_ref().map(|m| m.application_id.as_str()),
            Some("id1")
        );
        assert_eq!(runtime.spec.description, "Description not provided");
        assert_eq!(runtime.spec.labels.get("team").map(String::as_str), Some("orders"));
        assert_eq!(
            runtime
                .metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(MANAGED_BY_LABEL))
                .map(String::as_str),
            Some("application-sync-controller")
        );
        assert!(runtime.spec.services.is_empty());
    }

    #[test]
    fn test_convert_records_secret_references_on_every_entry() {
        let auth = Auth {
            credentials: Some(Credentials::OAuth(OAuthCredentials {
                url: "https://auth.example.com/token".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            })),
            request_parameters: Some(RequestParameters {
                headers: Some(BTreeMap::from([(
                    "header1".to_string(),
                    vec!["value1".to_string()],
                )])),
                query_parameters: None,
            }),
        };
        let converter = DefaultConverter::new("application-sync-controller");
        let runtime = converter.convert(&application(vec![package_with_auth(Some(auth))]));

        let service = &runtime.spec.services[0];
        assert_eq!(service.id, "package1");
        assert_eq!(service.name, "orders-package");
        assert_eq!(service.display_name, "Orders Package");
        assert_eq!(service.entries.len(), 2);

        let api = &service.entries[0];
        assert_eq!(api.entry_type, ENTRY_TYPE_API);
        assert_eq!(api.credentials.credentials_type, "OAuth");
        assert_eq!(api.credentials.secret_name, "name1-package1");
        assert_eq!(
            api.credentials.authentication_url,
            "https://auth.example.com/token"
        );
        assert_eq!(api.request_parameters_secret_name, "params-name1-package1");

        let events = &service.entries[1];
        assert_eq!(events.entry_type, ENTRY_TYPE_EVENTS);
        assert_eq!(events.credentials, api.credentials);
        assert_eq!(events.request_parameters_secret_name, "params-name1-package1");
    }

    #[test]
    fn test_convert_without_auth_leaves_references_empty() {
        let converter = DefaultConverter::new("application-sync-controller");
        let runtime = converter.convert(&application(vec![package_with_auth(None)]));

        let service = &runtime.spec.services[0];
        assert_eq!(service.credentials_secret_name(), None);
        assert_eq!(service.request_parameters_secret_name(), None);
    }
}
