//! Common test utilities for reconciler integration tests
//!
//! Provides an in-memory harness and fixtures for directory applications and
//! their runtime counterparts.

#![allow(dead_code, reason = "Each test binary uses a different subset of the fixtures")]

use application_sync_controller::controller::converter::{Converter, DefaultConverter};
use application_sync_controller::controller::reconciler::{
    CompensationHook, FailedApplication, Reconciler,
};
use application_sync_controller::crd::RuntimeApplication;
use application_sync_controller::model::{
    ApiDefinition, ApiPackage, ApiSpec, ApiSpecType, Application, Auth, BasicCredentials,
    Credentials, EventApiDefinition, EventApiSpec, EventApiSpecType, OAuthCredentials,
    RequestParameters, SpecFormat,
};
use application_sync_controller::provider::memory::MemoryBackend;
use application_sync_controller::provider::ListFilter;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const MANAGED_BY: &str = "application-sync-controller";

/// Reconciler wired to a fresh in-memory backend
pub struct Harness {
    pub backend: MemoryBackend,
    pub reconciler: Reconciler,
    pub compensation: Arc<RecordingCompensation>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_concurrency(4)
    }

    pub fn with_concurrency(max_concurrent_applications: usize) -> Self {
        let backend = MemoryBackend::new();
        let compensation = Arc::new(RecordingCompensation::default());
        let reconciler = Reconciler::new(
            Arc::new(backend.applications()),
            Arc::new(DefaultConverter::new(MANAGED_BY)),
            Arc::new(backend.assets()),
            Arc::new(backend.credentials()),
            Arc::new(backend.request_parameters()),
        )
        .with_compensation(Arc::clone(&compensation) as Arc<dyn CompensationHook>)
        .with_max_concurrency(max_concurrent_applications)
        .with_list_filter(ListFilter::with_label_selector(format!(
            "app.kubernetes.io/managed-by={MANAGED_BY}"
        )));

        Self {
            backend,
            reconciler,
            compensation,
        }
    }

    /// Store the converted form of `application` as an existing managed record
    pub fn seed_managed(&self, application: &Application) -> RuntimeApplication {
        self.backend
            .seed(DefaultConverter::new(MANAGED_BY).convert(application))
    }
}

/// Compensation hook that keeps every failure it is handed
#[derive(Debug, Default)]
pub struct RecordingCompensation {
    failures: Mutex<Vec<FailedApplication>>,
}

impl RecordingCompensation {
    pub fn failures(&self) -> Vec<FailedApplication> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompensationHook for RecordingCompensation {
    async fn on_failure(&self, failed: FailedApplication) {
        self.failures.lock().unwrap().push(failed);
    }
}

pub fn fix_application(name: &str, id: &str, packages: Vec<ApiPackage>) -> Application {
    Application {
        id: id.to_string(),
        name: name.to_string(),
        description: Some("Description".to_string()),
        labels: BTreeMap::new(),
        api_packages: packages,
    }
}

pub fn fix_package(id: &str, auth: Option<Auth>) -> ApiPackage {
    ApiPackage {
        id: id.to_string(),
        name: format!("{id} name"),
        description: None,
        api_definitions: vec![fix_api_definition(&format!("API-{id}"), None)],
        event_definitions: vec![],
        default_instance_auth: auth,
    }
}

/// Package without API or event definitions
pub fn fix_package_without_definitions(id: &str, auth: Option<Auth>) -> ApiPackage {
    ApiPackage {
        api_definitions: vec![],
        ..fix_package(id, auth)
    }
}

/// Package with an OpenAPI spec and an AsyncAPI spec
pub fn fix_package_with_specs(id: &str, auth: Option<Auth>) -> ApiPackage {
    ApiPackage {
        api_definitions: vec![fix_api_definition(
            &format!("API-{id}"),
            Some(ApiSpec {
                data: "openapi: 3.0.0".to_string(),
                spec_type: ApiSpecType::OpenApi,
                format: SpecFormat::Yaml,
            }),
        )],
        event_definitions: vec![EventApiDefinition {
            id: format!("EventAPI-{id}"),
            name: "events".to_string(),
            description: None,
            spec: Some(EventApiSpec {
                data: "{}".to_string(),
                spec_type: EventApiSpecType::AsyncApi,
                format: SpecFormat::Json,
            }),
        }],
        ..fix_package(id, auth)
    }
}

pub fn fix_api_definition(id: &str, spec: Option<ApiSpec>) -> ApiDefinition {
    ApiDefinition {
        id: id.to_string(),
        name: format!("{id} name"),
        description: None,
        target_url: format!("https://{id}.example.com"),
        spec,
    }
}

pub fn fix_basic_auth(username: &str, password: &str) -> Auth {
    Auth {
        credentials: Some(Credentials::Basic(BasicCredentials {
            username: username.to_string(),
            password: password.to_string(),
        })),
        request_parameters: None,
    }
}

pub fn fix_oauth_auth() -> Auth {
    Auth {
        credentials: Some(Credentials::OAuth(OAuthCredentials {
            url: "https://auth.example.com/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        })),
        request_parameters: None,
    }
}

pub fn fix_request_parameters() -> RequestParameters {
    RequestParameters {
        headers: Some(BTreeMap::from([(
            "header1".to_string(),
            vec!["value1".to_string()],
        )])),
        query_parameters: Some(BTreeMap::from([(
            "query1".to_string(),
            vec!["value1".to_string(), "value2".to_string()],
        )])),
    }
}

pub fn fix_request_parameters_auth() -> Auth {
    Auth {
        credentials: None,
        request_parameters: Some(fix_request_parameters()),
    }
}

pub fn fix_full_auth() -> Auth {
    Auth {
        request_parameters: Some(fix_request_parameters()),
        ..fix_basic_auth("user", "password")
    }
}
