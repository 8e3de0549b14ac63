//! # CRD Generation Tests
//!
//! Checks the generated `Application` CustomResourceDefinition.

use application_sync_controller::crd::{Application, APPLICATION_GROUP};
use kube::core::CustomResourceExt;

#[test]
fn test_crd_identity() {
    let crd = Application::crd();

    assert_eq!(crd.spec.group, APPLICATION_GROUP);
    assert_eq!(crd.spec.names.kind, "Application");
    assert_eq!(crd.spec.names.plural, "applications");
    assert_eq!(crd.spec.scope, "Cluster");
    assert_eq!(
        crd.metadata.name.as_deref(),
        Some("applications.applicationconnector.sync.io")
    );
    assert_eq!(crd.spec.versions.len(), 1);
    assert_eq!(crd.spec.versions[0].name, "v1alpha1");
}

#[test]
fn test_crd_schema_describes_services() {
    let yaml = serde_yaml::to_string(&Application::crd()).unwrap();

    assert!(yaml.contains("directoryMetadata"));
    assert!(yaml.contains("services"));
    assert!(yaml.contains("requestParametersSecretName"));
    assert!(yaml.contains("secretName"));
}
