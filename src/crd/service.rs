//! # Services
//!
//! Runtime counterpart of an API package. Each entry records the secret
//! references the controller wrote for its package, which is how stale
//! secrets are found again once the package disappears from the directory.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Entry type for API definitions
pub const ENTRY_TYPE_API: &str = "API";

/// Entry type for event definitions
pub const ENTRY_TYPE_EVENTS: &str = "Events";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// API package id
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entries: Vec<ServiceEntry>,
}

impl Service {
    /// Credentials secret recorded by any entry of this service
    #[must_use]
    pub fn credentials_secret_name(&self) -> Option<&str> {
        self.entries
            .iter()
            .map(|entry| entry.credentials.secret_name.as_str())
            .find(|name| !name.is_empty())
    }

    /// Request-parameters secret recorded by any entry of this service
    #[must_use]
    pub fn request_parameters_secret_name(&self) -> Option<&str> {
        self.entries
            .iter()
            .map(|entry| entry.request_parameters_secret_name.as_str())
            .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `API` or `Events`
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub credentials: EntryCredentials,
    #[serde(default)]
    pub request_parameters_secret_name: String,
}

/// Credentials reference of an entry; all fields empty when the package has none
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryCredentials {
    /// `Basic` or `OAuth`
    #[serde(rename = "type", default)]
    pub credentials_type: String,
    #[serde(default)]
    pub secret_name: String,
    #[serde(default)]
    pub authentication_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(secret: &str, params: &str) -> ServiceEntry {
        ServiceEntry {
            id: "API1".to_string(),
            name: "Name".to_string(),
            entry_type: ENTRY_TYPE_API.to_string(),
            target_url: "www.example.com/1".to_string(),
            credentials: EntryCredentials {
                credentials_type: if secret.is_empty() {
                    String::new()
                } else {
                    "Basic".to_string()
                },
                secret_name: secret.to_string(),
                authentication_url: String::new(),
            },
            request_parameters_secret_name: params.to_string(),
        }
    }

    #[test]
    fn test_secret_references_are_independent() {
        let service = Service {
            id: "package1".to_string(),
            entries: vec![entry("", "params-name1-package1")],
            ..Default::default()
        };
        assert_eq!(service.credentials_secret_name(), None);
        assert_eq!(
            service.request_parameters_secret_name(),
            Some("params-name1-package1")
        );
    }

    #[test]
    fn test_secret_reference_found_on_any_entry() {
        let event_entry = ServiceEntry {
            id: "EventAPI1".to_string(),
            entry_type: ENTRY_TYPE_EVENTS.to_string(),
            ..Default::default()
        };
        let service = Service {
            id: "package1".to_string(),
            entries: vec![event_entry, entry("name1-package1", "")],
            ..Default::default()
        };
        assert_eq!(service.credentials_secret_name(), Some("name1-package1"));
        assert_eq!(service.request_parameters_secret_name(), None);
    }

    #[test]
    fn test_service_without_entries_has_no_references() {
        let service = Service {
            id: "package1".to_string(),
            ..Default::default()
        };
        assert_eq!(service.credentials_secret_name(), None);
        assert_eq!(service.request_parameters_secret_name(), None);
    }
}
