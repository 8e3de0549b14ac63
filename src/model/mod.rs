//! # Directory Model
//!
//! Desired-state types as produced by the upstream directory service.
//!
//! An [`Application`] is identified by its `name`, which is the reconciliation
//! key. Each [`ApiPackage`] is the unit of documentation and secret lifecycle
//! and maps to exactly one `Service` on the runtime `Application` resource.
//!
//! All types deserialize from the YAML/JSON snapshots consumed by the binary:
//!
//! ```yaml
//! applications:
//!   - id: 6d3c4c3e-0000-0000-0000-000000000001
//!     name: orders
//!     apiPackages:
//!       - id: package1
//!         name: Orders API
//!         apiDefinitions:
//!           - id: api1
//!             name: orders
//!             targetUrl: https://orders.example.com
//!         defaultInstanceAuth:
//!           credentials:
//!             type: Basic
//!             username: user
//!             password: secret
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Desired-state snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl DesiredState {
    /// Parse a snapshot. YAML is a superset of JSON so both formats are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid snapshot.
    pub fn from_yaml_str(document: &str) -> Result<Self, serde_yaml::Error> {
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(document)
    }
}

/// Application registered in the directory service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Externally assigned identifier
    pub id: String,
    /// Reconciliation key, unique across the desired set
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub api_packages: Vec<ApiPackage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPackage {
    /// Unique within the owning application
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub api_definitions: Vec<ApiDefinition>,
    #[serde(default)]
    pub event_definitions: Vec<EventApiDefinition>,
    #[serde(default)]
    pub default_instance_auth: Option<Auth>,
}

impl ApiPackage {
    /// Credentials to store for this package, if any
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.default_instance_auth
            .as_ref()
            .and_then(|auth| auth.credentials.as_ref())
    }

    /// Request parameters to store for this package, if any
    ///
    /// Parameters without a single header or query parameter count as absent.
    #[must_use]
    pub fn request_parameters(&self) -> Option<&RequestParameters> {
        self.default_instance_auth
            .as_ref()
            .and_then(|auth| auth.request_parameters.as_ref())
            .filter(|params| !params.is_empty())
    }

    /// Whether the package needs any secret material stored
    #[must_use]
    pub fn has_secret_material(&self) -> bool {
        self.credentials().is_some() || self.request_parameters().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub spec: Option<ApiSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventApiDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spec: Option<EventApiSpec>,
}

/// API specification document
///
/// Documents are text (JSON, YAML or XML) and must be valid UTF-8. They are
/// published verbatim as ConfigMap `data` values, which hold strings only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    pub data: String,
    #[serde(rename = "type")]
    pub spec_type: ApiSpecType,
    pub format: SpecFormat,
}

/// Event API specification document; UTF-8 text like [`ApiSpec`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventApiSpec {
    pub data: String,
    #[serde(rename = "type", default)]
    pub spec_type: EventApiSpecType,
    pub format: SpecFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiSpecType {
    #[serde(rename = "OPEN_API")]
    OpenApi,
    #[serde(rename = "ODATA")]
    OData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventApiSpecType {
    #[default]
    #[serde(rename = "ASYNC_API")]
    AsyncApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpecFormat {
    Json,
    Yaml,
    Xml,
}

/// Default instance authentication of a package
///
/// Credentials and request parameters have independent lifecycles: either,
/// both or neither may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub request_parameters: Option<RequestParameters>,
}

/// Credential material, one variant per supported scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Credentials {
    Basic(BasicCredentials),
    #[serde(rename = "OAuth")]
    OAuth(OAuthCredentials),
}

impl Credentials {
    #[must_use]
    pub fn credentials_type(&self) -> CredentialsType {
        match self {
            Credentials::Basic(_) => CredentialsType::Basic,
            Credentials::OAuth(_) => CredentialsType::OAuth,
        }
    }

    /// Token endpoint for OAuth credentials
    #[must_use]
    pub fn authentication_url(&self) -> Option<&str> {
        match self {
            Credentials::Basic(_) => None,
            Credentials::OAuth(oauth) => Some(oauth.url.as_str()),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredentials {
    /// Token endpoint
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Credential scheme as recorded on runtime entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialsType {
    Basic,
    OAuth,
}

impl CredentialsType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsType::Basic => "Basic",
            CredentialsType::OAuth => "OAuth",
        }
    }
}

impl fmt::Display for CredentialsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Additional headers and query parameters sent with every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<BTreeMap<String, Vec<String>>>,
}

impl RequestParameters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let empty = |map: &Option<BTreeMap<String, Vec<String>>>| {
            map.as_ref().is_none_or(BTreeMap::is_empty)
        };
        empty(&self.headers) && empty(&self.query_parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_state_from_yaml() {
        let document = r"
applications:
  - id: id1
    name: name1
    apiPackages:
      - id: package1
        apiDefinitions:
          - id: API1
            name: orders
            targetUrl: https://orders.example.com
            spec:
              data: '{}'
              type: OPEN_API
              format: JSON
        defaultInstanceAuth:
          credentials:
            type: OAuth
            url: https://auth.example.com
            clientId: client
            clientSecret: secret
          requestParameters:
            headers:
              header1: [value1]
";
        let state = DesiredState::from_yaml_str(document).unwrap();
        assert_eq!(state.applications.len(), 1);

        let package = &state.applications[0].api_packages[0];
        assert_eq!(
            package.credentials().map(Credentials::credentials_type),
            Some(CredentialsType::OAuth)
        );
        assert_eq!(
            package.credentials().and_then(Credentials::authentication_url),
            Some("https://auth.example.com")
        );
        assert!(package.request_parameters().is_some());
        assert_eq!(
            package.api_definitions[0].spec.as_ref().map(|s| s.spec_type),
            Some(ApiSpecType::OpenApi)
        );
    }

    #[test]
    fn test_spec_data_keeps_non_ascii_text() {
        let document = r"
applications:
  - id: id1
    name: name1
    apiPackages:
      - id: package1
        apiDefinitions:
          - id: API1
            spec:
              data: 'title: Größe – 注文'
              type: OPEN_API
              format: YAML
";
        let state = DesiredState::from_yaml_str(document).unwrap();
        let spec = state.applications[0].api_packages[0].api_definitions[0]
            .spec
            .as_ref()
            .unwrap();

        assert_eq!(spec.data, "title: Größe – 注文");
    }

    #[test]
    fn test_desired_state_empty_document() {
        let state = DesiredState::from_yaml_str("  \n").unwrap();
        assert!(state.applications.is_empty());
    }

    #[test]
    fn test_empty_request_parameters_count_as_absent() {
        let package = ApiPackage {
            id: "package1".to_string(),
            default_instance_auth: Some(Auth {
                credentials: None,
                request_parameters: Some(RequestParameters {
                    headers: Some(BTreeMap::new()),
                    query_parameters: None,
                }),
            }),
            ..Default::default()
        };

        assert!(package.request_parameters().is_none());
        assert!(package.credentials().is_none());
        assert!(!package.has_secret_material());
    }

    #[test]
    fn test_credentials_debug_masks_secrets() {
        let basic = BasicCredentials {
            username: "my-user".to_string(),
            password: "my-password".to_string(),
        };
        let oauth = OAuthCredentials {
            url: "https://auth.example.com".to_string(),
            client_id: "client".to_string(),
            client_secret: "very-secret".to_string(),
        };

        let basic_debug = format!("{basic:?}");
        let oauth_debug = format!("{oauth:?}");
        assert!(basic_debug.contains("my-user"));
        assert!(!basic_debug.contains("my-password"));
        assert!(!oauth_debug.contains("very-secret"));
    }
}
