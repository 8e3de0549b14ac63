//! # Store Errors
//!
//! Error type shared by every collaborator store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} '{name}' already exists")]
    Conflict { kind: &'static str, name: String },

    #[error("Kubernetes API request for {kind} '{name}' failed: {source}")]
    Kube {
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Classify a Kubernetes API error, mapping 404 and 409 to their own variants
    #[must_use]
    pub fn from_kube(kind: &'static str, name: &str, error: kube::Error) -> Self {
        match error {
            kube::Error::Api(ref api_err) if api_err.code == 404 => StoreError::NotFound {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(ref api_err) if api_err.code == 409 => StoreError::Conflict {
                kind,
                name: name.to_string(),
            },
            source => StoreError::Kube {
                kind,
                name: name.to_string(),
                source,
            },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let not_found = StoreError::NotFound {
            kind: "Secret",
            name: "name1-package1".to_string(),
        };
        assert!(not_found.is_not_found());
        assert_eq!(not_found.to_string(), "Secret 'name1-package1' not found");

        let other = StoreError::Other("some error".to_string());
        assert!(!other.is_not_found());
    }
}
