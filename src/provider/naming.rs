//! # Naming
//!
//! Names of the objects written for a package. The converter records these
//! names on runtime entries and the stores create objects under the same
//! names, so both sides must go through these functions.

/// Prefix of request-parameter secret names
pub const REQUEST_PARAMETERS_SECRET_PREFIX: &str = "params";

/// Prefix of documentation asset bundle names
pub const ASSETS_BUNDLE_PREFIX: &str = "docs";

/// Maximum length of a DNS-1123 subdomain
const MAX_NAME_LENGTH: usize = 253;

/// Credentials secret: `{application}-{package}`
#[must_use]
pub fn credentials_secret_name(application: &str, package_id: &str) -> String {
    sanitize_resource_name(&format!("{application}-{package_id}"))
}

/// Request-parameters secret: `params-{application}-{package}`
#[must_use]
pub fn request_parameters_secret_name(application: &str, package_id: &str) -> String {
    sanitize_resource_name(&format!(
        "{REQUEST_PARAMETERS_SECRET_PREFIX}-{application}-{package_id}"
    ))
}

/// Documentation bundle: `docs-{package}`
#[must_use]
pub fn assets_bundle_name(package_id: &str) -> String {
    sanitize_resource_name(&format!("{ASSETS_BUNDLE_PREFIX}-{package_id}"))
}

/// Sanitize a name into a DNS-1123 subdomain
///
/// Lower-cases, replaces every character outside `[a-z0-9.-]` with `-`,
/// collapses consecutive dashes and trims dashes and dots at both ends.
#[must_use]
pub fn sanitize_resource_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' {
            c
        } else {
            '-'
        };
        if c == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(c);
    }

    let trimmed = trim_edges(&sanitized);
    if trimmed.len() <= MAX_NAME_LENGTH {
        return trimmed.to_string();
    }
    // Only ASCII remains at this point, byte slicing is safe
    trim_edges(&trimmed[..MAX_NAME_LENGTH]).to_string()
}

fn trim_edges(name: &str) -> &str {
    name.trim_matches(|c| c == '-' || c == '.')
}

/// Sanitize a key for use in ConfigMap data (`[-._a-zA-Z0-9]+`)
#[must_use]
pub fn sanitize_data_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_secret_name() {
        assert_eq!(credentials_secret_name("name1", "package2"), "name1-package2");
    }

    #[test]
    fn test_request_parameters_secret_name() {
        assert_eq!(
            request_parameters_secret_name("name1", "package2"),
            "params-name1-package2"
        );
    }

    #[test]
    fn test_assets_bundle_name() {
        assert_eq!(assets_bundle_name("Package_1"), "docs-package-1");
    }

    #[test]
    fn test_sanitize_upper_case_and_invalid_chars() {
        assert_eq!(sanitize_resource_name("My App/Orders"), "my-app-orders");
        assert_eq!(sanitize_resource_name("a__b"), "a-b");
    }

    #[test]
    fn test_sanitize_trims_edges() {
        assert_eq!(sanitize_resource_name("--name1--"), "name1");
        assert_eq!(sanitize_resource_name(".name1."), "name1");
    }

    #[test]
    fn test_sanitize_keeps_uuid_package_ids() {
        assert_eq!(
            sanitize_resource_name("orders-6d3c4c3e-be4f-11eb-8529-0242ac130003"),
            "orders-6d3c4c3e-be4f-11eb-8529-0242ac130003"
        );
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_resource_name(&long).len(), 253);
    }

    #[test]
    fn test_sanitize_data_key() {
        assert_eq!(sanitize_data_key("openapi-API 1.json"), "openapi-API_1.json");
    }
}
