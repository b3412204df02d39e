//! Login credential extraction
//!
//! Pulls the RADIUS username and password out of the fields submitted with a
//! login attempt. Extraction never fails: absent fields stay absent and the
//! remote check rejects them.

use crate::config::RadiusConfig;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Name of the field that carries the password
pub const PASSWORD_FIELD: &str = "password";

/// Fields submitted with a single login attempt
#[derive(Debug, Clone, Default)]
pub struct AuthenticationRequest {
    fields: HashMap<String, String>,
}

impl AuthenticationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a submitted field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add the password field
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_field(PASSWORD_FIELD, password)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthenticationRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AuthenticationRequest {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Which login fields are accepted and which are case insensitive
#[derive(Debug, Clone)]
pub struct CredentialPolicy {
    pub authentication_keys: Vec<String>,
    pub case_insensitive_keys: Vec<String>,
}

impl CredentialPolicy {
    pub fn from_config(config: &RadiusConfig) -> Self {
        CredentialPolicy {
            authentication_keys: config.authentication_keys.clone(),
            case_insensitive_keys: config.case_insensitive_keys.clone(),
        }
    }

    /// The first accepted login field
    pub fn primary_key(&self) -> Option<&str> {
        self.authentication_keys.first().map(String::as_str)
    }

    fn is_case_insensitive(&self, key: &str) -> bool {
        self.case_insensitive_keys.iter().any(|k| k == key)
    }
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        CredentialPolicy {
            authentication_keys: vec!["email".to_string()],
            case_insensitive_keys: vec!["email".to_string()],
        }
    }
}

/// Username and password extracted from a login attempt
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl Credentials {
    /// Username, or an empty string when none was submitted
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// Password, or an empty string when none was submitted
    pub fn password(&self) -> &str {
        self.password
            .as_ref()
            .map(|p| p.expose_secret())
            .unwrap_or_default()
    }
}

/// Extract the RADIUS username and password from a login attempt.
///
/// The username comes from the primary authentication key and is lower-cased
/// when that key is listed as case insensitive.
pub fn extract(request: &AuthenticationRequest, policy: &CredentialPolicy) -> Credentials {
    let username = policy.primary_key().and_then(|key| {
        request.get(key).map(|value| {
            if policy.is_case_insensitive(key) {
                value.to_lowercase()
            } else {
                value.to_string()
            }
        })
    });

    Credentials {
        username,
        password: request
            .get(PASSWORD_FIELD)
            .map(|p| SecretString::from(p.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(keys: &[&str], insensitive: &[&str]) -> CredentialPolicy {
        CredentialPolicy {
            authentication_keys: keys.iter().map(|k| k.to_string()).collect(),
            case_insensitive_keys: insensitive.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_extracts_using_first_authentication_key() {
        let request = AuthenticationRequest::new()
            .with_field("username", "cbascom")
            .with_field("domain", "example.org")
            .with_password("testing");

        let creds = extract(&request, &policy(&["username", "domain"], &[]));
        assert_eq!(creds.username(), "cbascom");
        assert_eq!(creds.password(), "testing");
    }

    #[test]
    fn test_case_insensitive_key_is_lowercased() {
        let p = policy(&["login"], &["login"]);
        let upper = extract(&AuthenticationRequest::new().with_field("login", "Alice"), &p);
        let lower = extract(&AuthenticationRequest::new().with_field("login", "alice"), &p);
        assert_eq!(upper.username, lower.username);
        assert_eq!(upper.username(), "alice");
    }

    #[test]
    fn test_case_sensitive_key_is_preserved() {
        let p = policy(&["login"], &["email"]);
        let upper = extract(&AuthenticationRequest::new().with_field("login", "Alice"), &p);
        let lower = extract(&AuthenticationRequest::new().with_field("login", "alice"), &p);
        assert_ne!(upper.username, lower.username);
        assert_eq!(upper.username(), "Alice");
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let creds = extract(&AuthenticationRequest::new(), &CredentialPolicy::default());
        assert!(creds.username.is_none());
        assert!(creds.password.is_none());
        assert_eq!(creds.username(), "");
        assert_eq!(creds.password(), "");
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let request = AuthenticationRequest::new()
            .with_field("email", "bob")
            .with_password("hunter2");
        let creds = extract(&request, &CredentialPolicy::default());
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_request_from_pairs() {
        let request: AuthenticationRequest =
            [("email", "carol"), ("password", "pw")].into_iter().collect();
        assert!(request.contains("email"));
        assert_eq!(request.get(PASSWORD_FIELD), Some("pw"));
    }
}
