//! Identity key generation
//!
//! An identity key ties a RADIUS username on a given server to exactly one
//! local record. Generators must be pure: re-authenticating the same user has
//! to land on the same record.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key identifying the local record for a (username, server) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        IdentityKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps a RADIUS username and server address to an identity key
pub trait UidGenerator: Send + Sync {
    fn generate(&self, username: &str, server: &str) -> IdentityKey;
}

impl<F> UidGenerator for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn generate(&self, username: &str, server: &str) -> IdentityKey {
        IdentityKey(self(username, server))
    }
}

/// `username@server`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUidGenerator;

impl UidGenerator for DefaultUidGenerator {
    fn generate(&self, username: &str, server: &str) -> IdentityKey {
        IdentityKey(format!("{}@{}", username, server))
    }
}

const PROBE_USERNAME: &str = "radius-probe";

/// Reject generators that produce empty or unstable keys.
///
/// This only probes one input, so it catches the obvious cases (random or
/// time-based keys) rather than proving purity.
pub fn verify_deterministic(generator: &dyn UidGenerator, server: &str) -> Result<(), ConfigError> {
    let first = generator.generate(PROBE_USERNAME, server);
    let second = generator.generate(PROBE_USERNAME, server);

    if first.as_str().is_empty() {
        return Err(ConfigError::Invalid(
            "UID generator returned an empty key".to_string(),
        ));
    }
    if first != second {
        return Err(ConfigError::Invalid(format!(
            "UID generator is not deterministic: '{}' != '{}'",
            first, second
        )));
    }
    Ok(())
}
