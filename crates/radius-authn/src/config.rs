use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// RADIUS authentication configuration for one identity model.
///
/// Built once when the model is wired up and never mutated afterwards; the
/// authenticator keeps its own copy for the lifetime of every resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusConfig {
    /// Hostname or IP address of the RADIUS server
    pub server: String,

    /// RADIUS authentication port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret configured on the RADIUS server
    #[serde(serialize_with = "serialize_secret")]
    pub secret: SecretString,

    /// Seconds to wait for a reply before the client gives up
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Number of times the client retries an unanswered request
    #[serde(default)]
    pub retries: u32,

    /// Record field that holds the identity key
    #[serde(default = "default_uid_field")]
    pub uid_field: String,

    /// Directory (or file) holding RADIUS dictionary definitions
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,

    /// Treat a timeout or transport failure as rejected credentials
    /// instead of an error
    #[serde(default)]
    pub handle_timeout_as_failure: bool,

    /// Accepted login field names; the first one carries the RADIUS username
    #[serde(default = "default_authentication_keys")]
    pub authentication_keys: Vec<String>,

    /// Login field names whose values are lower-cased before use
    #[serde(default = "default_case_insensitive_keys")]
    pub case_insensitive_keys: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

/// Longest per-request timeout accepted, in seconds
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Most retransmissions accepted per request
pub const MAX_RETRIES: u32 = 100;

fn default_port() -> u16 {
    1812
}

fn default_timeout() -> u64 {
    60
}

fn default_uid_field() -> String {
    "uid".to_string()
}

fn default_authentication_keys() -> Vec<String> {
    vec!["email".to_string()]
}

fn default_case_insensitive_keys() -> Vec<String> {
    vec!["email".to_string()]
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl RadiusConfig {
    /// Create a configuration with every optional setting at its default
    pub fn new(server: impl Into<String>, secret: impl Into<String>) -> Self {
        let secret: String = secret.into();
        RadiusConfig {
            server: server.into(),
            port: default_port(),
            secret: SecretString::from(secret),
            timeout: default_timeout(),
            retries: 0,
            uid_field: default_uid_field(),
            dictionary_path: None,
            handle_timeout_as_failure: false,
            authentication_keys: default_authentication_keys(),
            case_insensitive_keys: default_case_insensitive_keys(),
            log_level: None,
            audit_log_path: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: RadiusConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// `host:port` address of the RADIUS server
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Worst-case time a single resolution may block on the remote server
    pub fn worst_case_wait(&self) -> Duration {
        self.timeout_duration()
            .saturating_mul(self.retries.saturating_add(1))
    }

    /// The login field that carries the RADIUS username
    pub fn primary_key(&self) -> &str {
        self.authentication_keys
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Invalid("RADIUS server cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }

        if self.secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }

        if self.timeout == 0 {
            return Err(ConfigError::Invalid("Timeout cannot be 0".to_string()));
        }

        if self.timeout > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "Timeout cannot exceed {} seconds",
                MAX_TIMEOUT_SECS
            )));
        }

        if self.retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "Retries cannot exceed {}",
                MAX_RETRIES
            )));
        }

        if self.uid_field.trim().is_empty() {
            return Err(ConfigError::Invalid("UID field cannot be empty".to_string()));
        }

        match self.authentication_keys.first() {
            None => {
                return Err(ConfigError::Invalid(
                    "At least one authentication key is required".to_string(),
                ));
            }
            Some(key) if key == "password" => {
                return Err(ConfigError::Invalid(
                    "The password field cannot be the primary authentication key".to_string(),
                ));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Create an example configuration
    pub fn example() -> Self {
        RadiusConfig {
            log_level: Some("info".to_string()),
            audit_log_path: Some("/var/log/radius-authn/audit.log".to_string()),
            ..RadiusConfig::new("127.0.0.1", "testing123")
        }
    }
}
