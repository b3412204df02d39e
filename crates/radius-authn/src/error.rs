use crate::client::TransportError;
use crate::config::ConfigError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that abort an authentication attempt.
///
/// Rejected credentials are not errors; they come back as `None` from the
/// resolver and as a soft failure from the strategy.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("RADIUS transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Identity store error: {0}")]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;
