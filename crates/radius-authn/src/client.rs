//! RADIUS client boundary
//!
//! The resolver talks to the RADIUS server through [`RemoteAuthClient`]: one
//! request, one reply. Packet encoding, retransmission and dictionary parsing
//! all live behind this trait.

use crate::dictionary::Dictionary;
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Attributes returned by the RADIUS server, keyed by attribute name
pub type Attributes = Map<String, Value>;

/// Reply attribute that carries the packet code
pub const CODE_ATTRIBUTE: &str = "code";

pub const ACCESS_ACCEPT: &str = "Access-Accept";
pub const ACCESS_REJECT: &str = "Access-Reject";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Timed out waiting for response packet from server after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Options passed through to the client verbatim
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Time to wait for each reply
    pub timeout: Duration,
    /// Retransmissions after the first attempt
    pub retries: u32,
    pub dictionary: Option<Arc<Dictionary>>,
}

/// A single Access-Request
#[derive(Debug, Clone)]
pub struct RadiusRequest {
    /// `host:port`
    pub server: String,
    pub secret: SecretString,
    pub username: String,
    pub password: SecretString,
    pub options: RequestOptions,
}

/// Raw reply from the RADIUS server, including the `code` attribute
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusReply(pub Attributes);

impl RadiusReply {
    pub fn accept(attributes: Attributes) -> Self {
        let mut reply = Map::new();
        reply.insert(CODE_ATTRIBUTE.to_string(), Value::from(ACCESS_ACCEPT));
        reply.extend(attributes);
        RadiusReply(reply)
    }

    pub fn reject() -> Self {
        let mut reply = Map::new();
        reply.insert(CODE_ATTRIBUTE.to_string(), Value::from(ACCESS_REJECT));
        RadiusReply(reply)
    }

    pub fn code(&self) -> Option<&str> {
        self.0.get(CODE_ATTRIBUTE).and_then(Value::as_str)
    }
}

/// Outcome of a completed RADIUS exchange
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteAuthOutcome {
    /// Access-Accept with the reply attributes, minus the code
    Accept(Attributes),
    /// Anything other than Access-Accept
    Reject,
}

impl RemoteAuthOutcome {
    pub fn from_reply(reply: RadiusReply) -> Self {
        if reply.code() != Some(ACCESS_ACCEPT) {
            return RemoteAuthOutcome::Reject;
        }
        let mut attributes = reply.0;
        attributes.remove(CODE_ATTRIBUTE);
        RemoteAuthOutcome::Accept(attributes)
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, RemoteAuthOutcome::Accept(_))
    }
}

/// Performs one request/response exchange with a RADIUS server
#[async_trait]
pub trait RemoteAuthClient: Send + Sync {
    /// Send an Access-Request and wait for the reply.
    ///
    /// Retries, if any, happen inside this call; a timeout or transport
    /// failure is reported as [`TransportError`].
    async fn authenticate(&self, request: &RadiusRequest) -> Result<RadiusReply, TransportError>;
}
