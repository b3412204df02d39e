//! RADIUS login resolution
//!
//! This crate checks a username and password against a RADIUS server and ties
//! the result to a local identity record, ready to slot into a
//! chained-strategy login pipeline.
//!
//! # Features
//!
//! - Stable identity keys derived from username and server (pluggable)
//! - Find-or-provision of local records, persisted only after acceptance
//! - Configurable timeout, retries, dictionary and timeout-as-failure policy
//! - Success / soft-failure / pass-through strategy adapter
//! - JSON configuration and JSON-lines audit log
//! - In-memory and PostgreSQL identity stores
//!
//! # Example
//!
//! ```rust
//! use radius_authn::{
//!     AuthenticationRequest, MemoryIdentityStore, PipelineOutcome, RadiusAuthenticator,
//!     RadiusConfig, RadiusStrategy, StrategyPipeline, testing::StubRadiusServer,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Arc::new(StubRadiusServer::new());
//! server.add_user("alice", "password", Default::default());
//!
//! let authenticator = RadiusAuthenticator::builder(RadiusConfig::new("10.0.0.5", "secret"))
//!     .store(Arc::new(MemoryIdentityStore::new()))
//!     .client(server)
//!     .build()?;
//!
//! let pipeline = StrategyPipeline::new()
//!     .with(Arc::new(RadiusStrategy::new(Arc::new(authenticator))));
//!
//! let request = AuthenticationRequest::new()
//!     .with_field("email", "Alice")
//!     .with_password("password");
//!
//! match pipeline.run(&request).await? {
//!     PipelineOutcome::Authenticated { record, .. } => {
//!         assert_eq!(record.get_str("uid"), Some("alice@10.0.0.5"));
//!     }
//!     other => panic!("login failed: {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod client;
pub mod config;
pub mod credentials;
pub mod dictionary;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod store;
pub mod strategy;
pub mod testing;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use client::{
    Attributes, RadiusReply, RadiusRequest, RemoteAuthClient, RemoteAuthOutcome, RequestOptions,
    TransportError,
};
pub use config::{ConfigError, RadiusConfig};
pub use credentials::{AuthenticationRequest, CredentialPolicy, Credentials};
pub use dictionary::Dictionary;
pub use error::{AuthError, AuthResult};
pub use identity::{DefaultUidGenerator, IdentityKey, UidGenerator};
pub use resolver::{RadiusAuthenticator, RadiusAuthenticatorBuilder};
pub use store::{IdentityRecord, IdentityStore, Lookup, MemoryIdentityStore, StoreError, Validation};
pub use strategy::{
    ActivityCheck, AfterAuthentication, AlwaysActive, FailReason, PipelineOutcome, RadiusStrategy,
    SaveWithoutValidation, Strategy, StrategyOutcome, StrategyPipeline,
};
