//! RADIUS authentication resolver
//!
//! Turns a login attempt into a local identity record:
//!
//! 1. extract the username and password from the submitted fields
//! 2. derive the identity key from the username and RADIUS server
//! 3. find the record with that key, or build an unsaved one
//! 4. check the credentials against the RADIUS server
//! 5. on Access-Accept, attach the reply attributes and return the record
//!
//! The resolver never writes to the store. Persisting a newly built record is
//! left to the post-authentication hook run by the strategy, so a rejected
//! login leaves no trace.

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::client::{RadiusRequest, RemoteAuthClient, RemoteAuthOutcome, RequestOptions};
use crate::config::{ConfigError, RadiusConfig};
use crate::credentials::{self, AuthenticationRequest, CredentialPolicy, Credentials};
use crate::dictionary::Dictionary;
use crate::error::AuthResult;
use crate::identity::{self, DefaultUidGenerator, IdentityKey, UidGenerator};
use crate::store::{self, IdentityRecord, IdentityStore, Lookup};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Resolves login attempts for one identity model
pub struct RadiusAuthenticator {
    config: RadiusConfig,
    policy: CredentialPolicy,
    uid_generator: Arc<dyn UidGenerator>,
    store: Arc<dyn IdentityStore>,
    client: Arc<dyn RemoteAuthClient>,
    dictionary: Option<Arc<Dictionary>>,
    audit: Arc<AuditLogger>,
}

/// Builder for [`RadiusAuthenticator`]
pub struct RadiusAuthenticatorBuilder {
    config: RadiusConfig,
    uid_generator: Arc<dyn UidGenerator>,
    store: Option<Arc<dyn IdentityStore>>,
    client: Option<Arc<dyn RemoteAuthClient>>,
    audit: Option<Arc<AuditLogger>>,
}

impl RadiusAuthenticatorBuilder {
    /// Replace the default `username@server` key generator
    pub fn uid_generator(mut self, generator: impl UidGenerator + 'static) -> Self {
        self.uid_generator = Arc::new(generator);
        self
    }

    pub fn store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn client(mut self, client: Arc<dyn RemoteAuthClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn audit_logger(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate the configuration and wire everything together.
    ///
    /// Fails on invalid settings, a missing store or client, an unstable key
    /// generator, or an unreadable dictionary path.
    pub fn build(self) -> Result<RadiusAuthenticator, ConfigError> {
        self.config.validate()?;
        identity::verify_deterministic(self.uid_generator.as_ref(), &self.config.server)?;

        let store = self
            .store
            .ok_or_else(|| ConfigError::Invalid("No identity store configured".to_string()))?;
        let client = self
            .client
            .ok_or_else(|| ConfigError::Invalid("No RADIUS client configured".to_string()))?;

        let dictionary = match &self.config.dictionary_path {
            Some(path) => Some(Arc::new(Dictionary::load(path)?)),
            None => None,
        };

        Ok(RadiusAuthenticator {
            policy: CredentialPolicy::from_config(&self.config),
            config: self.config,
            uid_generator: self.uid_generator,
            store,
            client,
            dictionary,
            audit: self.audit.unwrap_or_else(|| Arc::new(AuditLogger::disabled())),
        })
    }
}

impl RadiusAuthenticator {
    pub fn builder(config: RadiusConfig) -> RadiusAuthenticatorBuilder {
        RadiusAuthenticatorBuilder {
            config,
            uid_generator: Arc::new(DefaultUidGenerator),
            store: None,
            client: None,
            audit: None,
        }
    }

    pub fn config(&self) -> &RadiusConfig {
        &self.config
    }

    pub fn policy(&self) -> &CredentialPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Username and password for a login attempt
    pub fn credentials(&self, request: &AuthenticationRequest) -> Credentials {
        credentials::extract(request, &self.policy)
    }

    /// Identity key for a RADIUS username on the configured server
    pub fn uid_for(&self, username: &str) -> IdentityKey {
        self.uid_generator.generate(username, &self.config.server)
    }

    /// Find the record for a login attempt and check its credentials.
    ///
    /// Returns the record with `radius_attributes` set when the server
    /// accepts, `None` when it rejects (or times out under
    /// `handle_timeout_as_failure`). Nothing is persisted either way.
    pub async fn resolve(&self, request: &AuthenticationRequest) -> AuthResult<Option<Lookup>> {
        let creds = self.credentials(request);
        let uid = self.uid_for(creds.username());

        let mut lookup =
            store::find_or_build(self.store.as_ref(), &self.config.uid_field, &uid).await?;

        debug!(
            username = %creds.username(),
            uid = %uid,
            uid_field = %self.config.uid_field,
            existing = !lookup.is_built(),
            "Resolved local record for RADIUS login"
        );

        let accepted = self
            .valid_radius_password(lookup.record_mut(), creds.username(), creds.password())
            .await?;

        Ok(accepted.then_some(lookup))
    }

    /// Check `username` / `password` against the RADIUS server.
    ///
    /// On Access-Accept the reply attributes, minus the packet code, are
    /// stored on `record`. Any previous attributes are cleared first.
    pub async fn valid_radius_password(
        &self,
        record: &mut IdentityRecord,
        username: &str,
        password: &str,
    ) -> AuthResult<bool> {
        record.radius_attributes = None;

        let request = self.radius_request(username, password);

        let reply = match self.client.authenticate(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                self.audit
                    .log(
                        AuditEntry::new(AuditEventType::RemoteTimeout)
                            .with_username(username)
                            .with_server(request.server.as_str())
                            .with_details(e.to_string()),
                    )
                    .await;

                if self.config.handle_timeout_as_failure {
                    warn!(
                        username = %username,
                        server = %request.server,
                        error = %e,
                        "RADIUS request failed, treating as authentication failure"
                    );
                    return Ok(false);
                }
                error!(
                    username = %username,
                    server = %request.server,
                    error = %e,
                    "RADIUS request failed"
                );
                return Err(e.into());
            }
        };

        match RemoteAuthOutcome::from_reply(reply) {
            RemoteAuthOutcome::Accept(attributes) => {
                info!(
                    username = %username,
                    attributes = attributes.len(),
                    "RADIUS authentication successful"
                );
                record.radius_attributes = Some(attributes);
                Ok(true)
            }
            RemoteAuthOutcome::Reject => {
                warn!(username = %username, "RADIUS authentication rejected");
                Ok(false)
            }
        }
    }

    fn radius_request(&self, username: &str, password: &str) -> RadiusRequest {
        RadiusRequest {
            server: self.config.server_address(),
            secret: self.config.secret.clone(),
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            options: RequestOptions {
                timeout: self.config.timeout_duration(),
                retries: self.config.retries,
                dictionary: self.dictionary.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Attributes, TransportError};
    use crate::error::AuthError;
    use crate::store::{MemoryIdentityStore, Validation};
    use crate::testing::StubRadiusServer;
    use serde_json::json;
    use std::time::Duration;

    fn config() -> RadiusConfig {
        let mut config = RadiusConfig::new("1.2.3.4", "secret");
        config.authentication_keys = vec!["login".to_string()];
        config.case_insensitive_keys = vec![];
        config
    }

    fn setup(config: RadiusConfig) -> (RadiusAuthenticator, Arc<MemoryIdentityStore>, Arc<StubRadiusServer>) {
        let store = Arc::new(MemoryIdentityStore::new());
        let server = Arc::new(StubRadiusServer::new());
        server.add_user("testuser", "password", Attributes::new());
        let auth = RadiusAuthenticator::builder(config)
            .store(store.clone())
            .client(server.clone())
            .build()
            .unwrap();
        (auth, store, server)
    }

    fn login(password: &str) -> AuthenticationRequest {
        AuthenticationRequest::new()
            .with_field("login", "testuser")
            .with_password(password)
    }

    #[tokio::test]
    async fn test_builds_new_record_on_accept_without_saving() {
        let (auth, store, _server) = setup(config());

        let lookup = auth.resolve(&login("password")).await.unwrap().unwrap();
        assert!(lookup.is_built());
        assert_eq!(lookup.record().get_str("uid"), Some("testuser@1.2.3.4"));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_uses_existing_record() {
        let (auth, store, _server) = setup(config());
        let mut existing = IdentityRecord::with_key("uid", &auth.uid_for("testuser"));
        existing.set("name", "Test User");
        store.save(&mut existing, Validation::Skip).await.unwrap();

        let lookup = auth.resolve(&login("password")).await.unwrap().unwrap();
        assert!(!lookup.is_built());
        assert_eq!(lookup.record().id, existing.id);
        assert_eq!(lookup.record().get_str("name"), Some("Test User"));
    }

    #[tokio::test]
    async fn test_reject_returns_none() {
        let (auth, store, _server) = setup(config());
        assert!(auth.resolve(&login("wrongpassword")).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_passes_configured_options() {
        let mut config = config();
        config.port = 1813;
        config.timeout = 120;
        config.retries = 3;
        let (auth, _store, server) = setup(config);

        auth.resolve(&login("password")).await.unwrap();

        let request = server.last_request().unwrap();
        assert_eq!(request.server, "1.2.3.4:1813");
        assert_eq!(request.username, "testuser");
        assert_eq!(request.timeout, Duration::from_secs(120));
        assert_eq!(request.retries, 3);
        assert!(request.dictionary.is_none());
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_passes_preloaded_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dictionary"), "ATTRIBUTE Filter-Id 11 string\n").unwrap();
        let mut config = config();
        config.dictionary_path = Some(dir.path().to_path_buf());
        let (auth, _store, server) = setup(config);

        auth.resolve(&login("password")).await.unwrap();
        assert_eq!(
            server.last_request().unwrap().dictionary.as_deref(),
            Some(dir.path())
        );
    }

    #[tokio::test]
    async fn test_attributes_stored_without_code() {
        let (auth, _store, server) = setup(config());
        let mut record = IdentityRecord::default();

        assert!(auth.valid_radius_password(&mut record, "testuser", "password").await.unwrap());
        let attributes = record.radius_attributes.clone().unwrap();
        assert_eq!(Some(attributes), server.attributes("testuser"));
        assert_eq!(record.radius_attributes.unwrap().get("Filter-Id"), Some(&json!(60)));
    }

    #[tokio::test]
    async fn test_failed_check_clears_previous_attributes() {
        let (auth, _store, _server) = setup(config());
        let mut record = IdentityRecord::default();

        auth.valid_radius_password(&mut record, "testuser", "password").await.unwrap();
        assert!(record.radius_attributes.is_some());

        assert!(!auth.valid_radius_password(&mut record, "testuser", "nope").await.unwrap());
        assert!(record.radius_attributes.is_none());
    }

    #[tokio::test]
    async fn test_timeout_propagates_by_default() {
        let (auth, store, server) = setup(config());
        server.fail_with(TransportError::Timeout(Duration::from_secs(60)));

        let err = auth.resolve(&login("password")).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(TransportError::Timeout(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_timeout_as_failure() {
        let mut config = config();
        config.handle_timeout_as_failure = true;
        let (auth, store, server) = setup(config);
        server.fail_with(TransportError::Timeout(Duration::from_secs(60)));

        assert!(auth.resolve(&login("password")).await.unwrap().is_none());
        assert!(store.is_empty().await);

        server.recover();
        assert!(auth.resolve(&login("password")).await.unwrap().is_some());
    }

    #[test]
    fn test_build_requires_store_and_client() {
        assert!(RadiusAuthenticator::builder(config()).build().is_err());

        let result = RadiusAuthenticator::builder(config())
            .store(Arc::new(MemoryIdentityStore::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_bad_dictionary_path() {
        let mut config = config();
        config.dictionary_path = Some("/nonexistent/dictionary".into());
        let result = RadiusAuthenticator::builder(config)
            .store(Arc::new(MemoryIdentityStore::new()))
            .client(Arc::new(StubRadiusServer::new()))
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_custom_uid_generator() {
        let auth = RadiusAuthenticator::builder(config())
            .uid_generator(|username: &str, server: &str| format!("{}_{}", username, server))
            .store(Arc::new(MemoryIdentityStore::new()))
            .client(Arc::new(StubRadiusServer::new()))
            .build()
            .unwrap();
        assert_eq!(auth.uid_for("test").as_str(), "test_1.2.3.4");
    }
}
