//! Chained-strategy adapter
//!
//! A host application tries its login strategies in order until one
//! succeeds. [`RadiusStrategy`] plugs the resolver into that chain:
//!
//! - fields it cannot handle: [`StrategyOutcome::Defer`], next strategy runs
//! - rejected credentials: [`FailReason::Invalid`], a soft failure, the next
//!   strategy still gets a go with the same request
//! - accepted but not active: [`FailReason::Inactive`], which halts the chain
//! - accepted and active: the post-authentication hook persists the record,
//!   then [`StrategyOutcome::Success`]
//!
//! Only the success path writes to the identity store.

use crate::audit::{AuditEntry, AuditEventType};
use crate::credentials::{AuthenticationRequest, PASSWORD_FIELD};
use crate::error::AuthResult;
use crate::resolver::RadiusAuthenticator;
use crate::store::{IdentityRecord, IdentityStore, StoreError, Validation};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Why a strategy refused a login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// Credentials were not accepted
    Invalid,
    /// Credentials were accepted but the account may not sign in
    Inactive(String),
}

impl FailReason {
    /// Whether the pipeline stops instead of trying the next strategy
    pub fn halts(&self) -> bool {
        matches!(self, FailReason::Inactive(_))
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::Invalid => f.write_str("invalid"),
            FailReason::Inactive(reason) => write!(f, "inactive: {}", reason),
        }
    }
}

/// What a single strategy reports back to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// No opinion; let the next strategy try
    Defer,
    Fail(FailReason),
    /// Authenticated; no further strategies run
    Success(IdentityRecord),
}

/// One login method in a chained pipeline
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    async fn authenticate(&self, request: &AuthenticationRequest) -> AuthResult<StrategyOutcome>;
}

/// Decides whether an authenticated record may sign in
pub trait ActivityCheck: Send + Sync {
    /// `Err` carries the message shown for the blocked account
    fn check(&self, record: &IdentityRecord) -> Result<(), String>;
}

impl<F> ActivityCheck for F
where
    F: Fn(&IdentityRecord) -> Result<(), String> + Send + Sync,
{
    fn check(&self, record: &IdentityRecord) -> Result<(), String> {
        self(record)
    }
}

/// Every record is active
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

impl ActivityCheck for AlwaysActive {
    fn check(&self, _record: &IdentityRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Runs after RADIUS accepted and the activity check passed.
///
/// Implementations may add side effects but must still persist the record.
#[async_trait]
pub trait AfterAuthentication: Send + Sync {
    async fn after_radius_authentication(
        &self,
        record: &mut IdentityRecord,
        store: &dyn IdentityStore,
    ) -> Result<(), StoreError>;
}

/// Save the record, skipping the store's validation rules.
///
/// RADIUS vouched for the user, so local validation (a missing password
/// digest, say) must not block the login.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveWithoutValidation;

#[async_trait]
impl AfterAuthentication for SaveWithoutValidation {
    async fn after_radius_authentication(
        &self,
        record: &mut IdentityRecord,
        store: &dyn IdentityStore,
    ) -> Result<(), StoreError> {
        store.save(record, Validation::Skip).await
    }
}

/// RADIUS login strategy
pub struct RadiusStrategy {
    authenticator: Arc<RadiusAuthenticator>,
    activity: Arc<dyn ActivityCheck>,
    after_authentication: Arc<dyn AfterAuthentication>,
}

impl RadiusStrategy {
    pub fn new(authenticator: Arc<RadiusAuthenticator>) -> Self {
        RadiusStrategy {
            authenticator,
            activity: Arc::new(AlwaysActive),
            after_authentication: Arc::new(SaveWithoutValidation),
        }
    }

    pub fn with_activity_check(mut self, check: impl ActivityCheck + 'static) -> Self {
        self.activity = Arc::new(check);
        self
    }

    pub fn with_after_authentication(mut self, hook: impl AfterAuthentication + 'static) -> Self {
        self.after_authentication = Arc::new(hook);
        self
    }

    pub fn authenticator(&self) -> &RadiusAuthenticator {
        &self.authenticator
    }

    /// The request carries every configured login field and a password
    fn applies(&self, request: &AuthenticationRequest) -> bool {
        let keys = &self.authenticator.policy().authentication_keys;
        !keys.is_empty()
            && keys.iter().all(|key| request.contains(key))
            && request.contains(PASSWORD_FIELD)
    }

    async fn audit(&self, event: AuditEventType, username: &str, uid: Option<&str>, details: Option<&str>) {
        let mut entry = AuditEntry::new(event)
            .with_username(username)
            .with_server(self.authenticator.config().server_address());
        if let Some(uid) = uid {
            entry = entry.with_uid(uid);
        }
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        self.authenticator.audit().log(entry).await;
    }
}

#[async_trait]
impl Strategy for RadiusStrategy {
    fn name(&self) -> &str {
        "radius"
    }

    async fn authenticate(&self, request: &AuthenticationRequest) -> AuthResult<StrategyOutcome> {
        if !self.applies(request) {
            debug!("RADIUS strategy does not apply to this request");
            return Ok(StrategyOutcome::Defer);
        }

        let creds = self.authenticator.credentials(request);
        let username = creds.username();
        self.audit(AuditEventType::AuthAttempt, username, None, None).await;

        if creds.password().trim().is_empty() {
            self.audit(AuditEventType::AuthFailure, username, None, Some("blank password"))
                .await;
            return Ok(StrategyOutcome::Fail(FailReason::Invalid));
        }

        let Some(lookup) = self.authenticator.resolve(request).await? else {
            self.audit(AuditEventType::AuthFailure, username, None, None).await;
            return Ok(StrategyOutcome::Fail(FailReason::Invalid));
        };

        let provisioned = lookup.is_built();
        let mut record = lookup.into_record();
        let uid = record
            .get_str(&self.authenticator.config().uid_field)
            .unwrap_or_default()
            .to_string();

        if let Err(reason) = self.activity.check(&record) {
            info!(username = %username, uid = %uid, reason = %reason, "RADIUS user is not active");
            self.audit(AuditEventType::Inactive, username, Some(&uid), Some(&reason))
                .await;
            return Ok(StrategyOutcome::Fail(FailReason::Inactive(reason)));
        }

        self.after_authentication
            .after_radius_authentication(&mut record, self.authenticator.store().as_ref())
            .await?;

        if provisioned && !record.is_new() {
            self.audit(AuditEventType::RecordProvisioned, username, Some(&uid), None)
                .await;
        }
        self.audit(AuditEventType::AuthSuccess, username, Some(&uid), None).await;
        info!(username = %username, uid = %uid, "RADIUS login succeeded");

        Ok(StrategyOutcome::Success(record))
    }
}

/// Final result of running every strategy
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Authenticated {
        strategy: String,
        record: IdentityRecord,
    },
    /// The last failure seen, or the halting one
    Rejected(FailReason),
    /// Every strategy deferred
    Unhandled,
}

/// Ordered list of strategies tried until one succeeds
#[derive(Default)]
pub struct StrategyPipeline {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Run strategies in order.
    ///
    /// Soft failures move on to the next strategy, halting failures stop the
    /// run, and errors are returned to the caller as-is.
    pub async fn run(&self, request: &AuthenticationRequest) -> AuthResult<PipelineOutcome> {
        let mut last_failure = None;

        for strategy in &self.strategies {
            match strategy.authenticate(request).await? {
                StrategyOutcome::Defer => continue,
                StrategyOutcome::Success(record) => {
                    return Ok(PipelineOutcome::Authenticated {
                        strategy: strategy.name().to_string(),
                        record,
                    });
                }
                StrategyOutcome::Fail(reason) => {
                    debug!(strategy = strategy.name(), reason = %reason, "Strategy failed");
                    if reason.halts() {
                        return Ok(PipelineOutcome::Rejected(reason));
                    }
                    last_failure = Some(reason);
                }
            }
        }

        Ok(last_failure.map_or(PipelineOutcome::Unhandled, PipelineOutcome::Rejected))
    }
}
