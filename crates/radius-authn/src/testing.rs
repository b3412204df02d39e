//! Stub RADIUS server for tests
//!
//! [`StubRadiusServer`] implements [`RemoteAuthClient`] without touching the
//! network. Register users with [`StubRadiusServer::add_user`], authenticate
//! through the resolver, then assert on [`StubRadiusServer::last_request`] to
//! check what would have been sent. [`StubRadiusServer::fail_with`] makes
//! every exchange fail, which is how timeouts are simulated.

use crate::client::{Attributes, RadiusReply, RadiusRequest, RemoteAuthClient, TransportError};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What the stub saw of the most recent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `host:port`
    pub server: String,
    pub username: String,
    pub timeout: Duration,
    pub retries: u32,
    /// Path of the dictionary passed along, if any
    pub dictionary: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct StubUser {
    password: String,
    attributes: Attributes,
}

/// In-memory RADIUS server
#[derive(Debug, Default)]
pub struct StubRadiusServer {
    users: Mutex<HashMap<String, StubUser>>,
    last_request: Mutex<Option<RecordedRequest>>,
    failure: Mutex<Option<TransportError>>,
    requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StubRadiusServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. With no attributes the user gets `User-Name` and
    /// `Filter-Id: 60` in every Access-Accept.
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>, attributes: Attributes) {
        let username = username.into();
        let attributes = if attributes.is_empty() {
            let mut defaults = Attributes::new();
            defaults.insert("User-Name".to_string(), Value::from(username.clone()));
            defaults.insert("Filter-Id".to_string(), Value::from(60));
            defaults
        } else {
            attributes
        };
        lock(&self.users).insert(
            username,
            StubUser {
                password: password.into(),
                attributes,
            },
        );
    }

    /// Attributes returned on accept for `username`
    pub fn attributes(&self, username: &str) -> Option<Attributes> {
        lock(&self.users).get(username).map(|u| u.attributes.clone())
    }

    pub fn clear_users(&self) {
        lock(&self.users).clear();
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.last_request).clone()
    }

    pub fn clear_request(&self) {
        *lock(&self.last_request) = None;
    }

    /// Number of exchanges attempted so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fail every following exchange with `error`
    pub fn fail_with(&self, error: TransportError) {
        *lock(&self.failure) = Some(error);
    }

    /// Answer requests normally again
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }
}

#[async_trait]
impl RemoteAuthClient for StubRadiusServer {
    async fn authenticate(&self, request: &RadiusRequest) -> Result<RadiusReply, TransportError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_request) = Some(RecordedRequest {
            server: request.server.clone(),
            username: request.username.clone(),
            timeout: request.options.timeout,
            retries: request.options.retries,
            dictionary: request
                .options
                .dictionary
                .as_ref()
                .map(|d| d.path().to_path_buf()),
        });

        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }

        let users = lock(&self.users);
        match users.get(&request.username) {
            Some(user) if user.password == request.password.expose_secret() => {
                Ok(RadiusReply::accept(user.attributes.clone()))
            }
            _ => Ok(RadiusReply::reject()),
        }
    }
}
