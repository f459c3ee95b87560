//! Identity provider interface and HTTP client.
//!
//! This module defines the [`IdentityProvider`] trait the gateway talks
//! through, the reqwest-backed [`IdpClient`], and a scripted [`MockIdp`] for
//! deterministic tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{IdpError, Result};
use crate::types::{RefreshGrant, UserProfile};

/// Default per-request timeout for identity provider calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path of the profile endpoint used to verify an access token.
pub const VERIFY_PATH: &str = "/v1/auth/me";

/// Path of the refresh endpoint.
pub const REFRESH_PATH: &str = "/v1/auth/refresh";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for the identity provider.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Base URL of the provider, stored without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl IdpConfig {
    /// Create a config pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Interface to the identity provider.
///
/// Both calls are single-shot. Whether a failure is retried, degraded around,
/// or surfaced is decided by the caller, which knows whether it is allowed to
/// hold the request up.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check an access token against the provider and return its owner.
    async fn verify(&self, access_token: &str) -> Result<UserProfile>;

    /// Trade a refresh token for a new session grant.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant>;
}

/// An identity provider that can be shared across tasks.
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Reqwest-backed [`IdentityProvider`].
pub struct IdpClient {
    config: IdpConfig,
    client: reqwest::Client,
}

impl IdpClient {
    /// Build a client from the given config.
    pub fn new(config: IdpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdpError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn error_for(response: reqwest::Response) -> IdpError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        IdpError::from_status(status, message)
    }
}

#[async_trait]
impl IdentityProvider for IdpClient {
    async fn verify(&self, access_token: &str) -> Result<UserProfile> {
        let response = self
            .client
            .get(self.url(VERIFY_PATH))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| IdpError::Serialization(format!("Failed to parse profile: {}", e)))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| IdpError::Serialization(format!("Failed to parse grant: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Identity Provider
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted identity provider for tests.
///
/// Outcomes are queued per call kind and consumed front to back; once a queue
/// is down to its last entry that entry is repeated for every further call.
/// Call counts are recorded so tests can assert exactly how many round-trips
/// a code path performed.
#[derive(Default)]
pub struct MockIdp {
    verify_outcomes: std::sync::Mutex<Vec<Result<UserProfile>>>,
    refresh_outcomes: std::sync::Mutex<Vec<Result<RefreshGrant>>>,
    verify_count: AtomicU32,
    refresh_count: AtomicU32,
}

impl MockIdp {
    /// Create a mock with empty outcome queues.
    ///
    /// An unscripted call fails with a non-retryable internal error, which
    /// shows up loudly in any test that forgot to script it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next `verify` call.
    pub fn push_verify(&self, outcome: Result<UserProfile>) {
        self.verify_outcomes.lock().unwrap().push(outcome);
    }

    /// Queue an outcome for the next `refresh` call.
    pub fn push_refresh(&self, outcome: Result<RefreshGrant>) {
        self.refresh_outcomes.lock().unwrap().push(outcome);
    }

    /// Number of `verify` calls made so far.
    pub fn verify_count(&self) -> u32 {
        self.verify_count.load(Ordering::SeqCst)
    }

    /// Number of `refresh` calls made so far.
    pub fn refresh_count(&self) -> u32 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    fn next<T: Clone>(queue: &std::sync::Mutex<Vec<Result<T>>>, kind: &str) -> Result<T> {
        let mut outcomes = queue.lock().unwrap();
        match outcomes.len() {
            0 => Err(IdpError::Internal(format!(
                "MockIdp: no scripted {} outcome",
                kind
            ))),
            1 => outcomes[0].clone(),
            _ => outcomes.remove(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdp {
    async fn verify(&self, _access_token: &str) -> Result<UserProfile> {
        self.verify_count.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.verify_outcomes, "verify")
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshGrant> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.refresh_outcomes, "refresh")
    }
}
