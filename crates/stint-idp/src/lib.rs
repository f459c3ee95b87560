//! Identity provider client for the Stint session gateway.
//!
//! The gateway needs exactly two things from the identity provider: confirm
//! that an access token is still honored (`verify`) and trade a refresh token
//! for a fresh grant (`refresh`). Both are exposed through the
//! [`IdentityProvider`] trait so the decision engine can be exercised against
//! a scripted [`MockIdp`] without a network.
//!
//! The crate also owns the failure taxonomy ([`IdpError`]) and the retry
//! primitives built on it. Classification is strict about one thing: a 401 is
//! terminal no matter how it was produced, because replaying a rejected
//! credential can never succeed and only delays the user's redirect.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{
    DEFAULT_TIMEOUT, IdentityProvider, IdpClient, IdpConfig, MockIdp, REFRESH_PATH,
    SharedIdentityProvider, VERIFY_PATH,
};
pub use error::{IdpError, Result, is_retryable};
pub use retry::{retry_for, retry_with_backoff};
pub use types::{RefreshGrant, UserProfile};
