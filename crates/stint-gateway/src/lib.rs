//! Request-time session decisions for Stint.
//!
//! Every request to the product edge passes through one question: is this
//! caller authenticated, and if not, can the session be repaired without
//! bothering them? This crate answers it as a pure async function from
//! `(path, credential slots)` to a [`GatewayDecision`], with the transport
//! kept entirely outside.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  GatewayEngine::evaluate(path, store)          │
//! │                                                │
//! │  classify ─► local expiry ─► verify / refresh  │
//! └───────┬────────────────────────────┬───────────┘
//!         ▼                            ▼
//!   GatewayDecision             IdentityProvider
//!   Allow / AllowWithIdentity   (single-shot calls,
//!   Redirect / ClearAndAllow     retried by budget)
//! ```
//!
//! The supporting pieces are deliberately small: [`chunks`] splits oversized
//! credentials across cookie-sized slots, [`claims`] reads token expiry
//! without verifying signatures (advisory only; the provider stays the
//! authority), [`store`] is the slot port transports implement, and
//! [`refresh`] runs the bounded refresh cycle.

pub mod chunks;
pub mod claims;
pub mod config;
pub mod decision;
pub mod engine;
pub mod refresh;
pub mod store;

pub use chunks::{assemble_chunks, chunk_slot_name, count_slot_name, encode_chunks, read_chunked};
pub use claims::{Claims, decode_claims, is_expired, remaining_seconds};
pub use config::GatewayConfig;
pub use decision::{GatewayDecision, RouteClass, classify_route};
pub use engine::GatewayEngine;
pub use refresh::{RefreshOutcome, refresh_session};
pub use store::{
    MemoryTokenStore, TokenStore, clear_session, read_access_token, read_refresh_token,
    write_access_token,
};

// Re-export the provider surface so embedders need only one import.
pub use stint_idp::{
    IdentityProvider, IdpClient, IdpConfig, IdpError, MockIdp, RefreshGrant,
    SharedIdentityProvider, UserProfile,
};
