//! Bounded session refresh.
//!
//! One refresh *cycle* is: read the refresh token, trade it for a grant,
//! persist the new credentials, verify the new access token once. The whole
//! cycle runs under the elapsed-time retry budget, so a transient failure at
//! any step restarts the cycle from the slot read; a half-applied credential
//! from a failed cycle is never carried into the next one as input.

use stint_idp::{IdentityProvider, IdpError, UserProfile, retry_for};

use crate::config::GatewayConfig;
use crate::store::{TokenStore, read_refresh_token, write_access_token};

/// Outcome of a bounded refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token is persisted and verified; the session continues.
    Refreshed {
        /// The freshly minted access token, already written to the store.
        access_token: String,
        /// Owner of the session, from the confirming verify call.
        profile: UserProfile,
    },
    /// The refresh credential is dead; only a fresh login can recover.
    SessionExpired,
    /// The provider could not be reached within the budget. Nothing about
    /// the session was decided; callers degrade instead of denying.
    Unavailable {
        /// Last failure seen before the budget ran out.
        detail: String,
    },
}

/// Refresh the session in the store, bounded by the configured budget.
///
/// A missing refresh token is terminal immediately: there is nothing to
/// retry with, and treating it as transient would stall every logged-out
/// request for the full budget.
pub async fn refresh_session(
    idp: &dyn IdentityProvider,
    store: &dyn TokenStore,
    config: &GatewayConfig,
) -> RefreshOutcome {
    if read_refresh_token(store, config).await.is_none() {
        tracing::debug!("No refresh token in session");
        return RefreshOutcome::SessionExpired;
    }

    let result = retry_for(
        config.refresh_budget,
        config.refresh_base_delay,
        config.refresh_max_delay,
        "session_refresh",
        || refresh_cycle(idp, store, config),
    )
    .await;

    match result {
        Ok((access_token, profile)) => {
            tracing::info!(user = %profile.id, "Session refreshed");
            RefreshOutcome::Refreshed {
                access_token,
                profile,
            }
        }
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "Refresh did not complete within budget");
            RefreshOutcome::Unavailable {
                detail: e.to_string(),
            }
        }
        Err(e) => {
            tracing::info!(error = %e, "Refresh rejected, session expired");
            RefreshOutcome::SessionExpired
        }
    }
}

async fn refresh_cycle(
    idp: &dyn IdentityProvider,
    store: &dyn TokenStore,
    config: &GatewayConfig,
) -> stint_idp::Result<(String, UserProfile)> {
    // Re-read every cycle: an earlier cycle may have rotated the slot.
    let refresh_token = match read_refresh_token(store, config).await {
        Some(token) => token,
        None => return Err(IdpError::Unauthorized("refresh token slot is empty".to_string())),
    };

    let grant = idp.refresh(&refresh_token).await?;

    let Some(access_token) = grant.access_token else {
        // The provider answered but declined to mint; the session is over.
        return Err(IdpError::Unauthorized(
            "refresh grant carried no access token".to_string(),
        ));
    };

    if let Some(rotated) = grant.refresh_token.as_deref() {
        store.set(&config.refresh_cookie, rotated).await;
    }
    write_access_token(store, config, &access_token).await;

    let profile = idp.verify(&access_token).await?;
    Ok((access_token, profile))
}
