//! The gateway decision engine.
//!
//! [`GatewayEngine::evaluate`] maps one request path plus the credential
//! slots attached to it onto a [`GatewayDecision`]. It is deliberately
//! infallible: every provider failure is consumed, logged, and folded into a
//! decision, because the alternative is a session gateway that turns its own
//! outages into user-facing errors.
//!
//! The branch order is fixed. Public routes short-circuit before any slot is
//! read; auth pages bounce live sessions into the app without network;
//! protected routes verify cheap-locally first and only then spend the
//! refresh budget.

use stint_idp::SharedIdentityProvider;

use crate::claims::is_expired;
use crate::config::GatewayConfig;
use crate::decision::{GatewayDecision, RouteClass, classify_route};
use crate::refresh::{RefreshOutcome, refresh_session};
use crate::store::{TokenStore, clear_session, read_access_token, read_refresh_token};

/// Request-time session gateway.
pub struct GatewayEngine {
    config: GatewayConfig,
    idp: SharedIdentityProvider,
}

impl GatewayEngine {
    /// Build an engine from its config and an identity provider.
    pub fn new(config: GatewayConfig, idp: SharedIdentityProvider) -> Self {
        Self { config, idp }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Decide what to do with a request for `path` carrying the credentials
    /// in `store`.
    pub async fn evaluate(&self, path: &str, store: &dyn TokenStore) -> GatewayDecision {
        let decision = match classify_route(path, &self.config) {
            RouteClass::Public => GatewayDecision::Allow,
            RouteClass::AuthPage => self.evaluate_auth_page(store).await,
            RouteClass::Protected => self.evaluate_protected(store).await,
        };
        tracing::debug!(path, decision = ?decision_kind(&decision), "Gateway decision");
        decision
    }

    /// Auth screens: a caller with a live session has no business here.
    async fn evaluate_auth_page(&self, store: &dyn TokenStore) -> GatewayDecision {
        let access = read_access_token(store, &self.config).await;
        let refresh = read_refresh_token(store, &self.config).await;

        if access.is_none() && refresh.is_none() {
            return GatewayDecision::Allow;
        }

        if let Some(token) = access.as_deref()
            && !is_expired(token, self.config.expiry_buffer)
        {
            // Zero network: the local check is enough to bounce.
            return GatewayDecision::Redirect(self.config.main_app_path.clone());
        }

        if refresh.is_some() {
            return match refresh_session(self.idp.as_ref(), store, &self.config).await {
                RefreshOutcome::Refreshed { .. } => {
                    GatewayDecision::Redirect(self.config.main_app_path.clone())
                }
                // Expired or unreachable either way the caller gets the
                // auth page it asked for.
                RefreshOutcome::SessionExpired | RefreshOutcome::Unavailable { .. } => {
                    GatewayDecision::Allow
                }
            };
        }

        // A stale access token and nothing to refresh with: wipe it so the
        // login ahead starts from a clean jar.
        clear_session(store, &self.config).await;
        GatewayDecision::ClearAndAllow
    }

    /// Protected routes: cheap local checks first, network only when they
    /// cannot settle it.
    async fn evaluate_protected(&self, store: &dyn TokenStore) -> GatewayDecision {
        let access = read_access_token(store, &self.config).await;
        let refresh = read_refresh_token(store, &self.config).await;

        if access.is_none() && refresh.is_none() {
            return GatewayDecision::Redirect(self.config.login_path.clone());
        }

        if let Some(token) = access.as_deref()
            && !is_expired(token, self.config.expiry_buffer)
        {
            return self.verify_for_identity(token).await;
        }

        // Access token expired or absent; the refresh token is the only way
        // forward. refresh_session handles the token-less case itself.
        match refresh_session(self.idp.as_ref(), store, &self.config).await {
            RefreshOutcome::Refreshed { profile, .. } => {
                GatewayDecision::AllowWithIdentity(profile)
            }
            RefreshOutcome::SessionExpired => {
                clear_session(store, &self.config).await;
                GatewayDecision::Redirect(self.config.login_path.clone())
            }
            RefreshOutcome::Unavailable { .. } => GatewayDecision::Allow,
        }
    }

    /// Single verify call for a locally valid token.
    ///
    /// Failure degrades to an anonymous pass-through: a genuinely revoked
    /// token still 401s on the client's next API call, while a provider
    /// outage must not log anyone out.
    async fn verify_for_identity(&self, token: &str) -> GatewayDecision {
        match self.idp.verify(token).await {
            Ok(profile) => GatewayDecision::AllowWithIdentity(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Verification failed, allowing without identity");
                GatewayDecision::Allow
            }
        }
    }
}

fn decision_kind(decision: &GatewayDecision) -> &'static str {
    match decision {
        GatewayDecision::Allow => "allow",
        GatewayDecision::AllowWithIdentity(_) => "allow_with_identity",
        GatewayDecision::Redirect(_) => "redirect",
        GatewayDecision::ClearAndAllow => "clear_and_allow",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::sync::Arc;
    use std::time::Duration;
    use stint_idp::{IdpError, MockIdp, RefreshGrant, UserProfile};

    fn make_token(exp_offset_secs: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::json!({"sub": "usr_1", "exp": exp}).to_string());
        format!("{}.{}.sig", header, payload)
    }

    fn fast_config() -> GatewayConfig {
        GatewayConfig::new().with_refresh_timing(
            Duration::from_millis(150),
            Duration::from_millis(10),
            Duration::from_millis(40),
        )
    }

    fn profile() -> UserProfile {
        UserProfile::new("usr_1", "ada@example.com").with_workspace("ws_9")
    }

    fn engine_with(config: GatewayConfig) -> (Arc<MockIdp>, GatewayEngine) {
        let idp = Arc::new(MockIdp::new());
        let engine = GatewayEngine::new(config, idp.clone());
        (idp, engine)
    }

    #[tokio::test]
    async fn test_public_route_allows_without_any_lookups() {
        let (idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new();

        let decision = engine.evaluate("/pricing", &store).await;

        assert_eq!(decision, GatewayDecision::Allow);
        assert_eq!(idp.verify_count(), 0);
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_protected_without_credentials_redirects_to_login() {
        let (idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new();

        let decision = engine.evaluate("/dashboard", &store).await;

        assert_eq!(
            decision,
            GatewayDecision::Redirect("/auth/login".to_string())
        );
        assert_eq!(idp.verify_count(), 0);
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_locale_prefixed_protected_route_guarded() {
        let (_idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new();

        let decision = engine.evaluate("/de/timesheets", &store).await;

        assert_eq!(
            decision,
            GatewayDecision::Redirect("/auth/login".to_string())
        );
    }

    #[tokio::test]
    async fn test_valid_token_verified_once_and_annotated() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(600))
            .await;

        let decision = engine.evaluate("/projects/42", &store).await;

        assert_eq!(decision, GatewayDecision::AllowWithIdentity(profile()));
        assert_eq!(idp.verify_count(), 1);
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_verifier_outage_degrades_to_anonymous_allow() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_verify(Err(IdpError::Network("connect refused".to_string())));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(600))
            .await;

        let decision = engine.evaluate("/tasks", &store).await;

        assert_eq!(decision, GatewayDecision::Allow);
        assert_eq!(idp.verify_count(), 1);
        // Degradation never burns the refresh budget on a valid token.
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_rechunks() {
        let config = fast_config().with_max_slot_len(10);
        let (idp, engine) = engine_with(config);
        let new_token = "refreshed-token-wider-than-ten-bytes".to_string();
        idp.push_refresh(Ok(RefreshGrant::new(new_token.clone())));
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/dashboard", &store).await;

        assert_eq!(decision, GatewayDecision::AllowWithIdentity(profile()));
        // The expired token was locally rejected without a verify call for
        // it; the single verify confirmed the refreshed one.
        assert_eq!(idp.refresh_count(), 1);
        assert_eq!(idp.verify_count(), 1);
        // The replacement landed chunked because it outgrows the slot limit.
        assert!(store.get("stint_session").await.is_none());
        assert_eq!(store.get("stint_session.chunks").await.as_deref(), Some("4"));
        assert_eq!(
            crate::store::read_access_token(&store, engine.config()).await,
            Some(new_token)
        );
    }

    #[tokio::test]
    async fn test_rejected_refresh_redirects_and_clears() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Err(IdpError::Unauthorized("revoked".to_string())));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await
            .with_slot("stint_refresh", "rt_dead")
            .await;

        let decision = engine.evaluate("/boards/1", &store).await;

        assert_eq!(
            decision,
            GatewayDecision::Redirect("/auth/login".to_string())
        );
        // Terminal rejection is not retried.
        assert_eq!(idp.refresh_count(), 1);
        // Every slot is gone from the response.
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_provider_outage_on_refresh_allows_anonymously() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Err(IdpError::Server {
            status: 503,
            message: "maintenance".to_string(),
        }));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/kanban", &store).await;

        assert_eq!(decision, GatewayDecision::Allow);
        assert!(idp.refresh_count() >= 2);
        // Nothing was decided about the session, so nothing was cleared.
        assert!(store.get("stint_refresh").await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_only_session_recovers() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Ok(RefreshGrant::new("at_new")));
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/settings", &store).await;

        assert_eq!(decision, GatewayDecision::AllowWithIdentity(profile()));
        assert_eq!(store.get("stint_session").await.as_deref(), Some("at_new"));
    }

    #[tokio::test]
    async fn test_auth_page_with_live_session_bounces_without_network() {
        let (idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(600))
            .await;

        let decision = engine.evaluate("/auth/login", &store).await;

        assert_eq!(decision, GatewayDecision::Redirect("/dashboard".to_string()));
        assert_eq!(idp.verify_count(), 0);
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_page_without_credentials_allows() {
        let (_idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new();

        let decision = engine.evaluate("/auth/login", &store).await;

        assert_eq!(decision, GatewayDecision::Allow);
    }

    #[tokio::test]
    async fn test_auth_page_expired_session_refreshes_then_bounces() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Ok(RefreshGrant::new("at_new")));
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/auth/login", &store).await;

        assert_eq!(decision, GatewayDecision::Redirect("/dashboard".to_string()));
    }

    #[tokio::test]
    async fn test_auth_page_dead_session_shows_auth_page() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Err(IdpError::Unauthorized("revoked".to_string())));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await
            .with_slot("stint_refresh", "rt_dead")
            .await;

        let decision = engine.evaluate("/auth/login", &store).await;

        assert_eq!(decision, GatewayDecision::Allow);
    }

    #[tokio::test]
    async fn test_auth_page_stale_token_without_refresh_clears() {
        let (idp, engine) = engine_with(fast_config());
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", make_token(-300))
            .await;

        let decision = engine.evaluate("/auth/login", &store).await;

        assert_eq!(decision, GatewayDecision::ClearAndAllow);
        assert!(store.is_empty().await);
        assert_eq!(idp.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_token_inside_expiry_buffer_treated_as_expired() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Ok(RefreshGrant::new("at_new")));
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            // 30s left, inside the 60s buffer: not worth verifying.
            .with_slot("stint_session", make_token(30))
            .await
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/dashboard", &store).await;

        assert_eq!(decision, GatewayDecision::AllowWithIdentity(profile()));
        assert_eq!(idp.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_token_with_refresh_recovers() {
        let (idp, engine) = engine_with(fast_config());
        idp.push_refresh(Ok(RefreshGrant::new("at_new")));
        idp.push_verify(Ok(profile()));
        let store = MemoryTokenStore::new()
            .with_slot("stint_session", "not-a-jwt")
            .await
            .with_slot("stint_refresh", "rt_1")
            .await;

        let decision = engine.evaluate("/dashboard", &store).await;

        assert_eq!(decision, GatewayDecision::AllowWithIdentity(profile()));
    }
}
