//! Gateway configuration.
//!
//! Everything the decision engine keys off lives in one explicit struct:
//! slot names, route tables, redirect targets, and the timing contract. The
//! process boundary (`STINT_*` environment variables) is bridged in exactly
//! one place, [`GatewayConfig::from_env`]; nothing else in the crate touches
//! the environment.

use std::time::Duration;

/// Default cookie slot holding the access token (or its chunk set).
pub const DEFAULT_ACCESS_COOKIE: &str = "stint_session";

/// Default cookie slot holding the refresh token.
pub const DEFAULT_REFRESH_COOKIE: &str = "stint_refresh";

/// Default login screen, the redirect target for unauthenticated visits.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Default landing page for authenticated users bounced off auth screens.
pub const DEFAULT_MAIN_APP_PATH: &str = "/dashboard";

/// Default access-denied page; intercepted but never guarded.
pub const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// How close to its `exp` a token is treated as already expired.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Wall-clock budget for a whole refresh attempt, retries included.
pub const DEFAULT_REFRESH_BUDGET: Duration = Duration::from_millis(3000);

/// First backoff step inside the refresh budget.
pub const DEFAULT_REFRESH_BASE_DELAY: Duration = Duration::from_millis(100);

/// Per-step backoff ceiling inside the refresh budget.
pub const DEFAULT_REFRESH_MAX_DELAY: Duration = Duration::from_millis(3200);

/// Pause before the single re-read of an incomplete chunk set.
pub const DEFAULT_CHUNK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Largest value written into a single cookie slot, in bytes.
///
/// Leaves room for the name and attributes under the common 4096-byte
/// per-cookie browser limit.
pub const DEFAULT_MAX_SLOT_LEN: usize = 3800;

/// Upper bound on chunk slots read or cleared, whatever the count slot claims.
pub const DEFAULT_MAX_CHUNK_COUNT: usize = 16;

/// Settings for the decision engine.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Cookie slot for the access token.
    pub access_cookie: String,
    /// Cookie slot for the refresh token.
    pub refresh_cookie: String,
    /// Redirect target for unauthenticated protected visits.
    pub login_path: String,
    /// Redirect target for authenticated visits to auth screens.
    pub main_app_path: String,
    /// Access-denied page, classified public.
    pub unauthorized_path: String,
    /// Locale segments stripped before route matching.
    pub locales: Vec<String>,
    /// Route prefixes serving the login/auth screens.
    pub auth_prefixes: Vec<String>,
    /// Route prefixes that require a session.
    pub protected_prefixes: Vec<String>,
    /// Local-expiry slack; see [`DEFAULT_EXPIRY_BUFFER`].
    pub expiry_buffer: Duration,
    /// Refresh time budget; see [`DEFAULT_REFRESH_BUDGET`].
    pub refresh_budget: Duration,
    /// First refresh backoff step.
    pub refresh_base_delay: Duration,
    /// Refresh backoff ceiling per step.
    pub refresh_max_delay: Duration,
    /// Chunk re-read pause.
    pub chunk_retry_delay: Duration,
    /// Per-slot byte limit for cookie values.
    pub max_slot_len: usize,
    /// Chunk slot cap.
    pub max_chunk_count: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            access_cookie: DEFAULT_ACCESS_COOKIE.to_string(),
            refresh_cookie: DEFAULT_REFRESH_COOKIE.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            main_app_path: DEFAULT_MAIN_APP_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
            locales: vec_of(&["en", "de", "fr", "es"]),
            auth_prefixes: vec_of(&["/auth"]),
            protected_prefixes: vec_of(&[
                "/dashboard",
                "/projects",
                "/tasks",
                "/boards",
                "/kanban",
                "/meet",
                "/timesheets",
                "/profile",
                "/settings",
            ]),
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            refresh_budget: DEFAULT_REFRESH_BUDGET,
            refresh_base_delay: DEFAULT_REFRESH_BASE_DELAY,
            refresh_max_delay: DEFAULT_REFRESH_MAX_DELAY,
            chunk_retry_delay: DEFAULT_CHUNK_RETRY_DELAY,
            max_slot_len: DEFAULT_MAX_SLOT_LEN,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
        }
    }
}

impl GatewayConfig {
    /// Create a config with the stock defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults overridden by `STINT_*` environment
    /// variables. Unparseable numeric overrides are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_string("STINT_ACCESS_COOKIE") {
            config.access_cookie = value;
        }
        if let Some(value) = env_string("STINT_REFRESH_COOKIE") {
            config.refresh_cookie = value;
        }
        if let Some(value) = env_string("STINT_LOGIN_PATH") {
            config.login_path = value;
        }
        if let Some(value) = env_string("STINT_MAIN_APP_PATH") {
            config.main_app_path = value;
        }
        if let Some(value) = env_string("STINT_UNAUTHORIZED_PATH") {
            config.unauthorized_path = value;
        }
        if let Some(values) = env_list("STINT_LOCALES") {
            config.locales = values;
        }
        if let Some(values) = env_list("STINT_AUTH_PREFIXES") {
            config.auth_prefixes = values;
        }
        if let Some(values) = env_list("STINT_PROTECTED_PREFIXES") {
            config.protected_prefixes = values;
        }
        if let Some(secs) = env_u64("STINT_EXPIRY_BUFFER_SECS") {
            config.expiry_buffer = Duration::from_secs(secs);
        }
        if let Some(ms) = env_u64("STINT_REFRESH_BUDGET_MS") {
            config.refresh_budget = Duration::from_millis(ms);
        }
        if let Some(bytes) = env_u64("STINT_MAX_SLOT_LEN") {
            config.max_slot_len = bytes as usize;
        }
        config
    }

    /// Set the access token cookie slot.
    pub fn with_access_cookie(mut self, name: impl Into<String>) -> Self {
        self.access_cookie = name.into();
        self
    }

    /// Set the refresh token cookie slot.
    pub fn with_refresh_cookie(mut self, name: impl Into<String>) -> Self {
        self.refresh_cookie = name.into();
        self
    }

    /// Set the login redirect target.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Set the authenticated landing page.
    pub fn with_main_app_path(mut self, path: impl Into<String>) -> Self {
        self.main_app_path = path.into();
        self
    }

    /// Set the local-expiry buffer.
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Set the refresh timing contract in one go.
    pub fn with_refresh_timing(
        mut self,
        budget: Duration,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        self.refresh_budget = budget;
        self.refresh_base_delay = base_delay;
        self.refresh_max_delay = max_delay;
        self
    }

    /// Set the chunk re-read pause.
    pub fn with_chunk_retry_delay(mut self, delay: Duration) -> Self {
        self.chunk_retry_delay = delay;
        self
    }

    /// Set the per-slot byte limit.
    pub fn with_max_slot_len(mut self, bytes: usize) -> Self {
        self.max_slot_len = bytes;
        self
    }
}

fn vec_of(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env_string(name).map(|value| {
        value
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

fn env_u64(name: &str) -> Option<u64> {
    let value = env_string(name)?;
    match value.parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(var = name, value = %value, "Ignoring unparseable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.access_cookie, "stint_session");
        assert_eq!(config.refresh_cookie, "stint_refresh");
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.main_app_path, "/dashboard");
        assert_eq!(config.expiry_buffer, Duration::from_secs(60));
        assert_eq!(config.refresh_budget, Duration::from_millis(3000));
        assert_eq!(config.max_slot_len, 3800);
    }

    #[test]
    fn test_builders() {
        let config = GatewayConfig::new()
            .with_access_cookie("custom_at")
            .with_refresh_cookie("custom_rt")
            .with_login_path("/signin")
            .with_expiry_buffer(Duration::from_secs(30))
            .with_refresh_timing(
                Duration::from_millis(500),
                Duration::from_millis(10),
                Duration::from_millis(100),
            )
            .with_max_slot_len(100);
        assert_eq!(config.access_cookie, "custom_at");
        assert_eq!(config.refresh_cookie, "custom_rt");
        assert_eq!(config.login_path, "/signin");
        assert_eq!(config.expiry_buffer, Duration::from_secs(30));
        assert_eq!(config.refresh_budget, Duration::from_millis(500));
        assert_eq!(config.max_slot_len, 100);
    }

    #[test]
    fn test_env_list_parsing() {
        // Exercised through the helper to avoid mutating process env in tests.
        let parsed: Vec<String> = "en, de ,fr,,es"
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        assert_eq!(parsed, vec!["en", "de", "fr", "es"]);
    }
}
