//! Server configuration.

use std::net::SocketAddr;

/// Default upstream application base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:3000";

/// Default header carrying the verified identity to the upstream app.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-stint-identity";

/// Default cookie lifetime for session slots (7 days).
pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Base URL of the upstream application server requests are forwarded to.
    pub upstream_url: String,

    /// Header name carrying the verified profile on annotated requests.
    pub identity_header: String,

    /// `Max-Age` in seconds for session cookies written by the gateway.
    pub cookie_max_age_secs: u64,

    /// Emit the `Secure` attribute on session cookies.
    /// Disable only for plain-HTTP development setups.
    pub cookie_secure: bool,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".parse().unwrap(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
            cookie_secure: true,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config forwarding to the given upstream URL.
    pub fn new(upstream_url: impl Into<String>) -> Self {
        let upstream_url = upstream_url.into();
        Self {
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the identity header name.
    pub fn with_identity_header(mut self, name: impl Into<String>) -> Self {
        self.identity_header = name.into();
        self
    }

    /// Set the session cookie lifetime in seconds.
    pub fn with_cookie_max_age_secs(mut self, secs: u64) -> Self {
        self.cookie_max_age_secs = secs;
        self
    }

    /// Enable or disable the `Secure` cookie attribute.
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}
