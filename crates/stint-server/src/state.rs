//! Shared application state.

use std::sync::Arc;

use stint_gateway::GatewayEngine;

use crate::config::ServerConfig;

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Session decision engine.
    pub engine: Arc<GatewayEngine>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// HTTP client for upstream forwarding.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create application state from an engine and server config.
    pub fn new(engine: GatewayEngine, config: ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// Replace the upstream HTTP client (to set timeouts or pools).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the decision engine.
    pub fn engine(&self) -> &GatewayEngine {
        &self.engine
    }
}
