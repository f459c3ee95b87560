//! HTTP edge server for the Stint session gateway.
//!
//! This crate puts the decision engine in front of the product application
//! server. Every inbound request is evaluated against its session cookies;
//! the outcome is a redirect, an anonymous pass, or a pass annotated with
//! the verified identity. Everything that passes is forwarded to the
//! upstream application, and any cookie repairs (refreshed tokens,
//! re-chunked slots, cleared sessions) ride out on the response.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use stint_gateway::{GatewayConfig, GatewayEngine, IdpClient, IdpConfig};
//! use stint_server::{Server, ServerConfig};
//!
//! let idp = IdpClient::new(IdpConfig::new("https://id.stint.app"))?;
//! let engine = GatewayEngine::new(GatewayConfig::from_env(), Arc::new(idp));
//!
//! let config = ServerConfig::new("http://127.0.0.1:3000")
//!     .with_bind_address("127.0.0.1:8080".parse()?);
//!
//! let server = Server::new(engine, config);
//! server.run().await?;
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use cookies::RequestCookies;
pub use error::{ErrorResponse, Result, ServerError};
pub use middleware::{gateway_middleware, request_logging_middleware};
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use stint_gateway::GatewayEngine;

/// The Stint gateway HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server with the given engine and configuration.
    pub fn new(engine: GatewayEngine, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(engine, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            // Health route (public, but still passes the gateway layer)
            .merge(routes::health_routes())
            // Everything else goes to the upstream application
            .fallback(proxy::forward)
            // Session decisions (inner layer, wraps the proxy)
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                middleware::gateway_middleware,
            ))
            // Request logging (outer layer, sees redirects too)
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                middleware::request_logging_middleware,
            ))
            // TraceLayer for detailed HTTP tracing
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Run the server in the background with a shutdown signal, returning
    /// the bound address. Binding port 0 picks a free port.
    pub async fn run_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> Result<SocketAddr>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local address: {}", e)))?;

        info!("Starting server on {}", local_addr);

        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await;
        });

        Ok(local_addr)
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}
