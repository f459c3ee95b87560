//! Stint session gateway server.
//!
//! Binds the HTTP edge, wires the decision engine to the configured
//! identity provider, and forwards allowed traffic to the product app.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use stint_gateway::{GatewayConfig, GatewayEngine};
use stint_idp::{IdpClient, IdpConfig};
use stint_server::{Server, ServerConfig};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Stint session gateway.
#[derive(Parser)]
#[command(name = "stint-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to bind the gateway to
    #[arg(short, long, env = "STINT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Base URL of the upstream application server
    #[arg(long, env = "STINT_UPSTREAM", default_value = "http://127.0.0.1:3000")]
    pub upstream: String,

    /// Base URL of the identity provider
    #[arg(long, env = "STINT_IDP_URL", default_value = "https://id.stint.app")]
    pub idp_url: String,

    /// Omit the Secure cookie attribute (plain-HTTP development only)
    #[arg(long, env = "STINT_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Directory for rotating JSON log files
    #[arg(long, env = "STINT_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "stint_gate=debug,stint_server=debug,stint_gateway=debug,stint_idp=debug,info"
    } else {
        "stint_gate=info,stint_server=info,stint_gateway=info,stint_idp=info,warn"
    };

    let file_appender = tracing_appender::rolling::daily(&cli.log_dir, "stint-gate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "stint_gate=trace,stint_server=trace,stint_gateway=trace,stint_idp=trace,info",
                )),
        )
        .init();

    // Route and slot names come from the environment; budgets and timing
    // keep their defaults unless overridden there too.
    let gateway_config = GatewayConfig::from_env();
    let idp = IdpClient::new(IdpConfig::new(cli.idp_url.clone()))?;
    let engine = GatewayEngine::new(gateway_config, Arc::new(idp));

    let config = ServerConfig::new(cli.upstream.clone())
        .with_bind_address(cli.bind)
        .with_cookie_secure(!cli.insecure_cookies);

    tracing::info!(
        bind = %cli.bind,
        upstream = %config.upstream_url,
        idp = %cli.idp_url,
        "Starting Stint gateway"
    );

    Server::new(engine, config).run().await?;

    Ok(())
}
