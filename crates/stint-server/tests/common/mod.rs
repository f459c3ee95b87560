//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{Json, Router, body::Body, extract::Request};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use stint_gateway::{GatewayConfig, GatewayEngine};
use stint_idp::MockIdp;
use stint_server::{Server, ServerConfig};

/// A gateway with a stub upstream app, both on loopback ports.
pub struct TestServer {
    /// The gateway's address.
    pub addr: SocketAddr,
    /// Scripted identity provider behind the engine.
    pub idp: Arc<MockIdp>,
    /// HTTP client with redirects disabled, so 307s are observable.
    pub client: Client,
    /// Handle to the gateway task.
    _gateway: JoinHandle<()>,
    /// Handle to the stub upstream task.
    _upstream: JoinHandle<()>,
}

impl TestServer {
    /// Start a gateway in front of a stub upstream echo app.
    ///
    /// Refresh timing is shortened so outage tests finish quickly.
    pub async fn start() -> Result<Self> {
        let (upstream_addr, upstream_handle) = spawn_app(upstream_app()).await?;

        let idp = Arc::new(MockIdp::new());
        let gateway_config = GatewayConfig::new().with_refresh_timing(
            Duration::from_millis(250),
            Duration::from_millis(10),
            Duration::from_millis(40),
        );
        let engine = GatewayEngine::new(gateway_config, idp.clone());

        let addr = find_available_port().await?;
        let config = ServerConfig::new(format!("http://{}", upstream_addr))
            .with_bind_address(addr)
            .with_cookie_secure(false)
            .with_request_logging(false);

        let server = Server::new(engine, config);
        let gateway_handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            idp,
            client,
            _gateway: gateway_handle,
            _upstream: upstream_handle,
        })
    }

    /// Get the base URL for the gateway.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a request builder for a path.
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// Get a request builder with a `Cookie` header attached.
    pub fn get_with_cookies(&self, path: &str, cookies: &str) -> reqwest::RequestBuilder {
        self.get(path).header(reqwest::header::COOKIE, cookies)
    }

    /// Get a POST request builder for a path.
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Check if the gateway is healthy.
    pub async fn health(&self) -> Result<bool> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url()))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }
}

/// Stub upstream application echoing what it received as JSON.
pub fn upstream_app() -> Router {
    Router::new().fallback(echo)
}

async fn echo(request: Request<Body>) -> Json<serde_json::Value> {
    let (parts, body) = request.into_parts();
    let identity = parts
        .headers
        .get("x-stint-identity")
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    Json(serde_json::json!({
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "method": parts.method.as_str(),
        "identity": identity,
        "body": String::from_utf8_lossy(&bytes),
    }))
}

/// Serve a router on a free loopback port, returning the bound address.
pub async fn spawn_app(app: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, handle))
}

/// Find an available port for the test server.
pub async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
pub async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}

/// Build a decodable JWT-shaped token expiring at now plus the offset.
pub fn make_token(exp_offset_secs: i64) -> String {
    make_long_token(exp_offset_secs, 0)
}

/// Same as [`make_token`], padded with a scope claim so the encoded token
/// overflows a single cookie slot.
pub fn make_long_token(exp_offset_secs: i64, pad: usize) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs() as i64;

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let mut claims = serde_json::json!({
        "sub": "user-1",
        "tenant_id": "acme",
        "exp": now + exp_offset_secs,
    });
    if pad > 0 {
        claims["scopes"] = serde_json::Value::String("x".repeat(pad));
    }
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

    format!("{}.{}.unchecked-signature", header, payload)
}

/// Collect all `Set-Cookie` header values from a response.
pub fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(String::from)
        .collect()
}
