//! Gateway and request-logging middleware.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use stint_gateway::{GatewayDecision, UserProfile};

use crate::config::ServerConfig;
use crate::cookies::RequestCookies;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Gateway Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Session gateway middleware.
///
/// Builds a cookie-backed token store for the request, asks the engine for
/// a decision, and acts on it: redirects short-circuit the inner handler,
/// identity-carrying passes annotate the forwarded request, and every
/// recorded cookie mutation rides out on the final response regardless of
/// which branch produced it.
pub async fn gateway_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // The identity header is ours to assert; never trust an inbound one.
    if let Ok(name) = HeaderName::from_bytes(state.config.identity_header.as_bytes()) {
        request.headers_mut().remove(&name);
    }

    let path = request.uri().path().to_string();
    let cookies = RequestCookies::from_headers(request.headers());

    let decision = state.engine.evaluate(&path, &cookies).await;

    let mut response = match decision {
        GatewayDecision::Allow | GatewayDecision::ClearAndAllow => next.run(request).await,
        GatewayDecision::AllowWithIdentity(profile) => {
            let header = identity_header(&state.config, &profile);
            if let Some((name, value)) = &header {
                request.headers_mut().insert(name.clone(), value.clone());
            }
            request.extensions_mut().insert(profile);

            let mut response = next.run(request).await;
            if let Some((name, value)) = header {
                response.headers_mut().insert(name, value);
            }
            response
        }
        GatewayDecision::Redirect(target) => Redirect::temporary(&target).into_response(),
    };

    for header in cookies.set_cookie_headers(&state.config).await {
        match HeaderValue::from_str(&header) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => {
                tracing::warn!(header = %header, "Dropping unencodable Set-Cookie header");
            }
        }
    }

    response
}

/// Render the profile as an identity header pair.
///
/// A profile whose fields fall outside visible ASCII cannot ride an HTTP
/// header; the request still passes, it just goes unannotated.
fn identity_header(
    config: &ServerConfig,
    profile: &UserProfile,
) -> Option<(HeaderName, HeaderValue)> {
    let name = match HeaderName::from_bytes(config.identity_header.as_bytes()) {
        Ok(name) => name,
        Err(_) => {
            tracing::warn!(
                header = %config.identity_header,
                "Configured identity header name is not a valid header name"
            );
            return None;
        }
    };

    let json = match serde_json::to_string(profile) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize identity profile");
            return None;
        }
    };

    match HeaderValue::from_str(&json) {
        Ok(value) => Some((name, value)),
        Err(_) => {
            tracing::warn!(user = %profile.id, "Identity profile is not header-safe, passing unannotated");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Logging Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Log each request with method, path, status, and duration.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path().to_string();

    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
