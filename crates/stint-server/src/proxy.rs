//! Upstream forwarding.
//!
//! Everything the gateway does not answer itself is forwarded to the
//! product application server. Request bodies are buffered (form posts and
//! JSON, not uploads); response bodies stream straight through so large
//! pages and server-sent events are never held in memory.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, header},
    response::Response,
};
use futures::StreamExt;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Headers meaningful for a single transport hop only.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Fallback handler forwarding the request to the upstream application.
pub async fn forward(State(state): State<AppState>, request: Request<Body>) -> Result<Response> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.config.upstream_url, path_and_query);

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let upstream_response = state
        .http
        .request(parts.method.clone(), &url)
        .headers(forwardable_headers(&parts.headers))
        .body(body)
        .send()
        .await
        .map_err(|e| ServerError::BadGateway(format!("Upstream request failed: {}", e)))?;

    let status = upstream_response.status();
    let headers = forwardable_headers(upstream_response.headers());

    let stream = upstream_response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));

    let mut response = Response::builder()
        .status(status)
        .body(Body::from_stream(stream))
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))?;
    response.headers_mut().extend(headers);

    Ok(response)
}

/// Copy headers, dropping hop-by-hop headers and the host header.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if name == header::HOST || is_hop_by_hop(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.iter().any(|h| name.as_str() == *h)
}
