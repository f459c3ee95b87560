//! Advisory access-token claims.
//!
//! The gateway reads the JWT payload without checking the signature: the
//! signing secret lives with the identity provider, and the only question
//! answered locally is "is a network round-trip worth it". Authorization is
//! always the provider's verify call. Keeping the local check advisory is
//! what lets the engine skip verification for tokens that are obviously
//! dead and bounce authenticated users off auth pages with zero network.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::Deserialize;

/// Claims carried in a Stint access token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject (user) identifier.
    pub sub: String,
    /// Workspace the token is scoped to.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Issue time, epoch seconds.
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiry time, epoch seconds.
    pub exp: i64,
}

/// Decode the payload of a compact JWT without verifying its signature.
///
/// Returns `None` for anything malformed: wrong segment count, undecodable
/// base64, or a payload that is not the expected JSON shape. Malformed and
/// absent tokens are treated identically everywhere downstream.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether a token is expired, or will be within `buffer`.
///
/// True when `exp <= now + buffer`. Undecodable tokens count as expired;
/// they are equally unusable.
pub fn is_expired(token: &str, buffer: Duration) -> bool {
    match decode_claims(token) {
        Some(claims) => claims.exp <= chrono::Utc::now().timestamp() + buffer.as_secs() as i64,
        None => true,
    }
}

/// Seconds until expiry, clamped at zero. Diagnostics only.
pub fn remaining_seconds(token: &str) -> i64 {
    decode_claims(token)
        .map(|claims| (claims.exp - chrono::Utc::now().timestamp()).max(0))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "usr_1",
                "tenant_id": "ws_9",
                "iat": exp - 900,
                "exp": exp,
            })
            .to_string(),
        );
        format!("{}.{}.unchecked-signature", header, payload)
    }

    #[test]
    fn test_decode_valid_token() {
        let now = chrono::Utc::now().timestamp();
        let claims = decode_claims(&make_token(now + 900)).unwrap();
        assert_eq!(claims.sub, "usr_1");
        assert_eq!(claims.tenant_id.as_deref(), Some("ws_9"));
        assert_eq!(claims.exp, now + 900);
        assert_eq!(claims.iat, Some(now));
    }

    #[test]
    fn test_decode_tolerates_extra_payload_fields() {
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"sub": "usr_2", "exp": 4102444800i64, "scope": "tracker"})
                .to_string(),
        );
        let token = format!("h.{}.s", payload);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "usr_2");
        assert!(claims.tenant_id.is_none());
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(decode_claims("").is_none());
        assert!(decode_claims("only-one-segment").is_none());
        assert!(decode_claims("two.segments").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
        assert!(decode_claims("h.!!!not-base64!!!.s").is_none());

        let not_json = URL_SAFE_NO_PAD.encode("plain text");
        assert!(decode_claims(&format!("h.{}.s", not_json)).is_none());

        let missing_exp = URL_SAFE_NO_PAD.encode(r#"{"sub":"usr_1"}"#);
        assert!(decode_claims(&format!("h.{}.s", missing_exp)).is_none());
    }

    #[test]
    fn test_is_expired_boundaries() {
        let now = chrono::Utc::now().timestamp();
        let buffer = Duration::from_secs(60);

        // Already past.
        assert!(is_expired(&make_token(now - 1), buffer));
        // Inside the buffer window.
        assert!(is_expired(&make_token(now + 30), buffer));
        // Comfortably ahead of the buffer.
        assert!(!is_expired(&make_token(now + 120), buffer));
    }

    #[test]
    fn test_undecodable_counts_as_expired() {
        assert!(is_expired("garbage", Duration::from_secs(60)));
        assert!(is_expired("", Duration::from_secs(60)));
    }

    #[test]
    fn test_remaining_seconds_clamped() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(remaining_seconds(&make_token(now - 500)), 0);
        assert_eq!(remaining_seconds("garbage"), 0);

        let remaining = remaining_seconds(&make_token(now + 600));
        assert!((598..=600).contains(&remaining), "remaining {}", remaining);
    }
}
