//! Cookie-backed token store for a single request.
//!
//! The decision engine only sees named string slots. This module is the
//! HTTP side of that port: reads come from the parsed inbound `Cookie`
//! header, writes and clears update the local view immediately (so a
//! refresh sees its own writes within the same request) and are recorded
//! so the transport can render them as `Set-Cookie` headers on whichever
//! response the request ends up producing.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{HeaderMap, header::COOKIE};
use tokio::sync::RwLock;

use stint_gateway::TokenStore;

use crate::config::ServerConfig;

// ─────────────────────────────────────────────────────────────────────────────
// Mutations
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded change to the outgoing cookie jar.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieMutation {
    /// Write a slot with the configured session lifetime.
    Set { name: String, value: String },
    /// Expire a slot immediately (`Max-Age=0`).
    Clear { name: String },
}

impl CookieMutation {
    fn name(&self) -> &str {
        match self {
            CookieMutation::Set { name, .. } => name,
            CookieMutation::Clear { name } => name,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Cookies
// ─────────────────────────────────────────────────────────────────────────────

/// [`TokenStore`] view of one request's `Cookie` header.
pub struct RequestCookies {
    jar: RwLock<HashMap<String, String>>,
    mutations: RwLock<Vec<CookieMutation>>,
}

impl RequestCookies {
    /// Parse a raw `Cookie` header value.
    ///
    /// Pairs without an `=` are skipped; a value keeps any `=` past the
    /// first one, so padded base64 survives.
    pub fn parse(header: &str) -> Self {
        let mut jar = HashMap::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=')
                && !name.is_empty()
            {
                jar.insert(name.to_string(), value.to_string());
            }
        }
        Self {
            jar: RwLock::new(jar),
            mutations: RwLock::new(Vec::new()),
        }
    }

    /// Build from request headers; a missing `Cookie` header yields an
    /// empty jar.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        Self::parse(raw)
    }

    /// Render the recorded mutations as `Set-Cookie` header values.
    ///
    /// When a slot was touched more than once, only the last mutation is
    /// emitted; browsers apply duplicate `Set-Cookie` names in order, but
    /// one header per slot keeps the response honest.
    pub async fn set_cookie_headers(&self, config: &ServerConfig) -> Vec<String> {
        let mutations = self.mutations.read().await;

        let mut order: Vec<&str> = Vec::new();
        let mut last: HashMap<&str, &CookieMutation> = HashMap::new();
        for mutation in mutations.iter() {
            let name = mutation.name();
            if !last.contains_key(name) {
                order.push(name);
            }
            last.insert(name, mutation);
        }

        order
            .iter()
            .map(|name| render_mutation(last[name], config))
            .collect()
    }

    /// Whether any mutation has been recorded.
    pub async fn is_dirty(&self) -> bool {
        !self.mutations.read().await.is_empty()
    }
}

fn render_mutation(mutation: &CookieMutation, config: &ServerConfig) -> String {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    match mutation {
        CookieMutation::Set { name, value } => format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
            name, value, config.cookie_max_age_secs, secure
        ),
        CookieMutation::Clear { name } => format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax{}",
            name, secure
        ),
    }
}

#[async_trait]
impl TokenStore for RequestCookies {
    async fn get(&self, name: &str) -> Option<String> {
        self.jar.read().await.get(name).cloned()
    }

    async fn set(&self, name: &str, value: &str) {
        self.jar
            .write()
            .await
            .insert(name.to_string(), value.to_string());
        self.mutations.write().await.push(CookieMutation::Set {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    async fn clear(&self, name: &str) {
        let removed = self.jar.write().await.remove(name).is_some();
        let mut mutations = self.mutations.write().await;
        // A clear for a slot the browser never held would only add noise.
        let staged = mutations.iter().any(|m| m.name() == name);
        if removed || staged {
            mutations.push(CookieMutation::Clear {
                name: name.to_string(),
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
