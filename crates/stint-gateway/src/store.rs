//! Token store port and the session slot operations on top of it.
//!
//! A [`TokenStore`] is whatever holds the credential slots for one request:
//! the cookie jar in front of a browser, or [`MemoryTokenStore`] in tests
//! and embeddings. The engine only sees named string slots; cookie
//! attributes, headers, and transport details stay on the other side of the
//! trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::chunks::{chunk_slot_name, count_slot_name, encode_chunks, read_chunked};
use crate::config::GatewayConfig;

/// Named string slots scoped to one request.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read a slot.
    async fn get(&self, name: &str) -> Option<String>;

    /// Write a slot. Later writes to the same name win.
    async fn set(&self, name: &str, value: &str);

    /// Remove a slot.
    async fn clear(&self, name: &str);
}

// ─────────────────────────────────────────────────────────────────────────────
// In-Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Plain in-memory [`TokenStore`].
#[derive(Default)]
pub struct MemoryTokenStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot, builder-style.
    pub async fn with_slot(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.write().await.insert(name.into(), value.into());
        self
    }

    /// Number of populated slots.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Whether no slots are populated.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, name: &str) -> Option<String> {
        self.slots.read().await.get(name).cloned()
    }

    async fn set(&self, name: &str, value: &str) {
        self.slots
            .write()
            .await
            .insert(name.to_string(), value.to_string());
    }

    async fn clear(&self, name: &str) {
        self.slots.write().await.remove(name);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Slot Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Read the access token: the primary slot when present, the chunk set
/// otherwise. Returns `None` when neither representation is complete.
pub async fn read_access_token(store: &dyn TokenStore, config: &GatewayConfig) -> Option<String> {
    if let Some(token) = store.get(&config.access_cookie).await {
        return Some(token);
    }

    let total = declared_chunk_count(store, config).await?;
    read_chunked(total, config.chunk_retry_delay, |index| {
        let name = chunk_slot_name(&config.access_cookie, index);
        async move { store.get(&name).await }
    })
    .await
}

/// Read the refresh token slot.
pub async fn read_refresh_token(store: &dyn TokenStore, config: &GatewayConfig) -> Option<String> {
    store.get(&config.refresh_cookie).await
}

/// Persist an access token, choosing the representation by size.
///
/// A value within the slot limit goes into the primary slot; anything larger
/// is chunked with a count slot. Either way the representation not used is
/// erased first, so a shrunken token never leaves stale chunks behind.
pub async fn write_access_token(store: &dyn TokenStore, config: &GatewayConfig, token: &str) {
    clear_chunk_slots(store, config).await;

    if token.len() <= config.max_slot_len {
        store.set(&config.access_cookie, token).await;
        return;
    }

    store.clear(&config.access_cookie).await;
    let chunks = encode_chunks(token, config.max_slot_len);
    if chunks.len() > config.max_chunk_count {
        tracing::warn!(
            chunks = chunks.len(),
            cap = config.max_chunk_count,
            "Access token needs more chunk slots than the configured cap"
        );
    }
    store
        .set(
            &count_slot_name(&config.access_cookie),
            &chunks.len().to_string(),
        )
        .await;
    for (index, chunk) in chunks.iter().enumerate() {
        store
            .set(&chunk_slot_name(&config.access_cookie, index), chunk)
            .await;
    }
    tracing::debug!(chunks = chunks.len(), "Access token written chunked");
}

/// Drop every credential slot: primary, refresh, chunks, and count.
pub async fn clear_session(store: &dyn TokenStore, config: &GatewayConfig) {
    clear_chunk_slots(store, config).await;
    store.clear(&config.access_cookie).await;
    store.clear(&config.refresh_cookie).await;
    tracing::debug!("Session slots cleared");
}

/// The chunk total declared by the count slot, capped at the configured
/// maximum. `None` when the slot is absent or unreadable.
async fn declared_chunk_count(store: &dyn TokenStore, config: &GatewayConfig) -> Option<usize> {
    let raw = store.get(&count_slot_name(&config.access_cookie)).await?;
    match raw.parse::<usize>() {
        Ok(total) => Some(total.min(config.max_chunk_count)),
        Err(_) => {
            tracing::warn!(value = %raw, "Unreadable chunk count slot");
            None
        }
    }
}

/// Clear the chunk slots and the count slot.
///
/// Clears every index the count slot declares, then keeps sweeping while
/// slots are present, bounded by the configured cap either way.
async fn clear_chunk_slots(store: &dyn TokenStore, config: &GatewayConfig) {
    let declared = declared_chunk_count(store, config).await.unwrap_or(0);
    let mut index = 0;
    while index < config.max_chunk_count {
        let name = chunk_slot_name(&config.access_cookie, index);
        if index >= declared && store.get(&name).await.is_none() {
            break;
        }
        store.clear(&name).await;
        index += 1;
    }
    store.clear(&count_slot_name(&config.access_cookie)).await;
}
