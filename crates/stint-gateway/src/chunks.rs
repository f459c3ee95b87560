//! Chunk codec for oversized credentials.
//!
//! Browsers cap individual cookies around 4 KiB, and access tokens carrying
//! workspace claims routinely outgrow that. The codec splits a value across
//! indexed slots (`{base}.0`, `{base}.1`, …) with a count slot
//! (`{base}.chunks`) declaring how many there are. Reassembly is
//! all-or-nothing: one missing index means no credential, never a truncated
//! one.

use std::time::Duration;

/// Name of the chunk slot at `index`.
pub fn chunk_slot_name(base: &str, index: usize) -> String {
    format!("{}.{}", base, index)
}

/// Name of the count slot declaring the chunk total.
pub fn count_slot_name(base: &str) -> String {
    format!("{}.chunks", base)
}

/// Split a value into slots of at most `max_slot_len` bytes.
///
/// Splits respect UTF-8 character boundaries, so a multi-byte character is
/// never torn across two slots; a character wider than the limit gets a slot
/// of its own. Concatenating the result in order always reproduces the
/// input. An empty input produces no chunks.
pub fn encode_chunks(value: &str, max_slot_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = value;
    while !rest.is_empty() {
        let mut end = rest.len().min(max_slot_len);
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // max_slot_len is narrower than the next character.
            end = rest
                .chars()
                .next()
                .map(|c| c.len_utf8())
                .unwrap_or(rest.len());
        }
        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    chunks
}

/// Reassemble a value from `total` indexed slots.
///
/// Returns `None` the moment any index in `0..total` is absent, and for a
/// declared total of zero. A partial credential is worse than none: it would
/// fail verification upstream in ways that look like corruption instead of
/// a missing session.
pub fn assemble_chunks<F>(total: usize, lookup: F) -> Option<String>
where
    F: Fn(usize) -> Option<String>,
{
    if total == 0 {
        return None;
    }
    let mut value = String::new();
    for index in 0..total {
        value.push_str(&lookup(index)?);
    }
    Some(value)
}

/// Reassemble with a single bounded re-read.
///
/// A login completing in another tab can race the first read while its slot
/// writes are still landing. On an incomplete set this waits `retry_delay`
/// once and re-reads; a second miss is final.
pub async fn read_chunked<F, Fut>(total: usize, retry_delay: Duration, lookup: F) -> Option<String>
where
    F: Fn(usize) -> Fut,
    Fut: std::future::Future<Output = Option<String>>,
{
    if total == 0 {
        return None;
    }
    if let Some(value) = assemble_async(total, &lookup).await {
        return Some(value);
    }

    tracing::debug!(
        total,
        retry_ms = retry_delay.as_millis() as u64,
        "Chunk set incomplete, re-reading once"
    );
    tokio::time::sleep(retry_delay).await;
    assemble_async(total, &lookup).await
}

async fn assemble_async<F, Fut>(total: usize, lookup: &F) -> Option<String>
where
    F: Fn(usize) -> Fut,
    Fut: std::future::Future<Output = Option<String>>,
{
    let mut value = String::new();
    for index in 0..total {
        value.push_str(&lookup(index).await?);
    }
    Some(value)
}
