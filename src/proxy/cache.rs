//! Process-local response cache.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::proxy::types::ExternalApiResponse;

#[derive(Debug, Clone)]
struct CacheEntry {
    expires_at: Instant,
    value: ExternalApiResponse,
}

/// Expiring key → response store.
///
/// Entries are only removed when read after expiry; there is no background
/// sweep and no size bound.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry for `key`, removing it if it has expired.
    pub fn get(&self, key: &str) -> Option<ExternalApiResponse> {
        {
            let entry = self.entries.get(key)?;
            if Instant::now() <= entry.expires_at {
                return Some(entry.value.clone());
            }
        }

        // Re-check under the shard lock so a concurrent `set` is not dropped.
        self.entries
            .remove_if(key, |_, entry| Instant::now() > entry.expires_at);
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: ExternalApiResponse, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                expires_at: Instant::now() + ttl,
                value,
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
