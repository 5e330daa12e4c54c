use std::time::{Duration, Instant};

use api_subs::SubscriptionCache;
use common::error::Res;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: bool,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local cache. Expired entries are evicted when read.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl SubscriptionCache for InMemoryCache {
    async fn get(&self, key: &str) -> Res<Option<bool>> {
        let now = Instant::now();
        // the read guard must be gone before removing from the same shard
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: bool, timeout: Option<Duration>) -> Res<()> {
        let entry = Entry {
            value,
            expires_at: timeout.map(|timeout| Instant::now() + timeout),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}
