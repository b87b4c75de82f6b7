//! In-process fallback store, used whenever the remote shared store is
//! unreachable or not configured at all (e.g. single-instance deployments).

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// A local, process-scoped stand-in for the remote key-value store.
///
/// Not cross-instance-consistent — that's the point of degrading to it.
pub struct LocalStore {
    values: DashMap<String, Entry>,
}

impl LocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    pub fn incr(&self, key: &str) -> i64 {
        let mut entry = self.values.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let next = entry.value.parse::<i64>().unwrap_or(0) + 1;
        entry.value = next.to_string();
        entry.expires_at = None;
        next
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.values.insert(
            key.to_string(),
            Entry {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    pub fn setex(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        self.values.insert(
            key.to_string(),
            Entry {
                value: value.into(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.values.get(key)?;
        if entry.is_live() {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.values.remove(key);
            None
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}
