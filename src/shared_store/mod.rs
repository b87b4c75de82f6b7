//! Shared-store interface (C6): a narrow, four-operation view of a remote
//! key-value service used for the cross-instance round-robin cursor, the
//! last-used-algorithm slot, and the short-TTL adaptive-mode cache.
//!
//! Every operation degrades to local, process-scoped state on fault rather
//! than failing the request that triggered it (§7, `StoreFault`).

mod local;
mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use std::time::Duration;

/// Key holding the distributed round-robin cursor.
pub const KEY_NEXT_SERVER_INDEX: &str = "next_server_index";
/// Key holding the name of the most recently accepted algorithm.
pub const KEY_LAST_USED_ALGO: &str = "last_used_algo";
/// Key holding the adaptive-mode cached backend index, with a 5s TTL.
pub const KEY_CACHED_BEST_SERVER_INDEX: &str = "cached_best_server_index";

const ADAPTIVE_CACHE_TTL: Duration = Duration::from_secs(5);

/// Handle combining the remote store (when configured) with an always-on
/// local fallback. Callers never see a store error: every method absorbs
/// faults internally and logs them.
pub struct StoreHandle {
    remote: Option<RemoteStore>,
    local: LocalStore,
}

impl StoreHandle {
    #[must_use]
    pub fn new(remote: Option<RemoteStore>) -> Self {
        Self {
            remote,
            local: LocalStore::new(),
        }
    }

    /// Atomically increments `next_server_index` and returns the new value.
    pub async fn incr_next_server_index(&self) -> i64 {
        if let Some(remote) = &self.remote {
            match remote.incr(KEY_NEXT_SERVER_INDEX).await {
                Ok(v) => return v,
                Err(e) => {
                    tracing::warn!(error = %e, "shared store incr failed, using local cursor");
                },
            }
        }
        self.local.incr(KEY_NEXT_SERVER_INDEX)
    }

    /// Resets the round-robin cursor, e.g. on an algorithm-family change.
    pub async fn reset_next_server_index(&self) {
        if let Some(remote) = &self.remote
            && let Err(e) = remote.set(KEY_NEXT_SERVER_INDEX, "0").await
        {
            tracing::warn!(error = %e, "shared store reset failed, resetting local cursor");
        }
        self.local.set(KEY_NEXT_SERVER_INDEX, "0");
    }

    pub async fn last_used_algo(&self) -> Option<String> {
        if let Some(remote) = &self.remote {
            match remote.get(KEY_LAST_USED_ALGO).await {
                Ok(v) => return v,
                Err(e) => {
                    tracing::warn!(error = %e, "shared store read failed, using local value");
                },
            }
        }
        self.local.get(KEY_LAST_USED_ALGO)
    }

    pub async fn set_last_used_algo(&self, algo: &str) {
        if let Some(remote) = &self.remote
            && let Err(e) = remote.set(KEY_LAST_USED_ALGO, algo).await
        {
            tracing::warn!(error = %e, "shared store write failed, using local value");
        }
        self.local.set(KEY_LAST_USED_ALGO, algo);
    }

    pub async fn cached_best_server_index(&self) -> Option<usize> {
        let raw = if let Some(remote) = &self.remote {
            match remote.get(KEY_CACHED_BEST_SERVER_INDEX).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "shared store read failed, using local cache");
                    self.local.get(KEY_CACHED_BEST_SERVER_INDEX)
                },
            }
        } else {
            self.local.get(KEY_CACHED_BEST_SERVER_INDEX)
        };
        raw.and_then(|v| v.parse().ok())
    }

    pub async fn cache_best_server_index(&self, index: usize) {
        let value = index.to_string();
        if let Some(remote) = &self.remote
            && let Err(e) = remote
                .setex(KEY_CACHED_BEST_SERVER_INDEX, &value, ADAPTIVE_CACHE_TTL)
                .await
        {
            tracing::warn!(error = %e, "shared store cache write failed, caching locally");
        }
        self.local
            .setex(KEY_CACHED_BEST_SERVER_INDEX, value, ADAPTIVE_CACHE_TTL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn without_a_remote_store_everything_falls_back_locally() {
        let store = StoreHandle::new(None);
        assert_eq!(store.incr_next_server_index().await, 1);
        assert_eq!(store.incr_next_server_index().await, 2);
        store.reset_next_server_index().await;
        assert_eq!(store.incr_next_server_index().await, 1);

        assert_eq!(store.last_used_algo().await, None);
        store.set_last_used_algo("round_robin").await;
        assert_eq!(store.last_used_algo().await.as_deref(), Some("round_robin"));

        store.cache_best_server_index(2).await;
        assert_eq!(store.cached_best_server_index().await, Some(2));
    }
}
