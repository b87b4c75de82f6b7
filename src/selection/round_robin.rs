//! Cross-instance round robin, driven by the shared store's atomic cursor.

use crate::pool::Pool;
use crate::shared_store::StoreHandle;

/// Round robin over the healthy subset of the pool.
///
/// Holds no local state of its own: the cursor lives in the shared store
/// (falling back to process-local state on store fault per §4.5/§7), so
/// multiple instances of this process observe one global rotation.
pub struct RoundRobin;

impl RoundRobin {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn select(&self, pool: &Pool, store: &StoreHandle) -> Option<usize> {
        let healthy = pool.healthy_indices();
        if healthy.is_empty() {
            return None;
        }
        let cursor = store.incr_next_server_index().await;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pos = (cursor - 1).rem_euclid(healthy.len() as i64) as usize;
        Some(healthy[pos])
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BackendSpec;

    fn pool(n: usize) -> Pool {
        Pool::new(
            (0..n)
                .map(|i| BackendSpec {
                    name: format!("b{i}"),
                    url: format!("http://127.0.0.1:{}", 9000 + i),
                    weight: 1,
                })
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn rotates_through_the_pool_in_order() {
        let pool = pool(3);
        let store = StoreHandle::new(None);
        let rr = RoundRobin::new();
        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(rr.select(&pool, &store).await.unwrap());
        }
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[tokio::test]
    async fn skips_unhealthy_backends() {
        let pool = pool(3);
        pool.get(1).unwrap().set_healthy(false);
        let store = StoreHandle::new(None);
        let rr = RoundRobin::new();
        let mut picks = Vec::new();
        for _ in 0..4 {
            picks.push(rr.select(&pool, &store).await.unwrap());
        }
        assert_eq!(picks, vec![0, 2, 0, 2]);
    }

    #[tokio::test]
    async fn empty_pool_returns_none() {
        let pool = pool(1);
        pool.get(0).unwrap().set_healthy(false);
        let store = StoreHandle::new(None);
        let rr = RoundRobin::new();
        assert_eq!(rr.select(&pool, &store).await, None);
    }
}
