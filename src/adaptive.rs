//! Adaptive meta-selector (C4): chooses an algorithm when the request
//! carries none, and a separate concrete-backend "adaptive" mode with a
//! short-TTL cached decision.

use crate::pool::{Pool, scoring};
use crate::selection::Algo;
use crate::shared_store::StoreHandle;

/// Ranks backends by headroom ratio and recommends a concrete algorithm.
/// Pure — reads pool state but never mutates it.
#[must_use]
pub fn choose_algorithm(pool: &Pool) -> Algo {
    let top_ratio = pool
        .iter()
        .map(|b| scoring::headroom_ratio(b.weight, &b.snapshot()))
        .fold(f64::NEG_INFINITY, f64::max);

    if top_ratio < 0.7 {
        Algo::WeightedRoundRobin
    } else if top_ratio > 2.0 {
        Algo::LeastConnections
    } else {
        Algo::PowerOfTwo
    }
}

/// Explicit `algo=adaptive` mode: picks the backend with the best capacity
/// score directly and caches the choice in the shared store for 5s so
/// subsequent `adaptive` requests within the window reuse it verbatim.
pub async fn select_adaptive(pool: &Pool, store: &StoreHandle) -> Option<usize> {
    if let Some(cached) = store.cached_best_server_index().await
        && pool.get(cached).is_some_and(|b| b.is_healthy())
    {
        return Some(cached);
    }

    let best = pool.healthy_indices().into_iter().fold(None, |acc, idx| {
        let score = scoring::capacity_score(&pool.get(idx).expect("index in range").snapshot());
        match acc {
            Some((_, best_score)) if score <= best_score => acc,
            _ => Some((idx, score)),
        }
    })?;

    let (best_idx, _) = best;
    store.cache_best_server_index(best_idx).await;
    Some(best_idx)
}
