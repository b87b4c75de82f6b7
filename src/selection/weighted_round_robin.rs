//! Nginx-style smooth weighted round robin.
//!
//! Unlike a naive expansion (repeat each backend `weight` times then
//! rotate), smooth WRR interleaves picks so no backend bursts: over any
//! window of `sum(effective_weight)` consecutive calls, each backend is
//! picked exactly its weight's worth of times.

use parking_lot::Mutex;

use crate::pool::Pool;

/// Owns the critical section spanning the whole pool's `current_weight`
/// fields for the duration of one pick. Per-backend fields still live
/// behind each backend's own lock; this mutex only serializes the
/// multi-backend compare-and-pick sequence so two concurrent callers never
/// interleave their reads (§5: "the mutation of `current_weight` MUST be
/// atomic with the selection").
pub struct WeightedRoundRobin {
    critical_section: Mutex<()>,
}

impl WeightedRoundRobin {
    #[must_use]
    pub fn new() -> Self {
        Self {
            critical_section: Mutex::new(()),
        }
    }

    pub fn select(&self, pool: &Pool) -> Option<usize> {
        let healthy = pool.healthy_indices();
        if healthy.is_empty() {
            return None;
        }

        let _guard = self.critical_section.lock();

        let mut total_weight = 0i64;
        let mut best: Option<(usize, i64)> = None;

        for idx in healthy {
            let backend = pool.get(idx).expect("healthy index is in range");
            let weight = i64::from(backend.snapshot().effective_weight);
            total_weight += weight;
            let current = backend.add_current_weight(weight);
            // Strict `>` keeps the lowest index on ties.
            if best.is_none_or(|(_, best_current)| current > best_current) {
                best = Some((idx, current));
            }
        }

        let (picked, _) = best.expect("healthy is non-empty");
        pool.get(picked)
            .expect("picked index is in range")
            .subtract_current_weight(total_weight);
        Some(picked)
    }
}

impl Default for WeightedRoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{BackendSpec, Pool};

    fn weighted_pool(weights: &[u32]) -> Pool {
        let pool = Pool::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, &w)| BackendSpec {
                    name: format!("b{i}"),
                    url: format!("http://127.0.0.1:{}", 9000 + i),
                    weight: w,
                })
                .collect(),
        )
        .unwrap();
        for (i, &w) in weights.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            pool.get(i).unwrap().set_effective_weight(w as u8);
        }
        pool
    }

    #[test]
    fn distributes_by_weight_over_one_window() {
        let pool = weighted_pool(&[2, 3, 1]);
        let wrr = WeightedRoundRobin::new();
        let mut counts = [0usize; 3];
        for _ in 0..6 {
            let idx = wrr.select(&pool).unwrap();
            counts[idx] += 1;
        }
        assert_eq!(counts, [2, 3, 1]);
    }

    #[test]
    fn current_weight_sum_is_bounded_across_windows() {
        let pool = weighted_pool(&[2, 3, 1]);
        let wrr = WeightedRoundRobin::new();
        for _ in 0..60 {
            wrr.select(&pool).unwrap();
        }
        let sum: i64 = pool.iter().map(|b| b.snapshot().current_weight).sum();
        assert!(sum.abs() <= 6);
    }

    #[test]
    fn equal_weights_round_robin_with_lowest_index_tiebreak() {
        let pool = weighted_pool(&[1, 1, 1]);
        let wrr = WeightedRoundRobin::new();
        let mut picks = Vec::new();
        for _ in 0..3 {
            picks.push(wrr.select(&pool).unwrap());
        }
        assert_eq!(picks, vec![0, 1, 2]);
    }
}
