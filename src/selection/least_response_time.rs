//! Picks the healthy backend with the lowest last-observed response time.

use std::cmp::Ordering;

use crate::pool::Pool;

pub fn select(pool: &Pool) -> Option<usize> {
    pool.healthy_indices().into_iter().min_by(|&a, &b| {
        let ra = pool.get(a).expect("index in range").snapshot().response_time;
        let rb = pool.get(b).expect("index in range").snapshot().response_time;
        ra.partial_cmp(&rb).unwrap_or(Ordering::Equal)
    })
}
