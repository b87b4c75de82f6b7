//! Power-of-two-choices: sample two backends at random, route to whichever
//! has fewer in-flight connections.

use rand::Rng;

use crate::pool::Pool;

/// For a healthy set of size 0 this returns `None`, size 1 always returns
/// that backend, size 2 always compares both, and size >2 samples two
/// distinct indices uniformly (§9 closes the undefined small-pool cases).
pub fn select(pool: &Pool) -> Option<usize> {
    let healthy = pool.healthy_indices();
    match healthy.len() {
        0 => None,
        1 => Some(healthy[0]),
        2 => Some(fewer_connections(pool, healthy[0], healthy[1])),
        n => {
            let mut rng = rand::thread_rng();
            let i = rng.gen_range(0..n);
            let mut j = rng.gen_range(0..n);
            while j == i {
                j = rng.gen_range(0..n);
            }
            Some(fewer_connections(pool, healthy[i], healthy[j]))
        },
    }
}

/// Returns whichever of `a`/`b` has fewer connections, lowest index on ties.
fn fewer_connections(pool: &Pool, a: usize, b: usize) -> usize {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let c_lo = pool.get(lo).expect("index in range").connections();
    let c_hi = pool.get(hi).expect("index in range").connections();
    if c_lo <= c_hi { lo } else { hi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{BackendSpec, Pool};

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

    #[test]
    fn empty_pool_returns_none() {
        let pool = pool(1);
        pool.get(0).unwrap().set_healthy(false);
        assert_eq!(select(&pool), None);
    }

    #[test]
    fn single_healthy_backend_always_wins() {
        let pool = pool(1);
        for _ in 0..10 {
            assert_eq!(select(&pool), Some(0));
        }
    }

    #[test]
    fn size_two_always_compares_both() {
        let pool = pool(2);
        pool.get(1).unwrap().start_request();
        for _ in 0..10 {
            assert_eq!(select(&pool), Some(0));
        }
    }

    #[test]
    fn larger_pool_routes_to_less_loaded_of_sampled_pair() {
        let pool = pool(5);
        for i in 1..5 {
            for _ in 0..10 {
                pool.get(i).unwrap().start_request();
            }
        }
        // backend 0 is idle; whichever pair gets sampled, it wins if included.
        let mut saw_zero = false;
        for _ in 0..200 {
            if select(&pool) == Some(0) {
                saw_zero = true;
            }
        }
        assert!(saw_zero);
    }
}
