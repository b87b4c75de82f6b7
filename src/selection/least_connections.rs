//! Picks the healthy backend with the fewest in-flight requests.

use crate::pool::Pool;

pub fn select(pool: &Pool) -> Option<usize> {
    pool.healthy_indices()
        .into_iter()
        .min_by_key(|&idx| pool.get(idx).expect("healthy index is in range").connections())
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
    fn picks_the_emptiest_backend() {
        let pool = pool(3);
        pool.get(0).unwrap().start_request();
        pool.get(0).unwrap().start_request();
        pool.get(1).unwrap().start_request();
        assert_eq!(select(&pool), Some(2));
    }

    #[test]
    fn ties_break_by_lowest_index() {
        let pool = pool(3);
        assert_eq!(select(&pool), Some(0));
    }

    #[test]
    fn skips_unhealthy_backends() {
        let pool = pool(3);
        pool.get(0).unwrap().set_healthy(false);
        assert_eq!(select(&pool), Some(1));
    }
}
