//! Routes by the client's resolved country, with a fixed three-way bucket.

use crate::geo::{GeoLookup, is_private_or_loopback};
use crate::pool::Pool;

const ASIA_PACIFIC: &[&str] = &["IN", "CN", "JP", "KR", "AU", "SG", "TH", "VN", "MY", "PH", "ID"];
const EUROPE: &[&str] = &["FR", "DE", "IT", "ES", "NL", "BE", "PL", "SE", "FI", "IE", "DK", "PT", "AT"];

pub fn select(pool: &Pool, client_ip: &str, geo: &dyn GeoLookup, dev_fallback_ip: &str) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }
    let lookup_ip = if is_private_or_loopback(client_ip) {
        dev_fallback_ip
    } else {
        client_ip
    };
    let country = geo.lookup(lookup_ip);
    let target = match country.as_deref() {
        Some(c) if ASIA_PACIFIC.contains(&c) => 0,
        Some(c) if EUROPE.contains(&c) => 1,
        _ => 2,
    }
    .min(pool.len() - 1);

    if pool.get(target).is_some_and(|b| b.is_healthy()) {
        return Some(target);
    }
    // The fixed bucket landed on a down backend; degrade to any healthy one
    // rather than failing a request geo-routing alone can't satisfy.
    pool.healthy_indices().into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::StubGeoLookup;
    use crate::pool::{BackendSpec, Pool};

    fn pool3() -> Pool {
        Pool::new(
            (0..3)
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
    fn asia_pacific_routes_to_index_zero() {
        let pool = pool3();
        let geo = StubGeoLookup::builtin();
        assert_eq!(select(&pool, "202.12.29.1", &geo, "8.8.8.8"), Some(0));
    }

    #[test]
    fn europe_routes_to_index_one() {
        let pool = pool3();
        let geo = StubGeoLookup::builtin();
        assert_eq!(select(&pool, "193.0.6.139", &geo, "8.8.8.8"), Some(1));
    }

    #[test]
    fn everything_else_routes_to_index_two() {
        let pool = pool3();
        let geo = StubGeoLookup::builtin();
        assert_eq!(select(&pool, "8.8.8.8", &geo, "8.8.8.8"), Some(2));
    }

    #[test]
    fn private_ip_is_remapped_to_dev_fallback() {
        let pool = pool3();
        let geo = StubGeoLookup::builtin();
        assert_eq!(select(&pool, "192.168.1.5", &geo, "202.12.29.1"), Some(0));
    }

    #[test]
    fn down_bucket_backend_degrades_to_any_healthy_backend() {
        let pool = pool3();
        pool.get(0).unwrap().set_healthy(false);
        let geo = StubGeoLookup::builtin();
        assert_eq!(select(&pool, "202.12.29.1", &geo, "8.8.8.8"), Some(1));
    }
}
