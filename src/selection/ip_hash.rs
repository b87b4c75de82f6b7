//! Deterministic client-IP stickiness via MD5.
//!
//! MD5 is chosen purely for bit-exact reproducibility with the reference
//! implementation's hashing — there is no security requirement here.

use crate::pool::Pool;

pub fn select(pool: &Pool, client_ip: &str) -> Option<usize> {
    let healthy = pool.healthy_indices();
    if healthy.is_empty() {
        return None;
    }
    let digest = md5::compute(client_ip.as_bytes());
    let as_int = u128::from_be_bytes(digest.0);
    #[allow(clippy::cast_possible_truncation)]
    let pos = (as_int % healthy.len() as u128) as usize;
    Some(healthy[pos])
}
