//! The backend pool: the canonical, order-significant table of origins.

pub mod backend;
pub mod scoring;

pub use backend::{Backend, BackendState};

use crate::error::{Error, Result};

/// Configuration for one pool member, as read from the server pool config.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BackendSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Ordered, fixed-length table of backends.
///
/// Order is significant: IP-hash, round robin, and geo-routing index into
/// this table positionally, and the scenarios in the testable-properties
/// section depend on it. The pool is built once at startup and lives for
/// the process lifetime — it never grows or shrinks.
#[derive(Debug)]
pub struct Pool {
    backends: Vec<Backend>,
}

impl Pool {
    /// Builds a pool from configuration. Fails with [`Error::ConfigFault`]
    /// if the list is empty — selection could never progress otherwise.
    pub fn new(specs: Vec<BackendSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::ConfigFault("backend pool must not be empty".into()));
        }
        let backends = specs
            .into_iter()
            .map(|spec| Backend::new(spec.name, spec.url, spec.weight))
            .collect();
        Ok(Self { backends })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Backend> {
        self.backends.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backend> {
        self.backends.iter()
    }

    /// Indices of currently healthy backends, in pool order.
    #[must_use]
    pub fn healthy_indices(&self) -> Vec<usize> {
        self.backends
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.is_healthy().then_some(i))
            .collect()
    }

    #[must_use]
    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(n: usize) -> Vec<BackendSpec> {
        (0..n)
            .map(|i| BackendSpec {
                name: format!("b{i}"),
                url: format!("http://127.0.0.1:{}", 9000 + i),
                weight: 1,
            })
            .collect()
    }

    #[test]
    fn empty_pool_is_a_config_fault() {
        assert!(Pool::new(vec![]).is_err());
    }

    #[test]
    fn healthy_indices_reflect_initial_state() {
        let pool = Pool::new(specs(3)).unwrap();
        assert_eq!(pool.healthy_indices(), vec![0, 1, 2]);
        pool.get(1).unwrap().set_healthy(false);
        assert_eq!(pool.healthy_indices(), vec![0, 2]);
        assert_eq!(pool.healthy_count(), 2);
    }
}
