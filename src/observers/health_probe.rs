//! Periodic `/health` probe. Binary semantics per backend: a 200 response
//! marks it healthy, anything else — including a transport error — marks it
//! unhealthy. No consecutive-failure threshold; the health bit always
//! reflects the most recent probe.

use std::sync::Arc;
use std::time::Duration;

use crate::pool::Pool;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn run(pool: Arc<Pool>, client: reqwest::Client, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        for backend in pool.iter() {
            let healthy = probe_one(backend, &client).await;
            if healthy != backend.is_healthy() {
                tracing::info!(backend = %backend.name, healthy, "backend health changed");
            }
            backend.set_healthy(healthy);
        }
    }
}

async fn probe_one(backend: &crate::pool::Backend, client: &reqwest::Client) -> bool {
    let url = format!("{}/health", backend.url);
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(resp) => resp.status().as_u16() == 200,
        Err(e) => {
            tracing::warn!(backend = %backend.name, error = %e, "health probe transport error");
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{BackendSpec, Pool};

    #[tokio::test]
    async fn transport_error_marks_unhealthy() {
        let pool = Pool::new(vec![BackendSpec {
            name: "b0".into(),
            url: "http://127.0.0.1:1".into(),
            weight: 1,
        }])
        .unwrap();
        let client = reqwest::Client::new();
        let healthy = probe_one(pool.get(0).unwrap(), &client).await;
        assert!(!healthy);
    }
}
