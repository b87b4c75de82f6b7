//! Periodic `/metrics` poll: refreshes each backend's cpu/mem/connections/
//! response-time fields and recomputes its effective weight.

use std::sync::Arc;
use std::time::Duration;

use crate::pool::{Pool, scoring};

/// Bounds each per-backend `/metrics` call so one slow backend can't stall
/// the whole poll iteration.
const POLL_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, serde::Deserialize)]
struct BackendMetrics {
    cpu_usage: f64,
    memory_usage: f64,
    net_usage: f64,
    active_connections: i64,
    response_time: f64,
}

/// Runs forever, polling every backend once per `period`. A failed poll for
/// one backend is logged and leaves that backend's prior values untouched —
/// it never aborts the loop or affects other backends (§4.4).
pub async fn run(pool: Arc<Pool>, client: reqwest::Client, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        for backend in pool.iter() {
            if let Err(e) = poll_one(backend, &client).await {
                tracing::warn!(backend = %backend.name, error = %e, "metrics poll failed, keeping prior values");
            }
        }
    }
}

async fn poll_one(backend: &crate::pool::Backend, client: &reqwest::Client) -> anyhow::Result<()> {
    let url = format!("{}/metrics", backend.url);
    let metrics: BackendMetrics = client
        .get(url)
        .timeout(POLL_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    backend.apply_metrics(
        metrics.cpu_usage,
        metrics.memory_usage,
        metrics.net_usage,
        metrics.response_time,
        metrics.active_connections,
    );
    let score = scoring::capacity_score(&backend.snapshot());
    backend.set_effective_weight(scoring::effective_weight(score));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BackendSpec;

    #[test]
    fn backend_metrics_json_shape_matches_the_wire_contract() {
        let raw = r#"{
            "cpu_usage": 12.5,
            "memory_usage": 40.0,
            "net_usage": 1024.0,
            "active_connections": 3,
            "response_time": 0.08
        }"#;
        let parsed: BackendMetrics = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.active_connections, 3);
        assert!((parsed.response_time - 0.08).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_poll_leaves_prior_values_in_place() {
        let pool = Pool::new(vec![BackendSpec {
            name: "b0".into(),
            url: "http://127.0.0.1:1".into(), // nothing listens here
            weight: 1,
        }])
        .unwrap();
        pool.get(0).unwrap().apply_metrics(10.0, 20.0, 30.0, 0.1, 2);
        let client = reqwest::Client::new();
        let result = poll_one(pool.get(0).unwrap(), &client).await;
        assert!(result.is_err());
        let state = pool.get(0).unwrap().snapshot();
        assert_eq!(state.cpu, 10.0);
        assert_eq!(state.connections, 2);
    }
}
