//! Background observers (C5): independent periodic loops that keep the
//! pool's metric and health fields fresh. Each loop survives individual
//! backend errors indefinitely and never returns.

pub mod container_stats;
pub mod health_probe;
pub mod metrics_poll;

use std::sync::Arc;
use std::time::Duration;

use crate::pool::Pool;

/// Periods the three loops run at, plus whether the optional
/// container-stats loop is enabled.
#[derive(Debug, Clone, Copy)]
pub struct ObserverConfig {
    pub metrics_poll_period: Duration,
    pub health_probe_period: Duration,
    pub container_stats_period: Option<Duration>,
}

/// Spawns all configured observer loops as independent tasks and returns
/// immediately; the loops run for the lifetime of the process.
pub fn spawn_all(pool: Arc<Pool>, client: reqwest::Client, config: ObserverConfig) {
    tokio::spawn(metrics_poll::run(
        Arc::clone(&pool),
        client.clone(),
        config.metrics_poll_period,
    ));
    tokio::spawn(health_probe::run(Arc::clone(&pool), client, config.health_probe_period));

    if let Some(period) = config.container_stats_period {
        tokio::spawn(container_stats::run(pool, period));
    }
}
