//! Exported metrics (C8): the three series described in §4.7, published to
//! a Prometheus scrape endpoint on its own port, separate from the
//! request-serving port.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Installs the global Prometheus recorder and starts its HTTP listener.
/// Call once at startup, before any `record_*` call.
pub fn install(scrape_addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(scrape_addr)
        .install()?;
    Ok(())
}

/// `load_balancer_requests_total` — incremented once per inbound request,
/// regardless of outcome.
pub fn record_request() {
    metrics::counter!("load_balancer_requests_total").increment(1);
}

/// `load_balancer_algo_requests_total{algo}` — incremented once the
/// dispatcher has accepted a concrete algorithm for this request.
pub fn record_algo_request(algo: &str) {
    metrics::counter!("load_balancer_algo_requests_total", "algo" => algo.to_string()).increment(1);
}

/// `load_balancer_response_duration_seconds{algo}` — observed exactly once
/// per request that reaches a terminal outcome (success, timeout, or
/// transport error all count).
pub fn record_duration(algo: &str, seconds: f64) {
    metrics::histogram!("load_balancer_response_duration_seconds", "algo" => algo.to_string()).record(seconds);
}
