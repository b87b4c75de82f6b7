//! Wires the backend pool, observers, shared store, and metrics exporter
//! together and runs the serving-port listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::geo::{GeoLookup, StubGeoLookup};
use crate::observers::{self, ObserverConfig};
use crate::pool::Pool;
use crate::proxy::{self, ProxyState};
use crate::selection::{RoundRobin, WeightedRoundRobin};
use crate::shared_store::{RemoteStore, StoreHandle};

/// Bounded worker pool size for in-flight proxy requests (§5: "a thread
/// pool of bounded size, e.g. 50"). A request that can't get a permit
/// within the outer proxy timeout fails with 504 rather than queueing
/// indefinitely.
const MAX_CONCURRENT_REQUESTS: usize = 50;
/// How long a connection waits for a free worker slot before giving up.
const WORKER_WAIT_TIMEOUT: Duration = Duration::from_millis(3000);

pub struct LoadBalancer {
    config: Config,
    state: Arc<ProxyState>,
}

impl LoadBalancer {
    pub fn new(config: Config) -> Result<Self> {
        let pool = Arc::new(Pool::new(config.backends.clone()).context("building backend pool")?);

        let store = Arc::new(StoreHandle::new(
            config
                .shared_store_address
                .as_deref()
                .map(RemoteStore::new)
                .transpose()
                .context("building shared-store client")?,
        ));

        let geo: Arc<dyn GeoLookup> = match &config.geo_db_path {
            Some(path) => Arc::new(StubGeoLookup::from_file(path.as_ref())?),
            None => Arc::new(StubGeoLookup::builtin()),
        };

        let client = reqwest::Client::builder()
            .build()
            .context("building outbound HTTP client")?;

        let state = Arc::new(ProxyState {
            pool,
            store,
            rr: Arc::new(RoundRobin::new()),
            wrr: Arc::new(WeightedRoundRobin::new()),
            geo,
            dev_fallback_ip: config.dev_fallback_ip.clone(),
            client,
        });

        Ok(Self { config, state })
    }

    /// Starts the background observers, the metrics exporter, and the
    /// serving-port listener. Runs until the process is signalled to stop.
    pub async fn serve(self) -> Result<()> {
        crate::metrics::install(SocketAddr::from(([0, 0, 0, 0], self.config.scrape_port)))
            .context("starting metrics exporter")?;

        observers::spawn_all(
            Arc::clone(&self.state.pool),
            self.state.client.clone(),
            ObserverConfig {
                metrics_poll_period: self.config.metrics_poll_period(),
                health_probe_period: self.config.health_probe_period(),
                container_stats_period: self.config.container_stats_period(),
            },
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.serving_port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding serving port {addr}"))?;
        tracing::info!(%addr, scrape_port = self.config.scrape_port, "load balancer listening");

        let workers = Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS));

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                },
            };
            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);
            let workers = Arc::clone(&workers);

            tokio::spawn(async move {
                // Gated per request, not per connection, so the wait timeout
                // bounds an individual request's queueing delay (§5) and a
                // saturated pool still gets a real HTTP response — never a
                // silently dropped socket — via `serve_connection` below.
                let svc = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    let workers = Arc::clone(&workers);
                    async move {
                        match tokio::time::timeout(WORKER_WAIT_TIMEOUT, workers.acquire_owned()).await {
                            Ok(Ok(_permit)) => proxy::handle_request(req, peer, state).await,
                            _ => {
                                tracing::warn!(%peer, "worker pool saturated, returning 504");
                                Ok(proxy::worker_pool_saturated_response())
                            },
                        }
                    }
                });
                if let Err(e) = hyper::server::conn::http1::Builder::new().serve_connection(io, svc).await {
                    tracing::debug!(error = %e, "connection closed with error");
                }
            });
        }
    }
}
