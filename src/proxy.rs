//! Request path (C7): parse -> resolve algorithm -> select -> proxy with a
//! timeout budget -> release counters -> record metrics, on every exit.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response, StatusCode};

use crate::adaptive;
use crate::error::Error;
use crate::geo::GeoLookup;
use crate::metrics;
use crate::pool::{Backend, Pool};
use crate::selection::{self, Algo, RequestContext, RoundRobin, WeightedRoundRobin};
use crate::shared_store::StoreHandle;

/// Outbound connect+read budget for the proxied call (§4.6 step 11).
const BACKEND_TIMEOUT: Duration = Duration::from_millis(2500);
/// Hard outer ceiling on the whole request, covering any additional
/// queueing delay (§5 "Resource caps").
const OUTER_TIMEOUT: Duration = Duration::from_millis(3000);

/// Shared state for every connection the listener accepts.
pub struct ProxyState {
    pub pool: Arc<Pool>,
    pub store: Arc<StoreHandle>,
    pub rr: Arc<RoundRobin>,
    pub wrr: Arc<WeightedRoundRobin>,
    pub geo: Arc<dyn GeoLookup>,
    pub dev_fallback_ip: String,
    pub client: reqwest::Client,
}

/// Runs the finally-block guarantees of §4.6 step 13 / §5 "Cancellation"
/// even if the surrounding future is dropped before completing: connection
/// counter release, response-time bookkeeping, and the duration histogram
/// all happen in `Drop` unless [`RequestGuard::finish`] already ran them.
struct RequestGuard<'a> {
    backend: Option<&'a Backend>,
    counted: bool,
    algo: &'static str,
    start: Instant,
    done: bool,
}

impl<'a> RequestGuard<'a> {
    fn new(algo: &'static str) -> Self {
        Self {
            backend: None,
            counted: false,
            algo,
            start: Instant::now(),
            done: false,
        }
    }

    fn attach(&mut self, backend: &'a Backend, counted: bool) {
        self.backend = Some(backend);
        self.counted = counted;
    }

    fn finish(mut self) {
        self.done = true;
        self.release();
    }

    fn release(&self) {
        if self.counted
            && let Some(backend) = self.backend
        {
            backend.end_request();
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        if let Some(backend) = self.backend {
            backend.record_response_time(elapsed);
        }
        metrics::record_duration(self.algo, elapsed);
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.release();
        }
    }
}

/// Hop-by-hop headers that must never be forwarded verbatim (RFC 7230
/// §6.1), mirrored from the reverse-proxy's outbound header filter.
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

fn client_ip<B>(req: &Request<B>, peer: SocketAddr) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response is well-formed")
}

fn error_response(err: &Error) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, err.body())
}

/// Response for a connection that never got a worker slot within the wait
/// timeout (§5 "Resource caps": "wait for a worker up to the outer timeout,
/// then fail with 504"). Reuses `BackendTimeout`'s JSON shape — from the
/// client's point of view this is the same class of failure, a request
/// that the load balancer could not serve in time.
#[must_use]
pub fn worker_pool_saturated_response() -> Response<Full<Bytes>> {
    error_response(&Error::BackendTimeout)
}

/// Generic over the request body type: this handler never reads the
/// request body, so it accepts whatever the transport hands it (`Incoming`
/// from the live listener, or a unit body built directly in tests).
pub async fn handle_request<B>(
    req: Request<B>,
    peer: SocketAddr,
    state: Arc<ProxyState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    metrics::record_request();

    let requested_algo = req.uri().query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "algo")
            .map(|(_, v)| v.into_owned())
    });

    let parsed_algo = match requested_algo.as_deref() {
        None => None,
        Some(raw) => match Algo::parse(raw) {
            Some(algo) => Some(algo),
            None => return Ok(error_response(&Error::ClientBadRequest)),
        },
    };

    let resolved = parsed_algo.unwrap_or_else(|| adaptive::choose_algorithm(&state.pool));

    // Read-before-write: the reset decision must see the *previous* value,
    // never the one this request is about to write (§9).
    let previous_algo = state.store.last_used_algo().await;
    let previous_was_rr_family = previous_algo.as_deref().and_then(Algo::parse).is_some_and(Algo::is_rr_family);
    if resolved.is_rr_family() && !previous_was_rr_family {
        state.store.reset_next_server_index().await;
    }
    state.store.set_last_used_algo(resolved.as_str()).await;

    let ip = client_ip(&req, peer);
    let ctx = RequestContext { client_ip: &ip };

    let mut guard = RequestGuard::new(resolved.as_str());

    let index = if resolved == Algo::Adaptive {
        adaptive::select_adaptive(&state.pool, &state.store).await
    } else {
        selection::select_server(
            resolved,
            &state.pool,
            &ctx,
            &state.store,
            &state.rr,
            &state.wrr,
            state.geo.as_ref(),
            &state.dev_fallback_ip,
        )
        .await
    };

    let Some(index) = index else {
        guard.finish();
        return Ok(error_response(&Error::NoBackendAvailable));
    };

    let backend = state.pool.get(index).expect("dispatcher returns an in-range index");

    let counted = resolved.is_counter_tracking();
    if counted {
        backend.start_request();
    }
    guard.attach(backend, counted);

    metrics::record_algo_request(resolved.as_str());

    let outcome = proxy_one(&state.client, backend, resolved.as_str()).await;
    guard.finish();

    Ok(match outcome {
        Ok(response) => response,
        Err(err) => error_response(&err),
    })
}

async fn proxy_one(
    client: &reqwest::Client,
    backend: &Backend,
    algo: &str,
) -> Result<Response<Full<Bytes>>, Error> {
    let url = format!("{}?algo={algo}", backend.url);

    let call = client.get(&url).timeout(BACKEND_TIMEOUT).send();
    let result = tokio::time::timeout(OUTER_TIMEOUT, call).await;

    let resp = match result {
        Err(_elapsed) => return Err(Error::BackendTimeout),
        Ok(Err(e)) if e.is_timeout() => return Err(Error::BackendTimeout),
        Ok(Err(e)) => return Err(Error::BackendTransport(e.to_string())),
        Ok(Ok(resp)) => resp,
    };

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = resp.headers().clone();
    let body = resp
        .bytes()
        .await
        .map_err(|e| Error::BackendTransport(e.to_string()))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        if !is_hop_by_hop_header(name.as_str()) {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Full::new(body))
        .map_err(|e| Error::BackendTransport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_filtered() {
        assert!(is_hop_by_hop_header("Connection"));
        assert!(is_hop_by_hop_header("keep-alive"));
        assert!(!is_hop_by_hop_header("content-type"));
    }

    #[test]
    fn error_response_maps_status_codes() {
        assert_eq!(error_response(&Error::ClientBadRequest).status(), 400);
        assert_eq!(error_response(&Error::NoBackendAvailable).status(), 503);
        assert_eq!(error_response(&Error::BackendTimeout).status(), 504);
    }
}
