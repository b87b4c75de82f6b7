//! Shared test harness: a tiny in-process mock backend server.
//!
//! Each mock backend answers `GET {anything}` with a fixed plain-text body
//! naming itself (so a test can tell which backend answered), optionally
//! after a configurable delay (for the timeout scenario).

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

/// A mock backend bound to an ephemeral localhost port, serving forever on
/// a background task for the lifetime of the test process.
pub struct MockBackend {
    pub addr: SocketAddr,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Starts a mock backend that immediately replies with `name` in the
    /// body of every request.
    pub async fn spawn(name: &'static str) -> Self {
        Self::spawn_with_delay(name, Duration::ZERO).await
    }

    /// Starts a mock backend that sleeps `delay` before replying, to
    /// exercise the proxy's timeout handling (S5).
    pub async fn spawn_with_delay(name: &'static str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let io = TokioIo::new(stream);
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let body = if req.uri().path() == "/health" {
                            "ok".to_string()
                        } else {
                            name.to_string()
                        };
                        Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(body))))
                    });
                    let _ = hyper::server::conn::http1::Builder::new().serve_connection(io, svc).await;
                });
            }
        });

        Self { addr }
    }
}
