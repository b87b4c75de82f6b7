//! Structured error taxonomy for the load balancer.
//!
//! Request-scoped errors become HTTP responses ([`Error::status_code`]);
//! observer and shared-store errors are logged and degrade state but never
//! propagate to an in-flight request.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the selection engine and request path.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The `algo` query parameter named an algorithm that doesn't exist.
    #[error("invalid algorithm specified")]
    ClientBadRequest,

    /// The dispatcher found no healthy backend to route to.
    #[error("no backend available")]
    NoBackendAvailable,

    /// The outbound call to the chosen backend exceeded its timeout budget.
    #[error("backend timeout")]
    BackendTimeout,

    /// The outbound call failed below the HTTP layer (connect refused, reset).
    #[error("backend transport error: {0}")]
    BackendTransport(String),

    /// A background observer failed to poll a backend. Never surfaced to a
    /// request; the prior field values are kept.
    #[error("observer fault: {0}")]
    ObserverFault(String),

    /// The shared key-value store was unreachable. The caller degrades to
    /// local state and continues serving.
    #[error("shared store fault: {0}")]
    StoreFault(String),

    /// The backend pool or server configuration is malformed at startup.
    #[error("configuration error: {0}")]
    ConfigFault(String),
}

impl Error {
    /// HTTP status code a request-scoped error maps to.
    ///
    /// `ObserverFault` and `StoreFault` never reach this path in practice —
    /// callers absorb them before building a response — but a status is
    /// still defined so the mapping stays total.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ClientBadRequest => 400,
            Self::NoBackendAvailable => 503,
            Self::BackendTimeout => 504,
            Self::BackendTransport(_) | Self::ObserverFault(_) | Self::StoreFault(_) => 500,
            Self::ConfigFault(_) => 500,
        }
    }

    /// JSON error body for the request path, matching the wire shape every
    /// error kind in the taxonomy uses: `{"error": "..."}`.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}
