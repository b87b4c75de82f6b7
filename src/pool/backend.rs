//! A single backend origin and the mutable state observers and the request
//! path share about it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observed capacity metrics plus the selection bookkeeping that must be
/// updated together under one lock so a reader never sees a torn mix of
/// fields from two different updates.
#[derive(Debug, Clone, Copy)]
pub struct BackendState {
    /// In-flight requests this backend was selected for by a
    /// counter-tracking algorithm.
    pub connections: i64,
    /// Last observed end-to-end request duration, in seconds.
    pub response_time: f64,
    /// Last observed CPU utilisation percent, `[0,100]`.
    pub cpu: f64,
    /// Last observed memory utilisation percent, `[0,100]`.
    ///
    /// Matches the backend's self-reported `memory_usage` field verbatim;
    /// this implementation does not treat `mem` as a byte count.
    pub mem: f64,
    /// Last observed cumulative network bytes. Diagnostic only, never
    /// consumed by scoring or selection.
    pub net_usage: f64,
    /// Dynamic weight in `[1,5]` recomputed from the capacity score.
    pub effective_weight: u8,
    /// Internal accumulator for smooth weighted round robin.
    pub current_weight: i64,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            connections: 0,
            response_time: 0.0,
            cpu: 0.0,
            mem: 0.0,
            net_usage: 0.0,
            effective_weight: 1,
            current_weight: 0,
        }
    }
}

/// One origin in the pool.
///
/// `name`, `url`, and `weight` are fixed at construction. Everything else is
/// mutated concurrently by the request path and the background observers;
/// `healthy` is an independent atomic because only the health probe ever
/// writes it, while the remaining fields are grouped behind a single mutex
/// so selection algorithms can read a consistent snapshot.
#[derive(Debug)]
pub struct Backend {
    pub name: String,
    pub url: String,
    pub weight: u32,
    healthy: AtomicBool,
    state: Mutex<BackendState>,
}

impl Backend {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            weight: weight.max(1),
            healthy: AtomicBool::new(true),
            state: Mutex::new(BackendState::default()),
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    /// Consistent snapshot of the mutable metric/counter fields.
    #[must_use]
    pub fn snapshot(&self) -> BackendState {
        *self.state.lock()
    }

    #[must_use]
    pub fn connections(&self) -> i64 {
        self.state.lock().connections
    }

    /// Increment the in-flight counter. Paired with exactly one
    /// [`Backend::end_request`] on every request-path exit.
    pub fn start_request(&self) {
        self.state.lock().connections += 1;
    }

    /// Decrement the in-flight counter. Saturates at zero so a logic bug
    /// elsewhere cannot drive the invariant negative.
    pub fn end_request(&self) {
        let mut state = self.state.lock();
        state.connections = (state.connections - 1).max(0);
    }

    pub fn record_response_time(&self, secs: f64) {
        self.state.lock().response_time = secs;
    }

    /// Applied by the metrics observer after a successful `/metrics` poll.
    pub fn apply_metrics(&self, cpu: f64, mem: f64, net_usage: f64, response_time: f64, connections: i64) {
        let mut state = self.state.lock();
        state.cpu = cpu;
        state.mem = mem;
        state.net_usage = net_usage;
        state.response_time = response_time;
        state.connections = connections;
    }

    /// Applied by the optional container-stats observer, which only ever
    /// samples cpu/mem and leaves every other field untouched.
    pub fn apply_container_stats(&self, cpu: f64, mem: f64) {
        let mut state = self.state.lock();
        state.cpu = cpu;
        state.mem = mem;
    }

    pub fn set_effective_weight(&self, weight: u8) {
        self.state.lock().effective_weight = weight.clamp(1, 5);
    }

    /// Runs the smooth-WRR accumulate/pick/subtract sequence atomically
    /// against this backend's `current_weight`. The caller is responsible
    /// for doing this across the whole pool inside one critical section if
    /// picking requires comparing backends (see `selection::weighted`).
    pub fn add_current_weight(&self, delta: i64) -> i64 {
        let mut state = self.state.lock();
        state.current_weight += delta;
        state.current_weight
    }

    pub fn subtract_current_weight(&self, delta: i64) {
        self.state.lock().current_weight -= delta;
    }
}
