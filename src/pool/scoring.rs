//! Pure functions mapping raw backend metrics to a capacity score and
//! effective weight. No shared state; safe to call from any thread without
//! locking.

use super::backend::BackendState;

const CPU_CAP: f64 = 100.0;
const MEM_CAP: f64 = 100.0;
const CONN_CAP: f64 = 100.0;
const RESP_CAP: f64 = 1.0;

/// `min(max(v, 0) / cap, 1.0)`; non-finite input normalises to 0.
fn normalize(v: f64, cap: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    (v.max(0.0) / cap).min(1.0)
}

/// Capacity score in `[0,1]`; higher means more headroom.
///
/// `score = 0.4*(1-cpuN) + 0.2*(1-memN) + 0.2*(1-connN) + 0.2*(1-respN)`.
/// A zero raw reading (the optimistic default for an unmeasured backend)
/// normalizes to 0 and so contributes the maximal `1.0` headroom term for
/// that dimension — fresh backends are eligible for traffic immediately.
#[must_use]
pub fn capacity_score(state: &BackendState) -> f64 {
    let cpu_n = normalize(state.cpu, CPU_CAP);
    let mem_n = normalize(state.mem, MEM_CAP);
    #[allow(clippy::cast_precision_loss)]
    let conn_n = normalize(state.connections as f64, CONN_CAP);
    let resp_n = normalize(state.response_time, RESP_CAP);

    0.4 * (1.0 - cpu_n) + 0.2 * (1.0 - mem_n) + 0.2 * (1.0 - conn_n) + 0.2 * (1.0 - resp_n)
}

/// `clamp(round(score*5), 1, 5)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn effective_weight(score: f64) -> u8 {
    let rounded = (score * 5.0).round();
    rounded.clamp(1.0, 5.0) as u8
}

/// `static_weight / (0.6*cpu + 0.2*mem + 0.2*connections + eps)`, the ratio
/// the adaptive meta-selector ranks backends by (§4.3). Uses raw (un-
/// normalized) cpu/mem/connections, matching the source formula.
#[must_use]
pub fn headroom_ratio(weight: u32, state: &BackendState) -> f64 {
    const EPS: f64 = 1e-5;
    #[allow(clippy::cast_precision_loss)]
    let connections = state.connections as f64;
    let denom = 0.6 * state.cpu + 0.2 * state.mem + 0.2 * connections + EPS;
    f64::from(weight) / denom
}
