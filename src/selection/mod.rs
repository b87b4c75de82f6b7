//! Selection algorithms (C3): seven deterministic policies that each pick
//! one backend from the pool given request context, plus the dispatcher
//! that resolves an algorithm name to one of them.

mod geo_aware;
mod ip_hash;
mod least_connections;
mod least_response_time;
mod power_of_two;
mod round_robin;
mod weighted_round_robin;

pub use round_robin::RoundRobin;
pub use weighted_round_robin::WeightedRoundRobin;

use crate::geo::GeoLookup;
use crate::pool::Pool;
use crate::shared_store::StoreHandle;

/// Request-scoped context selection algorithms consult.
pub struct RequestContext<'a> {
    pub client_ip: &'a str,
}

/// The closed set of selectable algorithm names, including the meta
/// `adaptive` mode (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algo {
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
    IpHash,
    PowerOfTwo,
    LeastResponseTime,
    GeoAware,
    Adaptive,
}

impl Algo {
    /// Parses a query-string `algo` value. Returns `None` for anything
    /// outside the closed set, which the request path turns into a 400.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "round_robin" => Self::RoundRobin,
            "weighted_round_robin" => Self::WeightedRoundRobin,
            "least_connections" => Self::LeastConnections,
            "ip_hash" => Self::IpHash,
            "power_of_two" => Self::PowerOfTwo,
            "least_response_time" => Self::LeastResponseTime,
            "geo_aware" => Self::GeoAware,
            "adaptive" => Self::Adaptive,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::WeightedRoundRobin => "weighted_round_robin",
            Self::LeastConnections => "least_connections",
            Self::IpHash => "ip_hash",
            Self::PowerOfTwo => "power_of_two",
            Self::LeastResponseTime => "least_response_time",
            Self::GeoAware => "geo_aware",
            Self::Adaptive => "adaptive",
        }
    }

    /// Whether this algorithm belongs to the round-robin family, for the
    /// algorithm-change cursor reset rule (§4.2).
    #[must_use]
    pub fn is_rr_family(self) -> bool {
        matches!(self, Self::RoundRobin | Self::WeightedRoundRobin)
    }

    /// Whether the request path must increment/decrement `connections`
    /// around the proxy call for this algorithm (§4.6 step 9; §9 closes the
    /// counter-leak by making this ordering explicit in the caller).
    #[must_use]
    pub fn is_counter_tracking(self) -> bool {
        matches!(self, Self::LeastConnections | Self::PowerOfTwo)
    }
}

/// Outcome of a concrete (non-meta) selection: the chosen pool index, or
/// `None` if the pool has no healthy backend left.
pub type Selected = Option<usize>;

/// Dispatches to one of the seven concrete algorithms. Adaptive mode is
/// resolved by the caller before reaching here (it either resolves to a
/// concrete algorithm via `crate::adaptive::choose_algorithm`, or — in
/// explicit `adaptive` mode — is handled entirely by
/// `crate::adaptive::select_adaptive`), so this dispatcher never sees
/// `Algo::Adaptive`.
#[allow(clippy::too_many_arguments)]
pub async fn select_server(
    algo: Algo,
    pool: &Pool,
    ctx: &RequestContext<'_>,
    store: &StoreHandle,
    rr: &RoundRobin,
    wrr: &WeightedRoundRobin,
    geo: &dyn GeoLookup,
    dev_fallback_ip: &str,
) -> Selected {
    match algo {
        Algo::RoundRobin => rr.select(pool, store).await,
        Algo::WeightedRoundRobin => wrr.select(pool),
        Algo::LeastConnections => least_connections::select(pool),
        Algo::IpHash => ip_hash::select(pool, ctx.client_ip),
        Algo::PowerOfTwo => power_of_two::select(pool),
        Algo::LeastResponseTime => least_response_time::select(pool),
        Algo::GeoAware => geo_aware::select(pool, ctx.client_ip, geo, dev_fallback_ip),
        Algo::Adaptive => unreachable!("adaptive mode is resolved before dispatch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_through_as_str() {
        for name in [
            "round_robin",
            "weighted_round_robin",
            "least_connections",
            "ip_hash",
            "power_of_two",
            "least_response_time",
            "geo_aware",
            "adaptive",
        ] {
            assert_eq!(Algo::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn unknown_algo_does_not_parse() {
        assert!(Algo::parse("banana").is_none());
    }

    #[test]
    fn only_rr_family_triggers_cursor_reset() {
        assert!(Algo::RoundRobin.is_rr_family());
        assert!(Algo::WeightedRoundRobin.is_rr_family());
        assert!(!Algo::LeastConnections.is_rr_family());
        assert!(!Algo::Adaptive.is_rr_family());
    }
}
