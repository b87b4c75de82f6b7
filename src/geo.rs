//! Geo-IP country lookup.
//!
//! The real lookup (an IP-to-country database) is an external collaborator
//! — out of scope for this crate beyond the narrow `IP -> country code`
//! interface `geo_aware` selection consults. [`StubGeoLookup`] implements
//! that interface with a small embedded table; production deployments can
//! swap in a real MaxMind-style database by implementing [`GeoLookup`].

use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};

/// `IP -> country code` lookup. Implementations should return `None`
/// (never an error) on a miss — the caller treats a miss the same as an
/// unmapped country (§4.2's "otherwise" bucket).
pub trait GeoLookup: Send + Sync {
    fn lookup(&self, ip: &str) -> Option<String>;
}

/// Minimal embedded IPv4-network-to-country table.
pub struct StubGeoLookup {
    networks: Vec<(Ipv4Addr, u32, String)>,
}

impl StubGeoLookup {
    /// Small built-in table covering the regions `geo_aware` branches on.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            networks: vec![
                (Ipv4Addr::new(202, 12, 29, 0), 24, "AU".to_string()),
                (Ipv4Addr::new(193, 0, 6, 0), 24, "AT".to_string()),
            ],
        }
    }

    /// Loads a table from a text file: one `network/prefix_len country`
    /// pair per line, blank lines and `#` comments ignored. Returns
    /// [`Error::ConfigFault`] if the path doesn't exist or a line is
    /// malformed, matching the "missing geo DB with geo_aware enabled"
    /// startup-abort case in §6.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigFault(format!("reading geo-ip database {}: {e}", path.display())))?;
        let mut networks = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let cidr = parts
                .next()
                .ok_or_else(|| Error::ConfigFault(format!("malformed geo-ip line: {line}")))?;
            let country = parts
                .next()
                .ok_or_else(|| Error::ConfigFault(format!("malformed geo-ip line: {line}")))?;
            let (addr, len) = cidr
                .split_once('/')
                .ok_or_else(|| Error::ConfigFault(format!("malformed geo-ip CIDR: {cidr}")))?;
            let addr: Ipv4Addr = addr
                .parse()
                .map_err(|_| Error::ConfigFault(format!("malformed geo-ip address: {addr}")))?;
            let len: u32 = len
                .parse()
                .map_err(|_| Error::ConfigFault(format!("malformed geo-ip prefix length: {len}")))?;
            networks.push((addr, len, country.to_uppercase()));
        }
        Ok(Self { networks })
    }
}

impl GeoLookup for StubGeoLookup {
    fn lookup(&self, ip: &str) -> Option<String> {
        let addr: Ipv4Addr = ip.parse().ok()?;
        self.networks
            .iter()
            .find(|(net, len, _)| in_network(addr, *net, *len))
            .map(|(_, _, country)| country.clone())
    }
}

fn in_network(addr: Ipv4Addr, network: Ipv4Addr, prefix_len: u32) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - prefix_len.min(32));
    (u32::from(addr) & mask) == (u32::from(network) & mask)
}

/// `true` for RFC1918 private ranges and loopback — addresses that can
/// never carry a meaningful geo signal and are remapped to the configured
/// dev-mode fallback public IP instead (§4.2).
#[must_use]
pub fn is_private_or_loopback(ip: &str) -> bool {
    let Ok(addr) = ip.parse::<Ipv4Addr>() else {
        return false;
    };
    let octets = addr.octets();
    matches!(octets[0], 127)
        || octets[0] == 10
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        || (octets[0] == 192 && octets[1] == 168)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_resolves_the_documented_scenarios() {
        let geo = StubGeoLookup::builtin();
        assert_eq!(geo.lookup("202.12.29.1").as_deref(), Some("AU"));
        assert_eq!(geo.lookup("193.0.6.139").as_deref(), Some("AT"));
        assert_eq!(geo.lookup("8.8.8.8"), None);
    }

    #[test]
    fn private_and_loopback_are_detected() {
        assert!(is_private_or_loopback("10.1.2.3"));
        assert!(is_private_or_loopback("172.16.0.1"));
        assert!(is_private_or_loopback("192.168.1.1"));
        assert!(is_private_or_loopback("127.0.0.1"));
        assert!(!is_private_or_loopback("8.8.8.8"));
    }
}
