//! Gateway address to network address conversion.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::model::Value;

/// Returns the network in CIDR form for a gateway such as `10.0.0.1/24`.
///
/// Host bits are cleared (`10.0.0.1/24` → `10.0.0.0/24`). A bare address is
/// treated as a host route. Empty or unparseable input yields `None`.
pub fn network_address(gateway: &str) -> Option<String> {
    let gateway = gateway.trim();
    if gateway.is_empty() {
        return None;
    }
    let (addr, len) = match gateway.split_once('/') {
        Some((addr, len)) => (addr.parse::<IpAddr>().ok()?, Some(len.parse::<u8>().ok()?)),
        None => (gateway.parse::<IpAddr>().ok()?, None),
    };

    match addr {
        IpAddr::V4(addr) => {
            let len = len.unwrap_or(32);
            let network = cut_v4(addr, len)?;
            Some(format!("{network}/{len}"))
        }
        IpAddr::V6(addr) => {
            let len = len.unwrap_or(128);
            let network = cut_v6(addr, len)?;
            Some(format!("{network}/{len}"))
        }
    }
}

/// Cell-level wrapper: null or invalid gateways become an empty cell.
pub fn network_value(gateway: &Value) -> Value {
    Value::from_optional(gateway.as_text().and_then(|gw| network_address(&gw)))
}

fn cut_v4(addr: Ipv4Addr, len: u8) -> Option<Ipv4Addr> {
    if len > 32 {
        return None;
    }
    let mask = u32::MAX.checked_shl(32 - u32::from(len)).unwrap_or(0);
    Some(Ipv4Addr::from(u32::from(addr) & mask))
}

fn cut_v6(addr: Ipv6Addr, len: u8) -> Option<Ipv6Addr> {
    if len > 128 {
        return None;
    }
    let mask = u128::MAX.checked_shl(128 - u32::from(len)).unwrap_or(0);
    Some(Ipv6Addr::from(u128::from(addr) & mask))
}
