//! Local network address discovery.
//!
//! Enumerates the host's interfaces to pick the address a camera URL should
//! advertise, and runs a background probe that keeps an `is_connected` flag
//! current without per-call polling.

mod ifaces;
mod monitor;

pub use ifaces::{Interface, interfaces};
pub use monitor::NetworkMonitor;

use std::net::{IpAddr, Ipv4Addr};

/// Interface names tried first when choosing the address to advertise.
/// The platform's primary wireless interface wins over everything else.
const PREFERRED_INTERFACES: &[&str] = &["wlan0", "en0"];

/// Best local IPv4 address for advertising the server URL, or `None` when
/// no usable interface exists (airplane mode, no link).
pub fn best_ip() -> Option<Ipv4Addr> {
    pick_best(&interfaces())
}

/// Every non-loopback IPv4/IPv6 address, unfiltered by preference.
pub fn all_ips() -> Vec<IpAddr> {
    interfaces()
        .into_iter()
        .map(|iface| iface.addr)
        .filter(|addr| !addr.is_loopback())
        .collect()
}

fn pick_best(ifaces: &[Interface]) -> Option<Ipv4Addr> {
    let v4 = |iface: &Interface| match iface.addr {
        IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
        _ => None,
    };

    for preferred in PREFERRED_INTERFACES {
        if let Some(ip) = ifaces
            .iter()
            .filter(|iface| iface.name == *preferred)
            .find_map(&v4)
        {
            return Some(ip);
        }
    }

    ifaces.iter().find_map(&v4)
}
