//! Resolution of this node's own address.
//!
//! A node identifies itself either by the first non-loopback IPv4 address of a
//! named interface (broadcast discovery) or by an explicit address that must
//! appear in a static list of herd members.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use if_addrs::IfAddr;

use crate::error::{ForageError, Result};

/// An IPv4 address together with the broadcast address of its subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAddress {
    pub ip: Ipv4Addr,
    pub broadcast: Ipv4Addr,
}

/// Find the first non-loopback IPv4 address bound to `name`.
pub fn resolve_interface(name: &str) -> Result<LocalAddress> {
    let interfaces = if_addrs::get_if_addrs()?;

    let mut seen = false;
    for iface in interfaces.iter().filter(|i| i.name == name) {
        seen = true;
        if iface.is_loopback() {
            continue;
        }
        if let IfAddr::V4(v4) = &iface.addr {
            let broadcast = v4
                .broadcast
                .unwrap_or_else(|| broadcast_address(v4.ip, v4.netmask));
            return Ok(LocalAddress {
                ip: v4.ip,
                broadcast,
            });
        }
    }

    if seen {
        Err(ForageError::NoIpv4Address(name.to_string()))
    } else {
        Err(ForageError::InterfaceNotFound(name.to_string()))
    }
}

/// Directed broadcast address: host bits all set.
pub fn broadcast_address(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(netmask))
}

/// Parse a comma-separated list of `host[:port]` entries. Entries without a
/// port use `default_port`.
pub fn parse_peers(peers: &str, default_port: u16) -> Result<Vec<SocketAddr>> {
    peers
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if let Ok(addr) = p.parse::<SocketAddr>() {
                return Ok(addr);
            }
            p.parse::<IpAddr>()
                .map(|ip| SocketAddr::new(ip, default_port))
                .map_err(|_| ForageError::InvalidPeer(p.to_string()))
        })
        .collect()
}

/// Split a static herd list into this node and its peers.
///
/// The list must contain `self_addr`; every other entry is returned in order,
/// with duplicates removed.
pub fn split_static_peers(self_addr: SocketAddr, herd: &[SocketAddr]) -> Result<Vec<SocketAddr>> {
    if !herd.contains(&self_addr) {
        return Err(ForageError::AddressNotInPeerList(self_addr));
    }

    let mut peers: Vec<SocketAddr> = Vec::with_capacity(herd.len().saturating_sub(1));
    for addr in herd {
        if *addr != self_addr && !peers.contains(addr) {
            peers.push(*addr);
        }
    }
    Ok(peers)
}
