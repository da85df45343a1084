//! Address-kind classification.
//!
//! The all-zero value of each family means "no address" and is never treated
//! as a real one. Broadcast destinations are folded into [`AddrKind::Multicast`]
//! because both route one-to-many.

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrKind {
    Unicast,
    Multicast,
    Unknown,
}

/// Classifies a hardware address.
///
/// The I/G bit of the first octet distinguishes group (multicast/broadcast)
/// addresses from unicast ones.
pub fn hw_addr_kind(addr: MacAddr) -> AddrKind {
    if addr == MacAddr::zero() {
        return AddrKind::Unknown;
    }

    if addr.0 & 0x01 != 0 {
        AddrKind::Multicast
    } else {
        AddrKind::Unicast
    }
}

/// Classifies an IPv4 address.
///
/// `subnet_broadcast` is the directed broadcast of the configured local
/// range; packets to it are one-to-many even though the address itself
/// is not in the multicast block.
pub fn ipv4_addr_kind(addr: Ipv4Addr, subnet_broadcast: Option<Ipv4Addr>) -> AddrKind {
    if addr.is_unspecified() {
        return AddrKind::Unknown;
    }

    let directed = subnet_broadcast.is_some_and(|b| b == addr);
    if addr.is_broadcast() || addr.is_multicast() || directed {
        AddrKind::Multicast
    } else {
        AddrKind::Unicast
    }
}

/// Classifies an IPv6 address. IPv6 has no broadcast; only `ff00::/8`
/// routes one-to-many.
pub fn ipv6_addr_kind(addr: Ipv6Addr) -> AddrKind {
    if addr.is_unspecified() {
        return AddrKind::Unknown;
    }

    if addr.is_multicast() {
        AddrKind::Multicast
    } else {
        AddrKind::Unicast
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
