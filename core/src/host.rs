//! # Host model
//!
//! One [`Host`] represents a distinct network endpoint, possibly known under
//! several addresses. The registry is the sole authority for creating hosts
//! and keeping address ownership unique; this module only holds the data.

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

use crate::stats::TrafficStats;

/// Stable handle to a host inside the registry.
///
/// Hosts are only removed wholesale on engine reset, so the slot index never
/// dangles while the engine runs. Consumers hold ids, never references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(pub(crate) usize);

impl HostId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Network locality of a host relative to the capture interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetArea {
    /// The capturing machine itself.
    LocalInterface,
    /// Inside the configured local network.
    Subnet,
    OutsideSubnet,
    #[default]
    Unknown,
}

#[derive(Debug)]
pub struct Host {
    id: HostId,

    /// Zero means the hardware address is not known (yet).
    pub hw_addr: MacAddr,

    ipv4_addrs: Vec<Ipv4Addr>,
    ipv6_addrs: Vec<Ipv6Addr>,

    pub hostname: Option<String>,
    /// Whether the hostname came from a reverse-DNS lookup rather than
    /// observed DNS answer traffic.
    pub hostname_from_reverse_dns: bool,

    pub area: NetArea,

    pub stats: TrafficStats,
}

impl Host {
    pub(crate) fn new(id: HostId) -> Self {
        Self {
            id,
            hw_addr: MacAddr::zero(),
            ipv4_addrs: Vec::new(),
            ipv6_addrs: Vec::new(),
            hostname: None,
            hostname_from_reverse_dns: false,
            area: NetArea::Unknown,
            stats: TrafficStats::new(),
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    /// Attaches an IPv4 address, preserving insertion order.
    /// Returns false for the zero address and for duplicates.
    pub fn add_ipv4(&mut self, addr: Ipv4Addr) -> bool {
        if addr.is_unspecified() || self.ipv4_addrs.contains(&addr) {
            return false;
        }
        self.ipv4_addrs.push(addr);
        true
    }

    /// Attaches an IPv6 address, preserving insertion order.
    pub fn add_ipv6(&mut self, addr: Ipv6Addr) -> bool {
        if addr.is_unspecified() || self.ipv6_addrs.contains(&addr) {
            return false;
        }
        self.ipv6_addrs.push(addr);
        true
    }

    pub fn has_ipv4(&self, addr: Ipv4Addr) -> bool {
        !addr.is_unspecified() && self.ipv4_addrs.contains(&addr)
    }

    pub fn has_ipv6(&self, addr: Ipv6Addr) -> bool {
        !addr.is_unspecified() && self.ipv6_addrs.contains(&addr)
    }

    /// Matches any of the host's addresses by textual form. DNS answers are
    /// cached under the ip string the decoder reported.
    pub fn has_addr_str(&self, addr: &str) -> bool {
        self.ipv4_addrs.iter().any(|a| a.to_string() == addr)
            || self.ipv6_addrs.iter().any(|a| a.to_string() == addr)
    }

    pub fn ipv4_addrs(&self) -> &[Ipv4Addr] {
        &self.ipv4_addrs
    }

    pub fn ipv6_addrs(&self) -> &[Ipv6Addr] {
        &self.ipv6_addrs
    }

    pub fn has_any_ip(&self) -> bool {
        !self.ipv4_addrs.is_empty() || !self.ipv6_addrs.is_empty()
    }

    /// Single display string for the host, in priority order:
    /// hostname, first IPv4, first IPv6, hardware address.
    pub fn preferred_label(&self) -> String {
        if let Some(name) = &self.hostname {
            return name.clone();
        }
        if let Some(ip) = self.ipv4_addrs.first() {
            return ip.to_string();
        }
        if let Some(ip) = self.ipv6_addrs.first() {
            return ip.to_string();
        }
        if self.hw_addr != MacAddr::zero() {
            return self.hw_addr.to_string();
        }
        String::new()
    }
}
