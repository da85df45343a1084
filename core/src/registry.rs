//! # Host registry
//!
//! Owns every known [`Host`] and is the sole authority for address
//! ownership: at most one host may claim a given non-zero hardware address,
//! and at most one may claim a given non-zero IP address of either family.
//! The deduplication rules in [`HostRegistry::create_or_update`] make a
//! violation impossible by construction.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;
use tracing::debug;

use lantern_common::network::addr::{self, AddrKind};
use lantern_common::network::subnet::SubnetFilter;

use crate::host::{Host, HostId, NetArea};

/// Outcome of an address observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostUpdate {
    /// Address already owned, or not usable for tracking.
    Unchanged,
    /// A new host was registered.
    Created(HostId),
    /// A new address was attached to an existing host.
    Attached(HostId),
}

/// Area for a host that was matched inside the local network.
///
/// A host whose hardware address equals the capture interface's own address
/// is the capturing machine itself, overriding subnet membership.
pub fn classify_host_area(host: &Host, filter: &SubnetFilter, local_hw: Option<MacAddr>) -> NetArea {
    if is_local_interface(host.hw_addr, local_hw) {
        return NetArea::LocalInterface;
    }

    let in_subnet = host.ipv4_addrs().iter().any(|ip| filter.contains_v4(*ip))
        || host.ipv6_addrs().iter().any(|ip| filter.contains_v6(*ip));

    // Hardware-only hosts can only have been seen on the local segment.
    if in_subnet || !host.has_any_ip() {
        NetArea::Subnet
    } else {
        NetArea::OutsideSubnet
    }
}

fn is_local_interface(hw: MacAddr, local_hw: Option<MacAddr>) -> bool {
    hw != MacAddr::zero() && Some(hw) == local_hw
}

#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: Vec<Host>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn host(&self, id: HostId) -> &Host {
        &self.hosts[id.0]
    }

    pub fn host_mut(&mut self, id: HostId) -> &mut Host {
        &mut self.hosts[id.0]
    }

    /// Fallible lookup for callers that may hold ids issued before a reset,
    /// such as reverse-DNS results completing late.
    pub fn try_host_mut(&mut self, id: HostId) -> Option<&mut Host> {
        self.hosts.get_mut(id.0)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    /// Drops every host. Only meaningful on full engine reset.
    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    pub fn find_by_hw(&self, hw: MacAddr) -> Option<HostId> {
        if hw == MacAddr::zero() {
            return None;
        }
        self.hosts.iter().position(|h| h.hw_addr == hw).map(HostId)
    }

    pub fn find_by_ipv4(&self, addr: Ipv4Addr) -> Option<HostId> {
        if addr.is_unspecified() {
            return None;
        }
        self.hosts.iter().position(|h| h.has_ipv4(addr)).map(HostId)
    }

    pub fn find_by_ipv6(&self, addr: Ipv6Addr) -> Option<HostId> {
        if addr.is_unspecified() {
            return None;
        }
        self.hosts.iter().position(|h| h.has_ipv6(addr)).map(HostId)
    }

    pub fn find_by_ip(&self, addr: IpAddr) -> Option<HostId> {
        match addr {
            IpAddr::V4(v4) => self.find_by_ipv4(v4),
            IpAddr::V6(v6) => self.find_by_ipv6(v6),
        }
    }

    /// Hardware address first, then IPv4, then IPv6.
    ///
    /// The ordering is load-bearing: a host may be known by hardware address
    /// before its IP has been seen, or the other way around.
    pub fn find_by_any(&self, hw: MacAddr, ipv4: Ipv4Addr, ipv6: Ipv6Addr) -> Option<HostId> {
        self.find_by_hw(hw)
            .or_else(|| self.find_by_ipv4(ipv4))
            .or_else(|| self.find_by_ipv6(ipv6))
    }

    /// ARP path: tracks an endpoint known only by hardware address.
    pub fn track_hw(
        &mut self,
        hw: MacAddr,
        filter: &SubnetFilter,
        local_hw: Option<MacAddr>,
    ) -> HostUpdate {
        if addr::hw_addr_kind(hw) != AddrKind::Unicast || self.find_by_hw(hw).is_some() {
            return HostUpdate::Unchanged;
        }

        let id = self.insert_with(|host| {
            host.hw_addr = hw;
        });
        let host = self.host_mut(id);
        host.area = classify_host_area(host, filter, local_hw);
        debug!("new host {} ({:?})", host.preferred_label(), host.area);
        HostUpdate::Created(id)
    }

    /// The deduplication algorithm, run once per observed (hardware, IP)
    /// pairing. Non-unicast addresses are excluded from matching and
    /// creation; hardware addresses are never associated across the subnet
    /// boundary.
    pub fn create_or_update(
        &mut self,
        hw: MacAddr,
        ip: IpAddr,
        filter: &SubnetFilter,
        local_hw: Option<MacAddr>,
    ) -> HostUpdate {
        let hw_kind = addr::hw_addr_kind(hw);
        let ip_kind = match ip {
            IpAddr::V4(v4) => addr::ipv4_addr_kind(v4, Some(filter.broadcast_v4())),
            IpAddr::V6(v6) => addr::ipv6_addr_kind(v6),
        };

        if hw_kind != AddrKind::Unicast && ip_kind != AddrKind::Unicast {
            return HostUpdate::Unchanged;
        }

        // Already known under this IP.
        if self.find_by_ip(ip).is_some() {
            return HostUpdate::Unchanged;
        }

        if filter.contains(ip) {
            match self.find_by_hw(hw) {
                Some(id) if ip_kind == AddrKind::Unicast => {
                    // Same physical endpoint, new logical address.
                    self.attach_ip(id, ip);
                    HostUpdate::Attached(id)
                }
                Some(_) => HostUpdate::Unchanged,
                None => {
                    let id = self.insert_with(|host| {
                        if ip_kind == AddrKind::Unicast {
                            add_ip(host, ip);
                        }
                        if hw_kind == AddrKind::Unicast {
                            host.hw_addr = hw;
                        }
                    });
                    let host = self.host_mut(id);
                    host.area = classify_host_area(host, filter, local_hw);
                    debug!("new host {} ({:?})", host.preferred_label(), host.area);
                    HostUpdate::Created(id)
                }
            }
        } else if ip_kind == AddrKind::Unicast {
            // Outside the subnet: track by IP only, never trust the
            // hardware address across the boundary.
            let id = self.insert_with(|host| {
                add_ip(host, ip);
                host.area = NetArea::OutsideSubnet;
            });
            debug!("new host {} (OutsideSubnet)", self.host(id).preferred_label());
            HostUpdate::Created(id)
        } else {
            HostUpdate::Unchanged
        }
    }

    fn attach_ip(&mut self, id: HostId, ip: IpAddr) {
        let host = self.host_mut(id);
        add_ip(host, ip);
        debug!("host {} gained {ip}", host.preferred_label());
    }

    fn insert_with(&mut self, init: impl FnOnce(&mut Host)) -> HostId {
        let id = HostId(self.hosts.len());
        let mut host = Host::new(id);
        init(&mut host);
        self.hosts.push(host);
        id
    }
}

fn add_ip(host: &mut Host, ip: IpAddr) {
    match ip {
        IpAddr::V4(v4) => host.add_ipv4(v4),
        IpAddr::V6(v6) => host.add_ipv6(v6),
    };
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
