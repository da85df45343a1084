//! # Per-host traffic statistics
//!
//! Counters are kept per (IP-version scope, protocol) bucket. The bucket set
//! is fixed at construction; one record may update several buckets (the
//! link-layer total plus the specific protocol), which is intentional.

use lantern_common::network::event::{Layer, NetEvent, Protocol};

/// Scope of a bucket over the record's IP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

/// One counter bucket. All counters are monotonically increasing.
#[derive(Debug)]
pub struct StatItem {
    pub scope: IpVersion,
    pub layer: Layer,
    pub protocol: Protocol,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl StatItem {
    fn new(scope: IpVersion, layer: Layer, protocol: Protocol) -> Self {
        Self {
            scope,
            layer,
            protocol,
            packets_sent: 0,
            packets_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    fn add(&mut self, direction: Direction, size: u64) {
        match direction {
            Direction::Send => {
                self.packets_sent += 1;
                self.bytes_sent += size;
            }
            Direction::Receive => {
                self.packets_received += 1;
                self.bytes_received += size;
            }
        }
    }

    /// Whether this bucket counts the given record.
    ///
    /// The protocol must match at the bucket's layer; the scope matches when
    /// it is `All`, when the record is of the bucket's IP version, or when
    /// the bucket counts ARP (IPv4-adjacent but carried at L2, so it is
    /// counted regardless of the record's IP version tag).
    fn matches(&self, event: &NetEvent) -> bool {
        if event.protocol_at(self.layer) != self.protocol {
            return false;
        }

        match self.scope {
            IpVersion::All => true,
            IpVersion::V4 => event.is_ipv4() || self.protocol == Protocol::Arp,
            IpVersion::V6 => event.is_ipv6() || self.protocol == Protocol::Arp,
        }
    }
}

#[derive(Debug)]
pub struct TrafficStats {
    items: Vec<StatItem>,
}

impl Default for TrafficStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficStats {
    /// Pre-registers the fixed bucket set. Buckets are never added or
    /// removed afterwards.
    pub fn new() -> Self {
        let mut stats = Self { items: Vec::new() };

        stats.register(IpVersion::All, Layer::Link, Protocol::EthernetII);
        stats.register(IpVersion::All, Layer::Link, Protocol::Unknown);
        stats.register(IpVersion::All, Layer::Network, Protocol::OtherLink);
        stats.register(IpVersion::V4, Layer::Network, Protocol::Arp);

        stats.register(IpVersion::V4, Layer::Transport, Protocol::Icmp);
        stats.register(IpVersion::V4, Layer::Transport, Protocol::Tcp);
        stats.register(IpVersion::V4, Layer::Transport, Protocol::Udp);
        stats.register(IpVersion::V4, Layer::Transport, Protocol::OtherTransport);

        stats.register(IpVersion::V6, Layer::Transport, Protocol::Icmpv6);
        stats.register(IpVersion::V6, Layer::Transport, Protocol::Tcp);
        stats.register(IpVersion::V6, Layer::Transport, Protocol::Udp);
        stats.register(IpVersion::V6, Layer::Transport, Protocol::OtherTransport);

        stats
    }

    fn register(&mut self, scope: IpVersion, layer: Layer, protocol: Protocol) {
        self.items.push(StatItem::new(scope, layer, protocol));
    }

    /// Adds the record to every matching bucket.
    pub fn tally(&mut self, direction: Direction, event: &NetEvent) {
        for item in &mut self.items {
            if item.matches(event) {
                item.add(direction, event.size);
            }
        }
    }

    /// Read-only bucket access for display; never mutate through this.
    pub fn get(&self, scope: IpVersion, protocol: Protocol) -> Option<&StatItem> {
        self.items
            .iter()
            .find(|item| item.scope == scope && item.protocol == protocol)
    }

    pub fn items(&self) -> &[StatItem] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_event(size: u64) -> NetEvent {
        let mut event = NetEvent::new(size);
        event.link = Protocol::EthernetII;
        event.network = Protocol::Ipv4;
        event.transport = Protocol::Tcp;
        event
    }

    fn arp_event(size: u64) -> NetEvent {
        let mut event = NetEvent::new(size);
        event.link = Protocol::EthernetII;
        event.network = Protocol::Arp;
        event
    }

    #[test]
    fn tcp_record_updates_total_and_tcp_buckets() {
        let mut stats = TrafficStats::new();
        stats.tally(Direction::Send, &tcp_event(100));

        let total = stats.get(IpVersion::All, Protocol::EthernetII).unwrap();
        assert_eq!(total.packets_sent, 1);
        assert_eq!(total.bytes_sent, 100);

        let tcp4 = stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!(tcp4.packets_sent, 1);
        assert_eq!(tcp4.bytes_sent, 100);
        assert_eq!(tcp4.packets_received, 0);

        // Wrong IP version stays untouched.
        let tcp6 = stats.get(IpVersion::V6, Protocol::Tcp).unwrap();
        assert_eq!(tcp6.packets_sent, 0);

        let udp4 = stats.get(IpVersion::V4, Protocol::Udp).unwrap();
        assert_eq!(udp4.packets_sent, 0);
    }

    #[test]
    fn arp_counts_without_an_ip_version_tag() {
        let mut stats = TrafficStats::new();
        stats.tally(Direction::Receive, &arp_event(60));

        let arp = stats.get(IpVersion::V4, Protocol::Arp).unwrap();
        assert_eq!(arp.packets_received, 1);
        assert_eq!(arp.bytes_received, 60);
    }

    #[test]
    fn counters_accumulate_additively() {
        let mut stats = TrafficStats::new();
        for _ in 0..7 {
            stats.tally(Direction::Send, &tcp_event(150));
        }

        let tcp4 = stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!(tcp4.packets_sent, 7);
        assert_eq!(tcp4.bytes_sent, 7 * 150);
    }

    #[test]
    fn unrecognized_framing_hits_the_unknown_bucket() {
        let mut stats = TrafficStats::new();
        stats.tally(Direction::Receive, &NetEvent::new(42));

        let unknown = stats.get(IpVersion::All, Protocol::Unknown).unwrap();
        assert_eq!(unknown.packets_received, 1);
        assert_eq!(unknown.bytes_received, 42);
    }
}
