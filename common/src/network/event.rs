//! # Decoded-Event Record
//!
//! The normalized description of one observed packet, produced by the
//! capture/decoder collaborator. The core consumes these records one at a
//! time and never keeps them beyond the current dispatch.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

/// Protocol layer a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Link,
    Network,
    Transport,
}

/// Protocol identifier per layer. `Unknown` doubles as "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Unknown,

    // link layer
    EthernetII,

    // network layer
    Arp,
    Ipv4,
    Ipv6,
    OtherLink,

    // transport layer
    Icmp,
    Icmpv6,
    Tcp,
    Udp,
    OtherTransport,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Unknown => "Unknown",
            Protocol::EthernetII => "EthernetII",
            Protocol::Arp => "ARP",
            Protocol::Ipv4 => "IPv4",
            Protocol::Ipv6 => "IPv6",
            Protocol::OtherLink => "Other",
            Protocol::Icmp => "ICMP",
            Protocol::Icmpv6 => "ICMPv6",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::OtherTransport => "Other",
        };
        f.write_str(name)
    }
}

/// One observed packet. Zero addresses mean "absent".
#[derive(Debug, Clone)]
pub struct NetEvent {
    /// Size of the captured frame in bytes.
    pub size: u64,

    pub link: Protocol,
    pub network: Protocol,
    pub transport: Protocol,

    pub src_hw: MacAddr,
    pub dst_hw: MacAddr,

    pub src_ipv4: Ipv4Addr,
    pub dst_ipv4: Ipv4Addr,

    pub src_ipv6: Ipv6Addr,
    pub dst_ipv6: Ipv6Addr,
}

impl Default for NetEvent {
    fn default() -> Self {
        Self {
            size: 0,
            link: Protocol::Unknown,
            network: Protocol::Unknown,
            transport: Protocol::Unknown,
            src_hw: MacAddr::zero(),
            dst_hw: MacAddr::zero(),
            src_ipv4: Ipv4Addr::UNSPECIFIED,
            dst_ipv4: Ipv4Addr::UNSPECIFIED,
            src_ipv6: Ipv6Addr::UNSPECIFIED,
            dst_ipv6: Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl NetEvent {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn protocol_at(&self, layer: Layer) -> Protocol {
        match layer {
            Layer::Link => self.link,
            Layer::Network => self.network,
            Layer::Transport => self.transport,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.network == Protocol::Ipv4
    }

    pub fn is_ipv6(&self) -> bool {
        self.network == Protocol::Ipv6
    }

    /// Most specific protocol tag carried by the record.
    pub fn top_level_protocol(&self) -> Protocol {
        if self.transport != Protocol::Unknown {
            self.transport
        } else if self.network != Protocol::Unknown {
            self.network
        } else {
            self.link
        }
    }
}

impl fmt::Display for NetEvent {
    /// Compact one-line summary used in trace logging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}:{}:{}]",
            self.size, self.link, self.network, self.transport
        )?;

        if self.link != Protocol::Unknown {
            write!(f, " [{} > {}]", self.src_hw, self.dst_hw)?;

            if self.is_ipv6() {
                write!(f, " [{} > {}]", self.src_ipv6, self.dst_ipv6)?;
            } else if self.is_ipv4() {
                write!(f, " [{} > {}]", self.src_ipv4, self.dst_ipv4)?;
            }
        }

        Ok(())
    }
}
