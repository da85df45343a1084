//! # Subnet ranges and membership
//!
//! Parses the `address/prefixLength` strings the user supplies for the local
//! IPv4 subnet and the IPv6 unique-local range, and answers "is this address
//! inside the local network". The IPv6 link-local range `fe80::/10` is fixed
//! and always considered local.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::ipnetwork::{Ipv4Network, Ipv6Network};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubnetParseError {
    #[error("missing '/<prefix>' in subnet string '{0}'")]
    MissingPrefix(String),
    #[error("invalid subnet address '{0}'")]
    InvalidAddress(String),
    #[error("invalid subnet prefix '{0}'")]
    InvalidPrefix(String),
}

/// Splits `address/prefix`, requiring a non-empty prefix part.
fn split_subnet(s: &str) -> Result<(&str, &str), SubnetParseError> {
    match s.split_once('/') {
        Some((addr, prefix)) if !prefix.is_empty() => Ok((addr, prefix)),
        _ => Err(SubnetParseError::MissingPrefix(s.to_string())),
    }
}

/// Parses an IPv4 subnet string such as `192.168.1.0/24`.
///
/// The all-zero address is rejected: it is the "absent" marker, not a
/// network. No list syntax is accepted.
pub fn parse_subnet_v4(s: &str) -> Result<Ipv4Network, SubnetParseError> {
    let (addr_str, prefix_str) = split_subnet(s)?;

    let addr: Ipv4Addr = addr_str
        .parse()
        .map_err(|_| SubnetParseError::InvalidAddress(addr_str.to_string()))?;
    if addr.is_unspecified() {
        return Err(SubnetParseError::InvalidAddress(addr_str.to_string()));
    }

    let prefix: u8 = prefix_str
        .parse()
        .map_err(|_| SubnetParseError::InvalidPrefix(prefix_str.to_string()))?;

    Ipv4Network::new(addr, prefix)
        .map_err(|_| SubnetParseError::InvalidPrefix(prefix_str.to_string()))
}

/// Parses an IPv6 subnet string such as `fd00::/8`.
pub fn parse_subnet_v6(s: &str) -> Result<Ipv6Network, SubnetParseError> {
    let (addr_str, prefix_str) = split_subnet(s)?;

    let addr: Ipv6Addr = addr_str
        .parse()
        .map_err(|_| SubnetParseError::InvalidAddress(addr_str.to_string()))?;
    if addr.is_unspecified() {
        return Err(SubnetParseError::InvalidAddress(addr_str.to_string()));
    }

    let prefix: u8 = prefix_str
        .parse()
        .map_err(|_| SubnetParseError::InvalidPrefix(prefix_str.to_string()))?;

    Ipv6Network::new(addr, prefix)
        .map_err(|_| SubnetParseError::InvalidPrefix(prefix_str.to_string()))
}

/// Restrictive IPv4 default: contains nothing classifiable as a host.
pub fn restrictive_default_v4() -> Ipv4Network {
    Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 32).expect("valid prefix")
}

/// Default IPv6 unique-local range.
pub fn default_unique_local_v6() -> Ipv6Network {
    Ipv6Network::new("fd00::".parse().expect("valid address"), 8).expect("valid prefix")
}

/// Fixed link-local range, not user-configurable.
pub fn link_local_v6() -> Ipv6Network {
    Ipv6Network::new("fe80::".parse().expect("valid address"), 10).expect("valid prefix")
}

/// Last address of an IPv6 range, the broadcast-equivalent terminal value.
fn terminal_v6(net: &Ipv6Network) -> Ipv6Addr {
    let base = u128::from(net.network());
    let mask = u128::from(net.mask());
    Ipv6Addr::from(base | !mask)
}

/// Membership tests against the configured local ranges.
#[derive(Debug, Clone)]
pub struct SubnetFilter {
    v4: Ipv4Network,
    v6_unique_local: Ipv6Network,
}

impl Default for SubnetFilter {
    fn default() -> Self {
        Self {
            v4: restrictive_default_v4(),
            v6_unique_local: default_unique_local_v6(),
        }
    }
}

impl SubnetFilter {
    pub fn new(v4: Ipv4Network, v6_unique_local: Ipv6Network) -> Self {
        Self { v4, v6_unique_local }
    }

    /// Builds a filter from raw subnet strings, falling back to the
    /// restrictive defaults instead of failing on bad input.
    pub fn from_strings(subnet_v4: &str, subnet_v6: &str) -> Self {
        let v4 = match parse_subnet_v4(subnet_v4) {
            Ok(net) => net,
            Err(e) => {
                if !subnet_v4.is_empty() {
                    warn!("ignoring IPv4 subnet '{subnet_v4}': {e}");
                }
                restrictive_default_v4()
            }
        };

        let v6_unique_local = match parse_subnet_v6(subnet_v6) {
            Ok(net) => net,
            Err(e) => {
                if !subnet_v6.is_empty() {
                    warn!("ignoring IPv6 subnet '{subnet_v6}': {e}");
                }
                default_unique_local_v6()
            }
        };

        Self { v4, v6_unique_local }
    }

    /// Directed broadcast of the configured IPv4 range.
    pub fn broadcast_v4(&self) -> Ipv4Addr {
        self.v4.broadcast()
    }

    /// True when `addr` is a host address inside the configured IPv4 range.
    /// The range's broadcast address is not a host.
    pub fn contains_v4(&self, addr: Ipv4Addr) -> bool {
        if addr.is_unspecified() {
            return false;
        }

        self.v4.contains(addr) && addr != self.v4.broadcast()
    }

    /// True when `addr` is a host address inside the unique-local range or
    /// the fixed link-local range, excluding each range's terminal address.
    pub fn contains_v6(&self, addr: Ipv6Addr) -> bool {
        if addr.is_unspecified() {
            return false;
        }

        let ul = &self.v6_unique_local;
        if ul.contains(addr) && addr != terminal_v6(ul) {
            return true;
        }

        let ll = link_local_v6();
        ll.contains(addr) && addr != terminal_v6(&ll)
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.contains_v4(v4),
            IpAddr::V6(v6) => self.contains_v6(v6),
        }
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
