//! # Traffic engine
//!
//! Consumes decoded packet records from the capture thread, drives host
//! discovery and deduplication, feeds per-host statistics, and notifies the
//! registered listener. All mutable state lives behind a single mutex: the
//! capture thread writes through [`TrafficEngine::handle_event`] while the
//! render loop reads through [`TrafficEngine::with_hosts`], and processing
//! one record is a single lock acquisition, so no partial update is ever
//! observable.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;

use anyhow::Context;
use pnet::datalink;
use pnet::util::MacAddr;
use tracing::{debug, trace, warn};

use lantern_common::config::CaptureConfig;
use lantern_common::network::addr::{self, AddrKind};
use lantern_common::network::event::{NetEvent, Protocol};
use lantern_common::network::subnet::{
    self, SubnetFilter, default_unique_local_v6, restrictive_default_v4,
};

use crate::dns_cache::DnsAnswerCache;
use crate::host::HostId;
use crate::listener::TrafficListener;
use crate::registry::{HostRegistry, HostUpdate};
use crate::stats::Direction;

/// Hardware address of the capture interface itself, used to recognize the
/// capturing machine among the discovered hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInterface {
    pub hw_addr: Option<MacAddr>,
}

struct EngineState {
    registry: HostRegistry,
    filter: SubnetFilter,
    local: LocalInterface,
    dns_cache: DnsAnswerCache,
    listener: Option<Box<dyn TrafficListener>>,
    event_counter: u64,
    running: bool,
    paused: bool,
}

impl EngineState {
    fn new() -> Self {
        Self {
            registry: HostRegistry::new(),
            filter: SubnetFilter::default(),
            local: LocalInterface::default(),
            dns_cache: DnsAnswerCache::new(),
            listener: None,
            event_counter: 0,
            running: false,
            paused: false,
        }
    }
}

/// The process-wide traffic-processing context.
///
/// Explicitly constructed and passed by reference to its collaborators; its
/// lifetime is bounded by [`start`](Self::start) / [`reset`](Self::reset).
pub struct TrafficEngine {
    state: Mutex<EngineState>,
}

impl Default for TrafficEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
        }
    }

    /// Validates the configuration and arms the engine for a capture run.
    ///
    /// Non-empty invalid subnet strings are configuration errors and the
    /// engine does not start; empty strings select the restrictive
    /// defaults. An unknown interface name is tolerated (the capture
    /// collaborator owns that failure) but leaves the local-interface
    /// classification disabled.
    pub fn start(&self, config: &CaptureConfig) -> anyhow::Result<()> {
        let local = resolve_local_interface(&config.interface);
        self.start_with(config, local)
    }

    /// [`start`](Self::start) for embedders that already know the capture
    /// interface's own addresses.
    pub fn start_with(
        &self,
        config: &CaptureConfig,
        local: LocalInterface,
    ) -> anyhow::Result<()> {
        let v4 = if config.subnet_v4.is_empty() {
            restrictive_default_v4()
        } else {
            subnet::parse_subnet_v4(&config.subnet_v4)
                .with_context(|| format!("invalid IPv4 subnet '{}'", config.subnet_v4))?
        };

        let v6 = if config.subnet_v6.is_empty() {
            default_unique_local_v6()
        } else {
            subnet::parse_subnet_v6(&config.subnet_v6)
                .with_context(|| format!("invalid IPv6 subnet '{}'", config.subnet_v6))?
        };

        let mut state = self.state.lock().unwrap();
        state.filter = SubnetFilter::new(v4, v6);
        state.local = local;
        state.event_counter = 0;
        state.running = true;
        debug!("engine started on '{}'", config.interface);
        Ok(())
    }

    pub fn stop(&self) {
        self.state.lock().unwrap().running = false;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Discards all hosts, statistics, and cached DNS answers and zeroes
    /// the event counter. Must not be called concurrently with live record
    /// processing; stop the capture thread first.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.registry.clear();
        state.dns_cache.clear();
        state.event_counter = 0;
        state.paused = false;
    }

    /// Pause is honored by the capture callback, not enforced here.
    pub fn set_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    /// Registers the single listener; replaces any previous one.
    pub fn set_listener(&self, listener: Box<dyn TrafficListener>) {
        self.state.lock().unwrap().listener = Some(listener);
    }

    pub fn clear_listener(&self) {
        self.state.lock().unwrap().listener = None;
    }

    pub fn event_count(&self) -> u64 {
        self.state.lock().unwrap().event_counter
    }

    /// Read access for consumers (statistics views, host lists), under the
    /// same mutual-exclusion domain as record processing.
    pub fn with_hosts<R>(&self, f: impl FnOnce(&HostRegistry) -> R) -> R {
        let state = self.state.lock().unwrap();
        f(&state.registry)
    }

    /// Processing entry point, invoked synchronously by the capture thread
    /// once per decoded record.
    pub fn handle_event(&self, event: &NetEvent) {
        let mut state = self.state.lock().unwrap();
        trace!("{event}");

        state.discover_hosts(event);
        state.deliver(event);
        state.event_counter += 1;
    }

    /// Inbound DNS-observation callback: the decoder reports every answer it
    /// sees in DNS response traffic.
    pub fn observe_dns_answer(&self, ip: &str, hostname: &str) {
        self.state.lock().unwrap().dns_cache.record(ip, hostname);
    }

    /// Ordinary hostname mutation path; the visualization layer's
    /// reverse-DNS results come back through here.
    ///
    /// Reverse-DNS lookups are asynchronous, so a result may arrive after a
    /// reset has discarded its host. Such stale ids are ignored.
    pub fn set_hostname(&self, id: HostId, hostname: String, from_reverse_dns: bool) {
        let mut state = self.state.lock().unwrap();

        let EngineState {
            registry, listener, ..
        } = &mut *state;
        let Some(host) = registry.try_host_mut(id) else {
            warn!("ignoring hostname '{hostname}' for unknown host id {}", id.index());
            return;
        };
        host.hostname = Some(hostname);
        host.hostname_from_reverse_dns = from_reverse_dns;

        if let Some(listener) = listener {
            listener.on_host_addr_update(registry.host(id));
        }
    }
}

impl EngineState {
    /// Host discovery phase of one record.
    fn discover_hosts(&mut self, event: &NetEvent) {
        // Without recognizable link framing there is nothing to attribute.
        if event.link != Protocol::EthernetII {
            return;
        }

        if event.network == Protocol::Arp {
            let src = self
                .registry
                .track_hw(event.src_hw, &self.filter, self.local.hw_addr);
            self.apply_update(src);
            let dst = self
                .registry
                .track_hw(event.dst_hw, &self.filter, self.local.hw_addr);
            self.apply_update(dst);
            return;
        }

        if event.is_ipv4() {
            let src = self.registry.create_or_update(
                event.src_hw,
                event.src_ipv4.into(),
                &self.filter,
                self.local.hw_addr,
            );
            self.apply_update(src);
            let dst = self.registry.create_or_update(
                event.dst_hw,
                event.dst_ipv4.into(),
                &self.filter,
                self.local.hw_addr,
            );
            self.apply_update(dst);
        } else if event.is_ipv6() {
            let src = self.registry.create_or_update(
                event.src_hw,
                event.src_ipv6.into(),
                &self.filter,
                self.local.hw_addr,
            );
            self.apply_update(src);
            let dst = self.registry.create_or_update(
                event.dst_hw,
                event.dst_ipv6.into(),
                &self.filter,
                self.local.hw_addr,
            );
            self.apply_update(dst);
        }
    }

    /// Completes a registry outcome: DNS backfill plus notifications.
    fn apply_update(&mut self, update: HostUpdate) {
        match update {
            HostUpdate::Unchanged => {}
            HostUpdate::Created(id) => {
                // Hostname backfill happens before the host is announced.
                let hostname = self
                    .dns_cache
                    .lookup_for_host(self.registry.host(id))
                    .map(str::to_owned);
                if let Some(hostname) = hostname {
                    self.registry.host_mut(id).hostname = Some(hostname);
                }

                if let Some(listener) = &mut self.listener {
                    listener.on_new_host(self.registry.host(id));
                }
            }
            HostUpdate::Attached(id) => {
                if let Some(listener) = &mut self.listener {
                    listener.on_host_addr_update(self.registry.host(id));
                }
            }
        }
    }

    /// Delivery phase of one record.
    fn deliver(&mut self, event: &NetEvent) {
        if self.listener.is_none() {
            return;
        }

        let subnet_bcast = Some(self.filter.broadcast_v4());
        let one_to_many = addr::hw_addr_kind(event.dst_hw) == AddrKind::Multicast
            || addr::ipv4_addr_kind(event.dst_ipv4, subnet_bcast) == AddrKind::Multicast
            || addr::ipv6_addr_kind(event.dst_ipv6) == AddrKind::Multicast;

        if one_to_many {
            // One-to-many traffic attributes outbound statistics only; no
            // receiver is ever resolved for it.
            let Some(sender) =
                self.registry
                    .find_by_any(event.src_hw, event.src_ipv4, event.src_ipv6)
            else {
                return;
            };

            self.registry
                .host_mut(sender)
                .stats
                .tally(Direction::Send, event);
            if let Some(listener) = &mut self.listener {
                listener.on_multicast_delivery(self.registry.host(sender), event);
            }
            return;
        }

        let is_arp = event.network == Protocol::Arp;

        let Some(sender) =
            self.resolve_endpoint(is_arp, event.src_hw, event.src_ipv4, event.src_ipv6)
        else {
            trace!("dropping record, unknown sender: {event}");
            return;
        };
        self.registry
            .host_mut(sender)
            .stats
            .tally(Direction::Send, event);

        let Some(receiver) =
            self.resolve_endpoint(is_arp, event.dst_hw, event.dst_ipv4, event.dst_ipv6)
        else {
            trace!("dropping record, unknown receiver: {event}");
            return;
        };
        self.registry
            .host_mut(receiver)
            .stats
            .tally(Direction::Receive, event);

        if let Some(listener) = &mut self.listener {
            listener.on_unicast_delivery(
                self.registry.host(sender),
                self.registry.host(receiver),
                event,
            );
        }
    }

    /// Resolves one side of a unicast record. The hardware address is only
    /// trusted for ARP records and addresses inside the configured subnet.
    fn resolve_endpoint(
        &self,
        is_arp: bool,
        hw: MacAddr,
        ipv4: Ipv4Addr,
        ipv6: Ipv6Addr,
    ) -> Option<HostId> {
        if is_arp || self.filter.contains_v4(ipv4) || self.filter.contains_v6(ipv6) {
            self.registry.find_by_any(hw, ipv4, ipv6)
        } else {
            self.registry.find_by_any(MacAddr::zero(), ipv4, ipv6)
        }
    }
}

/// Looks up the capture interface's own hardware address.
fn resolve_local_interface(name: &str) -> LocalInterface {
    let Some(interface) = datalink::interfaces().into_iter().find(|i| i.name == name) else {
        warn!("capture interface '{name}' not found; local-interface detection disabled");
        return LocalInterface::default();
    };

    LocalInterface {
        hw_addr: interface.mac,
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
