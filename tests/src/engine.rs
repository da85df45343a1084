//! End-to-end engine scenarios driven through the public API with
//! synthetic decoded records, the way the capture collaborator would.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use pnet::util::MacAddr;

use lantern_common::config::CaptureConfig;
use lantern_common::network::event::{NetEvent, Protocol};
use lantern_core::engine::{LocalInterface, TrafficEngine};
use lantern_core::host::{Host, NetArea};
use lantern_core::listener::TrafficListener;
use lantern_core::stats::IpVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Note {
    NewHost(String),
    Unicast(String, String),
    Multicast(String),
    AddrUpdate(String),
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Note>>>);

impl Recorder {
    fn notes(&self) -> Vec<Note> {
        self.0.lock().unwrap().clone()
    }
}

impl TrafficListener for Recorder {
    fn on_new_host(&mut self, host: &Host) {
        self.0
            .lock()
            .unwrap()
            .push(Note::NewHost(host.preferred_label()));
    }

    fn on_unicast_delivery(&mut self, sender: &Host, receiver: &Host, _event: &NetEvent) {
        self.0.lock().unwrap().push(Note::Unicast(
            sender.preferred_label(),
            receiver.preferred_label(),
        ));
    }

    fn on_multicast_delivery(&mut self, sender: &Host, _event: &NetEvent) {
        self.0
            .lock()
            .unwrap()
            .push(Note::Multicast(sender.preferred_label()));
    }

    fn on_host_addr_update(&mut self, host: &Host) {
        self.0
            .lock()
            .unwrap()
            .push(Note::AddrUpdate(host.preferred_label()));
    }
}

const HOST_MAC: MacAddr = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x01);
const GATEWAY_MAC: MacAddr = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xfe);

fn started_engine() -> (TrafficEngine, Recorder) {
    let config = CaptureConfig {
        interface: "test0".into(),
        promiscuous: true,
        subnet_v4: "192.168.1.0/24".into(),
        subnet_v6: "fd00::/8".into(),
    };

    let engine = TrafficEngine::new();
    engine
        .start_with(&config, LocalInterface::default())
        .expect("engine should start");

    let recorder = Recorder::default();
    engine.set_listener(Box::new(recorder.clone()));
    (engine, recorder)
}

fn arp_request(src: MacAddr) -> NetEvent {
    let mut event = NetEvent::new(60);
    event.link = Protocol::EthernetII;
    event.network = Protocol::Arp;
    event.src_hw = src;
    event.dst_hw = MacAddr::broadcast();
    event
}

fn tcp_v4(
    src_hw: MacAddr,
    dst_hw: MacAddr,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    size: u64,
) -> NetEvent {
    let mut event = NetEvent::new(size);
    event.link = Protocol::EthernetII;
    event.network = Protocol::Ipv4;
    event.transport = Protocol::Tcp;
    event.src_hw = src_hw;
    event.dst_hw = dst_hw;
    event.src_ipv4 = src_ip;
    event.dst_ipv4 = dst_ip;
    event
}

/// The reference scenario: an ARP sighting establishes a hardware-only
/// host, then a TCP connection to an external address attaches the local
/// IP and discovers the external endpoint.
#[test]
fn arp_then_external_tcp() {
    let (engine, recorder) = started_engine();

    let lan_ip = Ipv4Addr::new(192, 168, 1, 42);
    let external_ip = Ipv4Addr::new(8, 8, 8, 8);

    // Step 1: ARP request from a fresh endpoint.
    engine.handle_event(&arp_request(HOST_MAC));

    // The broadcast request itself already counts as outbound traffic.
    assert_eq!(
        recorder.notes(),
        vec![
            Note::NewHost(HOST_MAC.to_string()),
            Note::Multicast(HOST_MAC.to_string()),
        ]
    );
    engine.with_hosts(|reg| {
        assert_eq!(reg.len(), 1);
        let id = reg.find_by_hw(HOST_MAC).unwrap();
        assert_eq!(reg.host(id).area, NetArea::Subnet);
    });

    // Step 2: TCP from that endpoint to an external address.
    engine.handle_event(&tcp_v4(HOST_MAC, GATEWAY_MAC, lan_ip, external_ip, 100));

    let notes = recorder.notes();
    assert_eq!(
        &notes[2..],
        &[
            Note::AddrUpdate(lan_ip.to_string()),
            Note::NewHost(external_ip.to_string()),
            Note::Unicast(lan_ip.to_string(), external_ip.to_string()),
        ]
    );

    engine.with_hosts(|reg| {
        assert_eq!(reg.len(), 2);

        // The LAN host gained the IP instead of spawning a duplicate.
        let sender = reg.host(reg.find_by_ipv4(lan_ip).unwrap());
        assert_eq!(sender.hw_addr, HOST_MAC);
        assert_eq!(sender.ipv4_addrs(), &[lan_ip]);

        let tcp = sender.stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!((tcp.packets_sent, tcp.bytes_sent), (1, 100));
        let arp = sender.stats.get(IpVersion::V4, Protocol::Arp).unwrap();
        assert_eq!((arp.packets_sent, arp.bytes_sent), (1, 60));
        // The all-protocol bucket covers both the ARP request and the
        // TCP segment.
        let total = sender.stats.get(IpVersion::All, Protocol::EthernetII).unwrap();
        assert_eq!((total.packets_sent, total.bytes_sent), (2, 160));

        // The external endpoint is IP-only and outside the subnet.
        let receiver = reg.host(reg.find_by_ipv4(external_ip).unwrap());
        assert_eq!(receiver.area, NetArea::OutsideSubnet);
        assert_eq!(receiver.hw_addr, MacAddr::zero());

        let tcp = receiver.stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!((tcp.packets_received, tcp.bytes_received), (1, 100));
        assert_eq!(tcp.packets_sent, 0);
    });

    assert_eq!(engine.event_count(), 2);
}

/// Repeated traffic between two LAN endpoints accumulates additively and
/// never duplicates hosts.
#[test]
fn counters_accumulate_across_records() {
    let (engine, _recorder) = started_engine();

    let a_hw = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x0a);
    let b_hw = MacAddr(0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x0b);
    let a_ip = Ipv4Addr::new(192, 168, 1, 10);
    let b_ip = Ipv4Addr::new(192, 168, 1, 11);

    for _ in 0..5 {
        engine.handle_event(&tcp_v4(a_hw, b_hw, a_ip, b_ip, 150));
    }

    engine.with_hosts(|reg| {
        assert_eq!(reg.len(), 2);

        let a = reg.host(reg.find_by_ipv4(a_ip).unwrap());
        let tcp = a.stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!((tcp.packets_sent, tcp.bytes_sent), (5, 750));

        let b = reg.host(reg.find_by_ipv4(b_ip).unwrap());
        let tcp = b.stats.get(IpVersion::V4, Protocol::Tcp).unwrap();
        assert_eq!((tcp.packets_received, tcp.bytes_received), (5, 750));
    });

    assert_eq!(engine.event_count(), 5);
}

/// Records whose endpoints cannot be attributed are dropped silently but
/// still counted.
#[test]
fn unattributable_records_are_dropped() {
    let (engine, recorder) = started_engine();

    // No recognizable link framing at all.
    engine.handle_event(&NetEvent::new(42));

    // Ethernet with an unhandled payload: unicast destination, but neither
    // side carries an address the registry could know.
    let mut event = NetEvent::new(64);
    event.link = Protocol::EthernetII;
    event.network = Protocol::OtherLink;
    event.src_hw = HOST_MAC;
    event.dst_hw = GATEWAY_MAC;
    engine.handle_event(&event);

    assert!(recorder.notes().is_empty());
    assert_eq!(engine.event_count(), 2);
    engine.with_hosts(|reg| assert!(reg.is_empty()));
}

/// The capturing machine itself is classified as the local interface.
#[test]
fn local_interface_area() {
    let config = CaptureConfig {
        interface: "test0".into(),
        promiscuous: false,
        subnet_v4: "192.168.1.0/24".into(),
        subnet_v6: String::new(),
    };

    let engine = TrafficEngine::new();
    let local = LocalInterface {
        hw_addr: Some(HOST_MAC),
    };
    engine.start_with(&config, local).unwrap();

    engine.handle_event(&arp_request(HOST_MAC));

    engine.with_hosts(|reg| {
        let id = reg.find_by_hw(HOST_MAC).unwrap();
        assert_eq!(reg.host(id).area, NetArea::LocalInterface);
    });
}
