//! Listener interface toward the visualization/UI collaborator.

use lantern_common::network::event::NetEvent;

use crate::host::Host;

/// Consumes discovery and delivery notifications from the engine.
///
/// Exactly one listener is supported at a time. Callbacks run on the capture
/// thread while the engine holds its state lock, so they must not call back
/// into the engine and should return quickly.
pub trait TrafficListener: Send {
    fn on_new_host(&mut self, host: &Host);

    fn on_unicast_delivery(&mut self, sender: &Host, receiver: &Host, event: &NetEvent);

    /// Multicast/broadcast traffic carries no receiver attribution: only the
    /// sender's outbound counters are updated.
    fn on_multicast_delivery(&mut self, sender: &Host, event: &NetEvent);

    /// Fired when an existing host gains an address or its hostname changes.
    fn on_host_addr_update(&mut self, host: &Host);
}
