//! Per-packet send options.

use std::net::IpAddr;

use sasel_primitives::{InterfaceId, OutputFlags, ScopedAddr};

use crate::RouteCache;

/// Per-packet options supplied by the sender.
#[derive(Debug, Default, Clone)]
pub struct PacketOptions {
    /// Explicit source address (packet info).
    pub source: Option<ScopedAddr>,
    /// Explicit outgoing interface (packet info).
    pub interface: Option<InterfaceId>,
    /// Explicit next hop. Only IPv6 next hops are usable.
    pub next_hop: Option<IpAddr>,
    /// Route cache for `next_hop`, kept apart from the destination's cache.
    pub next_hop_cache: RouteCache,
    /// Restrictions, allowances and address preferences.
    pub flags: OutputFlags,
}

impl PacketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: ScopedAddr) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_interface(mut self, interface: InterfaceId) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn with_next_hop(mut self, next_hop: impl Into<IpAddr>) -> Self {
        self.next_hop = Some(next_hop.into());
        self.next_hop_cache.clear();
        self
    }

    pub fn with_flags(mut self, flags: OutputFlags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Multicast send options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MulticastOptions {
    /// Interface multicast packets leave through.
    pub interface: Option<InterfaceId>,
}
