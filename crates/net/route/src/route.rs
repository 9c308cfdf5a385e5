//! Routing table entries.

use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use ipnet::Ipv6Net;
use sasel_addrs::Interface;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Route entry flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RouteFlags: u32 {
        const UP = 1 << 0;
        /// Destination is reached through `gateway`.
        const GATEWAY = 1 << 1;
        /// Host route (destination is a single address).
        const HOST = 1 << 2;
        /// Drop and report unreachable.
        const REJECT = 1 << 3;
        /// Drop silently.
        const BLACKHOLE = 1 << 4;
        /// Neighbor entry with resolved link-layer information.
        const LLINFO = 1 << 5;
        /// Source address may live on another interface.
        const PROXY = 1 << 6;
        /// Host routes are cloned from this route on demand.
        const CLONING = 1 << 7;
        /// Only matched by lookups scoped to the route's interface.
        const IFSCOPE = 1 << 8;
        /// Created by cloning.
        const CLONED = 1 << 9;
    }
}

/// A routing table entry.
#[derive(Debug)]
pub struct Route {
    destination: Ipv6Net,
    gateway: Option<Ipv6Addr>,
    interface: Arc<Interface>,
    flags: RouteFlags,
    valid: AtomicBool,
}

impl Route {
    pub fn new(destination: Ipv6Net, interface: Arc<Interface>, flags: RouteFlags) -> Self {
        let mut flags = flags;
        if destination.prefix_len() == 128 {
            flags |= RouteFlags::HOST;
        }
        Self {
            destination: destination.trunc(),
            gateway: None,
            interface,
            flags,
            valid: AtomicBool::new(true),
        }
    }

    pub fn with_gateway(mut self, gateway: Ipv6Addr) -> Self {
        self.gateway = Some(gateway);
        self.flags |= RouteFlags::GATEWAY;
        self
    }

    pub fn destination(&self) -> &Ipv6Net {
        &self.destination
    }

    pub fn gateway(&self) -> Option<&Ipv6Addr> {
        self.gateway.as_ref()
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    pub fn flags(&self) -> RouteFlags {
        self.flags
    }

    /// Up and still present in the routing table.
    pub fn is_usable(&self) -> bool {
        self.valid.load(Ordering::Acquire) && self.flags.contains(RouteFlags::UP)
    }

    /// Mark the route as removed; cached handles notice on their next check.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// A resolved, directly reachable neighbor entry for `addr`.
    pub fn is_neighbor_of(&self, addr: &Ipv6Addr) -> bool {
        self.is_usable()
            && self.flags.contains(RouteFlags::LLINFO | RouteFlags::HOST)
            && !self.flags.contains(RouteFlags::GATEWAY)
            && self.destination.addr() == *addr
    }

    /// Host route for `destination` derived from this cloning route.
    pub fn clone_for(&self, destination: Ipv6Addr) -> Self {
        Self {
            destination: Ipv6Net::from(destination),
            gateway: self.gateway,
            interface: Arc::clone(&self.interface),
            flags: (self.flags - RouteFlags::CLONING) | RouteFlags::HOST | RouteFlags::CLONED,
            valid: AtomicBool::new(true),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination)?;
        if let Some(gateway) = &self.gateway {
            write!(f, " via {gateway}")?;
        }
        write!(f, " dev {}", self.interface)
    }
}
