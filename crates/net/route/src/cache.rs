//! Per-destination route cache.

use std::net::Ipv6Addr;
use std::sync::Arc;

use sasel_addrs::{CandidateAddress, Interface};
use sasel_primitives::{InterfaceId, ScopedAddr};

use crate::{Route, RouteFlags};

/// Outcome of source-interface selection for a cache check.
#[derive(Debug, Clone, Copy)]
pub enum SourceInterface<'a> {
    /// No explicit source, or source-interface selection is off.
    NotSelected,
    /// An explicit source was given but no interface owns it.
    Unowned,
    /// The interface owning the explicit source.
    Owned(&'a Interface),
}

/// Caller-owned cache of the last route lookup.
///
/// Dropping or clearing the cache releases the route and source address
/// it holds.
#[derive(Debug, Default, Clone)]
pub struct RouteCache {
    destination: Option<ScopedAddr>,
    route: Option<Arc<Route>>,
    source: Option<Arc<CandidateAddress>>,
    srcif_selected: bool,
    generation: u64,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cached route may be reused for `destination`.
    ///
    /// The entry must hold a usable route for the same destination, taken
    /// at the current address-table `generation`, and match the requested
    /// `ifscope` the way a fresh lookup would (loopback routes excepted). When
    /// source-interface selection applies, the route must leave through the
    /// interface owning the source; proxy routes and local destinations are
    /// exempt.
    pub fn is_valid(
        &self,
        destination: &ScopedAddr,
        generation: u64,
        ifscope: Option<InterfaceId>,
        srcif: SourceInterface<'_>,
        local_destination: bool,
    ) -> bool {
        let Some(route) = &self.route else {
            return false;
        };
        if !route.is_usable()
            || self.destination.as_ref() != Some(destination)
            || self.generation != generation
        {
            return false;
        }

        let route_if = route.interface().id();
        let in_scope = match ifscope {
            Some(id) => id == route_if || route.interface().is_loopback(),
            None => !route.flags().contains(RouteFlags::IFSCOPE),
        };
        if !in_scope {
            return false;
        }

        let exempt = local_destination || route.flags().contains(RouteFlags::PROXY);
        let srcif_ok = match srcif {
            SourceInterface::NotSelected => true,
            SourceInterface::Unowned => false,
            SourceInterface::Owned(owner) => exempt || owner.id() == route_if,
        };
        let source_ok = !self.srcif_selected
            || exempt
            || self.source.as_ref().is_none_or(|s| s.interface().id() == route_if);
        srcif_ok && source_ok
    }

    /// Whether the entry holds a resolved neighbor route for `next_hop`,
    /// optionally through a given interface.
    pub fn is_valid_next_hop(&self, next_hop: &Ipv6Addr, scope: Option<InterfaceId>) -> bool {
        self.route.as_ref().is_some_and(|route| {
            self.destination.is_some_and(|d| d.addr() == next_hop)
                && route.is_neighbor_of(next_hop)
                && scope.is_none_or(|id| route.interface().id() == id)
        })
    }

    pub fn store(
        &mut self,
        destination: ScopedAddr,
        route: Arc<Route>,
        generation: u64,
        srcif_selected: bool,
    ) {
        self.destination = Some(destination);
        self.route = Some(route);
        self.source = None;
        self.srcif_selected = srcif_selected;
        self.generation = generation;
    }

    /// Swap the cached route, keeping the rest of the entry.
    pub fn replace_route(&mut self, route: Arc<Route>) -> Option<Arc<Route>> {
        self.route.replace(route)
    }

    /// Remember the source address chosen for the cached destination.
    pub fn set_source(&mut self, source: Arc<CandidateAddress>) {
        self.source = Some(source);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn destination(&self) -> Option<&ScopedAddr> {
        self.destination.as_ref()
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn source(&self) -> Option<&Arc<CandidateAddress>> {
        self.source.as_ref()
    }

    pub fn srcif_selected(&self) -> bool {
        self.srcif_selected
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_none()
    }
}
