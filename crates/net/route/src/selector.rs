//! Outgoing interface and route selection.

use std::net::{IpAddr, Ipv6Addr};
use std::sync::Arc;

use sasel_addrs::{AddressTable, CandidateAddress, Interface, InterfaceTable};
use sasel_primitives::{
    InterfaceFlags, InterfaceId, OutputFlags, Result, Scope, ScopedAddr, SelectError,
    check_protocol_enabled, check_restrictions,
};
use tracing::{debug, trace, warn};

use crate::{
    MulticastOptions, PacketOptions, Route, RouteCache, RouteConfig, RouteFlags, RouteMetrics,
    RouteTable, SourceInterface,
};

/// Inputs to [`RouteSelector::select_route`].
#[derive(Debug)]
pub struct RouteQuery<'a> {
    pub destination: ScopedAddr,
    /// Source address the caller intends to use, if already known.
    pub source: Option<ScopedAddr>,
    pub options: Option<&'a mut PacketOptions>,
    pub multicast: Option<&'a MulticastOptions>,
    /// Interface scope hint. Mandatory when the options carry
    /// [`OutputFlags::BOUND_IF`].
    pub scope: Option<InterfaceId>,
    /// Clone a host route out of a cloning network route.
    pub clone: bool,
    /// Succeed with an interface and no route when an interface is known.
    pub allow_no_route: bool,
}

impl<'a> RouteQuery<'a> {
    pub fn new(destination: ScopedAddr) -> Self {
        Self {
            destination,
            source: None,
            options: None,
            multicast: None,
            scope: None,
            clone: false,
            allow_no_route: false,
        }
    }

    pub fn with_source(mut self, source: Option<ScopedAddr>) -> Self {
        self.source = source;
        self
    }

    pub fn with_options(mut self, options: &'a mut PacketOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_multicast(mut self, multicast: Option<&'a MulticastOptions>) -> Self {
        self.multicast = multicast;
        self
    }

    pub fn with_scope(mut self, scope: Option<InterfaceId>) -> Self {
        self.scope = scope;
        self
    }

    pub fn cloning(mut self, clone: bool) -> Self {
        self.clone = clone;
        self
    }

    pub fn allow_no_route(mut self, allow: bool) -> Self {
        self.allow_no_route = allow;
        self
    }
}

/// The interface a packet leaves through and the route that got it there.
#[derive(Debug, Clone)]
pub struct RouteSelection {
    pub interface: Arc<Interface>,
    pub route: Option<Arc<Route>>,
    /// The destination is one of our own addresses.
    pub local_destination: bool,
}

/// Picks the outgoing interface and route for a destination.
pub struct RouteSelector {
    routes: Arc<dyn RouteTable>,
    interfaces: Arc<InterfaceTable>,
    addresses: Arc<AddressTable>,
    config: RouteConfig,
    metrics: RouteMetrics,
}

impl RouteSelector {
    pub fn new(
        routes: Arc<dyn RouteTable>,
        interfaces: Arc<InterfaceTable>,
        addresses: Arc<AddressTable>,
        config: RouteConfig,
    ) -> Self {
        Self {
            routes,
            interfaces,
            addresses,
            config,
            metrics: RouteMetrics::default(),
        }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Resolve the outgoing interface and, when one exists, the route.
    ///
    /// Steps run in a fixed order: destination check, explicit interface,
    /// explicit next hop, source-interface selection, cache validation and
    /// lookup, reject/blackhole handling, then protocol and restriction
    /// checks on the chosen interface. `cache` is left untouched when the
    /// explicit next hop is unusable.
    pub fn select_route(
        &self,
        query: RouteQuery<'_>,
        cache: &mut RouteCache,
    ) -> Result<RouteSelection> {
        let RouteQuery {
            destination: dst,
            source,
            mut options,
            multicast,
            scope,
            clone,
            allow_no_route,
        } = query;

        if dst.is_unspecified() {
            return Err(SelectError::UnspecifiedDestination);
        }

        let output = options.as_deref().map(|o| o.flags).unwrap_or_default();
        let local_destination = self.addresses.owner_of(&dst).is_some();

        // Explicit interface: packet info first, then a mandatory scope hint.
        let pinned = options.as_deref().and_then(|o| o.interface);
        let explicit = pinned.or(scope.filter(|_| output.contains(OutputFlags::BOUND_IF)));
        let explicit = explicit.map(|id| self.usable_interface(id)).transpose()?;
        let mut ifscope = explicit.as_ref().map(|i| i.id()).or(scope);

        if dst.is_multicast()
            && let Some(interface) = self.multicast_interface(&dst, explicit.as_ref(), multicast)?
        {
            trace!(destination = %dst, %interface, "multicast interface selected");
            return self.finish(interface, None, local_destination, output);
        }

        if let Some(opts) = options.as_deref_mut()
            && let Some(next_hop) = opts.next_hop
        {
            let route = self.next_hop_route(next_hop, ifscope, &mut opts.next_hop_cache)?;
            let interface = Arc::clone(route.interface());
            return self.finish(interface, Some(route), local_destination, output);
        }

        // Source-interface selection.
        let srcif_source = source.filter(|s| self.config.select_srcif && !s.is_unspecified());
        let srcif_owner = srcif_source.map(|src| self.source_owner(&src, ifscope));
        let srcif_owner = srcif_owner.map(|owner| owner.map(|a| Arc::clone(a.interface())));
        if let Some(Some(owner)) = &srcif_owner {
            // a proxied owner may sit outside the requested scope
            ifscope = Some(owner.id());
        }
        if srcif_owner.is_some() && ifscope.is_none() {
            ifscope = match cache.route() {
                Some(route) if route.is_usable() => Some(route.interface().id()),
                Some(_) => self.interfaces.primary().map(|i| i.id()),
                None => None,
            };
        }
        let srcif = match &srcif_owner {
            None => SourceInterface::NotSelected,
            Some(None) => SourceInterface::Unowned,
            Some(Some(owner)) => SourceInterface::Owned(owner),
        };

        // Cache validation and lookup.
        let generation = self.addresses.generation();
        if cache.is_valid(&dst, generation, ifscope, srcif, local_destination) {
            self.metrics.inc_cache_hits();
            trace!(destination = %dst, "route cache hit");
        } else {
            self.metrics.inc_cache_misses();
            cache.clear();
            if let Some(route) = self.routes.lookup_route(dst.addr(), ifscope) {
                trace!(destination = %dst, %route, ?ifscope, "route cache filled");
                cache.store(dst, route, generation, srcif_owner.is_some());
            }
        }

        if clone {
            self.clone_route(dst.addr(), cache);
        }

        let Some(route) = cache.route().cloned() else {
            return match explicit {
                Some(interface) if allow_no_route => {
                    self.finish(interface, None, local_destination, output)
                }
                _ => {
                    debug!(destination = %dst, ?ifscope, "no route to destination");
                    Err(SelectError::HostUnreachable)
                }
            };
        };

        let flags = route.flags();
        if flags.intersects(RouteFlags::REJECT | RouteFlags::BLACKHOLE) {
            debug!(destination = %dst, %route, "destination is rejected");
            return Err(if flags.contains(RouteFlags::REJECT | RouteFlags::HOST) {
                SelectError::HostUnreachable
            } else {
                SelectError::NetworkUnreachable
            });
        }

        let interface = Arc::clone(route.interface());
        // Packets to ourselves leave through loopback whatever was pinned.
        if let Some(pinned) = pinned
            && interface.id() != pinned
            && !interface.is_loopback()
        {
            debug!(
                destination = %dst,
                %interface,
                %pinned,
                "route conflicts with pinned interface"
            );
            return Err(SelectError::HostUnreachable);
        }

        self.finish(interface, Some(route), local_destination, output)
    }

    /// Protocol and restriction checks shared by every successful path.
    fn finish(
        &self,
        interface: Arc<Interface>,
        route: Option<Arc<Route>>,
        local_destination: bool,
        output: OutputFlags,
    ) -> Result<RouteSelection> {
        check_protocol_enabled(interface.id(), interface.flags())?;
        if let Err(restriction) = check_restrictions(interface.flags(), output) {
            debug!(%interface, %restriction, "interface is restricted");
            return Err(SelectError::Restricted {
                interface: interface.id(),
                restriction,
            });
        }
        Ok(RouteSelection {
            interface,
            route,
            local_destination,
        })
    }

    /// An explicitly requested interface must exist and be up.
    fn usable_interface(&self, id: InterfaceId) -> Result<Arc<Interface>> {
        let interface = self.interfaces.get(id).ok_or(SelectError::NoSuchInterface(id))?;
        if !interface.is_up() {
            return Err(SelectError::NetworkDown(id));
        }
        Ok(interface)
    }

    /// Interface for a multicast destination when no route lookup is needed.
    fn multicast_interface(
        &self,
        dst: &ScopedAddr,
        explicit: Option<&Arc<Interface>>,
        multicast: Option<&MulticastOptions>,
    ) -> Result<Option<Arc<Interface>>> {
        if let Some(interface) = explicit {
            return Ok(Some(Arc::clone(interface)));
        }
        if let Some(id) = multicast.and_then(|m| m.interface) {
            return self.usable_interface(id).map(Some);
        }
        if dst.scope() <= Scope::LINK_LOCAL && dst.zone() != 0 {
            let interface = self
                .interfaces
                .all()
                .into_iter()
                .find(|i| i.zones().zone(dst.scope()) == dst.zone());
            return Ok(interface);
        }
        Ok(None)
    }

    /// Resolve an explicit next hop to its neighbor route.
    fn next_hop_route(
        &self,
        next_hop: IpAddr,
        ifscope: Option<InterfaceId>,
        cache: &mut RouteCache,
    ) -> Result<Arc<Route>> {
        let IpAddr::V6(next_hop) = next_hop else {
            return Err(SelectError::AddressFamilyNotSupported);
        };

        if cache.is_valid_next_hop(&next_hop, ifscope)
            && let Some(route) = cache.route()
        {
            trace!(%next_hop, "next hop cache hit");
            return Ok(Arc::clone(route));
        }
        cache.clear();

        let route = self
            .routes
            .lookup_route(&next_hop, ifscope)
            .filter(|route| route.is_neighbor_of(&next_hop))
            .ok_or_else(|| {
                debug!(%next_hop, ?ifscope, "next hop is not a resolved neighbor");
                SelectError::HostUnreachable
            })?;

        let zone = route.interface().zone_for(&next_hop).unwrap_or(0);
        cache.store(ScopedAddr::new(next_hop, zone), Arc::clone(&route), 0, false);
        Ok(route)
    }

    /// The local address matching an explicit source, within `ifscope` when
    /// one is set. Falls back to a proxied interface when forwarding with
    /// ND proxy is enabled.
    fn source_owner(
        &self,
        src: &ScopedAddr,
        ifscope: Option<InterfaceId>,
    ) -> Option<Arc<CandidateAddress>> {
        let owner = match ifscope {
            Some(id) => self.addresses.find_on(src.addr(), id),
            None => self.addresses.find(src),
        };
        if owner.is_some() || !self.config.proxy_forwarding {
            return owner;
        }

        let proxied = self
            .addresses
            .find(src)
            .filter(|a| a.interface().flags().contains(InterfaceFlags::ND_PROXY));
        if let Some(address) = &proxied {
            debug!(
                source = %src,
                interface = %address.interface(),
                "using proxied source interface"
            );
        }
        proxied
    }

    fn clone_route(&self, dst: &Ipv6Addr, cache: &mut RouteCache) {
        let Some(route) = cache.route() else {
            return;
        };
        let flags = route.flags();
        if !flags.contains(RouteFlags::CLONING) || flags.contains(RouteFlags::HOST) {
            return;
        }

        let host = self.routes.insert_route(route.clone_for(*dst));
        if !host.flags().contains(RouteFlags::HOST) {
            warn!(route = %host, "cloned route is not a host route");
            return;
        }
        self.metrics.inc_clones();
        debug!(route = %host, "host route cloned");
        cache.replace_route(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticRouteTable;
    use assert_matches::assert_matches;
    use sasel_primitives::Restriction;

    struct Host {
        interfaces: Arc<InterfaceTable>,
        addresses: Arc<AddressTable>,
        routes: Arc<StaticRouteTable>,
        en1: Arc<Interface>,
        en2: Arc<Interface>,
    }

    impl Host {
        fn new() -> Self {
            let interfaces = Arc::new(InterfaceTable::new());
            let addresses = Arc::new(AddressTable::new());
            let routes = Arc::new(StaticRouteTable::new());
            interfaces
                .insert(Interface::new(
                    InterfaceId::new(1),
                    "lo0",
                    InterfaceFlags::UP | InterfaceFlags::LOOPBACK,
                ))
                .unwrap();
            let en1 = interfaces
                .insert(Interface::new(InterfaceId::new(4), "en0", InterfaceFlags::UP))
                .unwrap();
            let en2 = interfaces
                .insert(Interface::new(
                    InterfaceId::new(5),
                    "pdp_ip0",
                    InterfaceFlags::UP | InterfaceFlags::CELLULAR | InterfaceFlags::EXPENSIVE,
                ))
                .unwrap();
            for (ifp, addr) in [(&en1, "2001:db8:1::10"), (&en2, "2001:db8:2::10")] {
                let candidate =
                    CandidateAddress::new(Arc::clone(ifp), addr.parse().unwrap(), 64).unwrap();
                addresses.insert(candidate).unwrap();
            }
            routes.insert_route(
                Route::new("::/0".parse().unwrap(), Arc::clone(&en1), RouteFlags::UP)
                    .with_gateway("fe80::1".parse().unwrap()),
            );
            routes.insert_route(
                Route::new(
                    "::/0".parse().unwrap(),
                    Arc::clone(&en2),
                    RouteFlags::UP | RouteFlags::IFSCOPE,
                )
                .with_gateway("fe80::2".parse().unwrap()),
            );
            Self {
                interfaces,
                addresses,
                routes,
                en1,
                en2,
            }
        }

        fn selector(&self, config: RouteConfig) -> RouteSelector {
            RouteSelector::new(
                Arc::clone(&self.routes) as Arc<dyn RouteTable>,
                Arc::clone(&self.interfaces),
                Arc::clone(&self.addresses),
                config,
            )
        }
    }

    fn dst(s: &str) -> ScopedAddr {
        ScopedAddr::unzoned(s.parse().unwrap())
    }

    #[test]
    fn test_unspecified_destination() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        assert_matches!(
            selector.select_route(RouteQuery::new(dst("::")), &mut cache),
            Err(SelectError::UnspecifiedDestination)
        );
    }

    #[test]
    fn test_default_route_and_cache() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();

        let first = selector
            .select_route(RouteQuery::new(dst("2001:db8:99::1")), &mut cache)
            .unwrap();
        assert_eq!(first.interface.id(), host.en1.id());
        assert!(!first.local_destination);
        let cached = Arc::clone(cache.route().unwrap());

        let second = selector
            .select_route(RouteQuery::new(dst("2001:db8:99::1")), &mut cache)
            .unwrap();
        assert!(Arc::ptr_eq(second.route.as_ref().unwrap(), &cached));
    }

    #[test]
    fn test_scope_hint_selects_scoped_route() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let query = RouteQuery::new(dst("2001:db8:99::1")).with_scope(Some(host.en2.id()));
        let selection = selector.select_route(query, &mut cache).unwrap();
        assert_eq!(selection.interface.id(), host.en2.id());
    }

    #[test]
    fn test_warm_cache_honors_requested_scope() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let to = dst("2001:db8:99::1");

        let unscoped = selector.select_route(RouteQuery::new(to), &mut cache).unwrap();
        assert_eq!(unscoped.interface.id(), host.en1.id());

        let mut options = PacketOptions::new().with_flags(OutputFlags::BOUND_IF);
        let query = RouteQuery::new(to)
            .with_options(&mut options)
            .with_scope(Some(host.en2.id()));
        let bound = selector.select_route(query, &mut cache).unwrap();
        assert_eq!(bound.interface.id(), host.en2.id());

        selector.select_route(RouteQuery::new(to), &mut cache).unwrap();
        let mut options = PacketOptions::new().with_interface(host.en2.id());
        let pinned = selector
            .select_route(RouteQuery::new(to).with_options(&mut options), &mut cache)
            .unwrap();
        assert_eq!(pinned.interface.id(), host.en2.id());
        assert_eq!(cache.route().unwrap().interface().id(), host.en2.id());
    }

    #[test]
    fn test_explicit_interface_must_exist_and_be_up() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();

        let mut options = PacketOptions::new().with_interface(InterfaceId::new(42));
        let query = RouteQuery::new(dst("2001:db8::1")).with_options(&mut options);
        assert_matches!(
            selector.select_route(query, &mut cache),
            Err(SelectError::NoSuchInterface(id)) if id == InterfaceId::new(42)
        );

        host.en1.remove_flags(InterfaceFlags::UP);
        let mut options = PacketOptions::new().with_interface(host.en1.id());
        let query = RouteQuery::new(dst("2001:db8::1")).with_options(&mut options);
        assert_matches!(
            selector.select_route(query, &mut cache),
            Err(SelectError::NetworkDown(_))
        );
    }

    #[test]
    fn test_multicast_with_interface_skips_lookup() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let multicast = MulticastOptions {
            interface: Some(host.en2.id()),
        };
        let query = RouteQuery::new(dst("ff02::1")).with_multicast(Some(&multicast));
        let selection = selector.select_route(query, &mut cache).unwrap();
        assert_eq!(selection.interface.id(), host.en2.id());
        assert!(selection.route.is_none());
        assert!(cache.is_empty());

        let zoned = ScopedAddr::new("ff02::fb".parse().unwrap(), host.en1.id().get());
        let selection = selector.select_route(RouteQuery::new(zoned), &mut cache).unwrap();
        assert_eq!(selection.interface.id(), host.en1.id());
    }

    #[test]
    fn test_next_hop_must_be_resolved_neighbor() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        selector
            .select_route(RouteQuery::new(dst("2001:db8:99::1")), &mut cache)
            .unwrap();
        let before = Arc::clone(cache.route().unwrap());

        let mut options =
            PacketOptions::new().with_next_hop("fe80::99".parse::<Ipv6Addr>().unwrap());
        assert_matches!(
            selector.select_route(
                RouteQuery::new(dst("2001:db8:99::1")).with_options(&mut options),
                &mut cache
            ),
            Err(SelectError::HostUnreachable)
        );
        assert!(Arc::ptr_eq(cache.route().unwrap(), &before));

        let next_hop: Ipv6Addr = "fe80::1".parse().unwrap();
        host.routes.insert_route(Route::new(
            ipnet::Ipv6Net::from(next_hop),
            Arc::clone(&host.en1),
            RouteFlags::UP | RouteFlags::LLINFO,
        ));
        let mut options = PacketOptions::new().with_next_hop(next_hop);
        let query = RouteQuery::new(dst("2001:db8:99::1")).with_options(&mut options);
        let selection = selector.select_route(query, &mut cache).unwrap();
        assert!(selection.route.unwrap().is_neighbor_of(&next_hop));
        assert!(options.next_hop_cache.is_valid_next_hop(&next_hop, None));
    }

    #[test]
    fn test_ipv4_next_hop() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let mut options = PacketOptions::new().with_next_hop(std::net::Ipv4Addr::new(192, 0, 2, 1));
        let query = RouteQuery::new(dst("2001:db8::1")).with_options(&mut options);
        assert_matches!(
            selector.select_route(query, &mut cache),
            Err(SelectError::AddressFamilyNotSupported)
        );
    }

    #[test]
    fn test_source_interface_selection() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let selection = selector
            .select_route(
                RouteQuery::new(dst("2001:db8:99::1")).with_source(Some(dst("2001:db8:2::10"))),
                &mut cache,
            )
            .unwrap();
        assert_eq!(selection.interface.id(), host.en2.id());

        // without srcif selection the unscoped default wins
        let selector = host.selector(RouteConfig {
            select_srcif: false,
            ..Default::default()
        });
        let mut cache = RouteCache::new();
        let selection = selector
            .select_route(
                RouteQuery::new(dst("2001:db8:99::1")).with_source(Some(dst("2001:db8:2::10"))),
                &mut cache,
            )
            .unwrap();
        assert_eq!(selection.interface.id(), host.en1.id());
    }

    #[test]
    fn test_proxied_source() {
        let host = Host::new();
        let proxy = host
            .interfaces
            .insert(Interface::new(
                InterfaceId::new(6),
                "bridge0",
                InterfaceFlags::UP | InterfaceFlags::ND_PROXY,
            ))
            .unwrap();
        let proxied = "2001:db8:6::1".parse().unwrap();
        let proxied = CandidateAddress::new(Arc::clone(&proxy), proxied, 64).unwrap();
        host.addresses.insert(proxied).unwrap();
        let query = || {
            RouteQuery::new(dst("2001:db8:99::1"))
                .with_source(Some(dst("2001:db8:6::1")))
                .with_scope(Some(host.en1.id()))
        };

        host.routes.insert_route(
            Route::new(
                "::/0".parse().unwrap(),
                Arc::clone(&proxy),
                RouteFlags::UP | RouteFlags::IFSCOPE,
            )
            .with_gateway("fe80::6".parse().unwrap()),
        );

        let strict = host.selector(RouteConfig::default());
        let selection = strict.select_route(query(), &mut RouteCache::new()).unwrap();
        assert_eq!(selection.interface.id(), host.en1.id());

        let proxying = host.selector(RouteConfig {
            proxy_forwarding: true,
            ..Default::default()
        });
        let mut cache = RouteCache::new();
        let selection = proxying.select_route(query(), &mut cache).unwrap();
        assert_eq!(selection.interface.id(), proxy.id());
        assert!(cache.srcif_selected());
    }

    #[test]
    fn test_reject_and_blackhole() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        host.routes.insert_route(Route::new(
            "2001:db8:dead::/48".parse().unwrap(),
            Arc::clone(&host.en1),
            RouteFlags::UP | RouteFlags::REJECT,
        ));
        host.routes.insert_route(Route::new(
            "2001:db8:beef::1/128".parse().unwrap(),
            Arc::clone(&host.en1),
            RouteFlags::UP | RouteFlags::REJECT,
        ));
        host.routes.insert_route(Route::new(
            "2001:db8:b1ac::/48".parse().unwrap(),
            Arc::clone(&host.en1),
            RouteFlags::UP | RouteFlags::BLACKHOLE,
        ));

        let mut cache = RouteCache::new();
        assert_matches!(
            selector.select_route(RouteQuery::new(dst("2001:db8:dead::1")), &mut cache),
            Err(SelectError::NetworkUnreachable)
        );
        assert_matches!(
            selector.select_route(RouteQuery::new(dst("2001:db8:beef::1")), &mut cache),
            Err(SelectError::HostUnreachable)
        );
        assert_matches!(
            selector.select_route(RouteQuery::new(dst("2001:db8:b1ac::1")), &mut cache),
            Err(SelectError::NetworkUnreachable)
        );
    }

    #[test]
    fn test_restrictions_and_protocol() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();

        let mut options = PacketOptions::new().with_flags(OutputFlags::NO_CELLULAR);
        let query = RouteQuery::new(dst("2001:db8:99::1"))
            .with_options(&mut options)
            .with_scope(Some(host.en2.id()));
        assert_matches!(
            selector.select_route(query, &mut cache),
            Err(SelectError::Restricted { restriction: Restriction::Cellular, .. })
        );

        host.en1.insert_flags(InterfaceFlags::IPV6_DISABLED);
        assert_matches!(
            selector.select_route(RouteQuery::new(dst("2001:db8:99::1")), &mut RouteCache::new()),
            Err(SelectError::NetworkDown(id)) if id == host.en1.id()
        );
    }

    #[test]
    fn test_no_route() {
        let host = Host::new();
        host.routes.remove_route(&"::/0".parse().unwrap(), host.en1.id());
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();

        assert_matches!(
            selector.select_route(RouteQuery::new(dst("2001:db8:99::1")), &mut cache),
            Err(SelectError::HostUnreachable)
        );

        let mut options = PacketOptions::new().with_interface(host.en1.id());
        let query = RouteQuery::new(dst("2001:db8:99::1"))
            .with_options(&mut options)
            .allow_no_route(true);
        let selection = selector.select_route(query, &mut cache).unwrap();
        assert_eq!(selection.interface.id(), host.en1.id());
        assert!(selection.route.is_none());
    }

    #[test]
    fn test_clone_route() {
        let host = Host::new();
        let cloning = host.routes.insert_route(Route::new(
            "2001:db8:1::/64".parse().unwrap(),
            Arc::clone(&host.en1),
            RouteFlags::UP | RouteFlags::CLONING,
        ));
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let selection = selector
            .select_route(RouteQuery::new(dst("2001:db8:1::77")).cloning(true), &mut cache)
            .unwrap();
        let route = selection.route.unwrap();
        assert!(route.flags().contains(RouteFlags::HOST | RouteFlags::CLONED));
        assert_eq!(route.destination().to_string(), "2001:db8:1::77/128");
        assert!(!Arc::ptr_eq(&route, &cloning));
        assert_eq!(host.routes.len(), 4);
    }

    #[test]
    fn test_local_destination() {
        let host = Host::new();
        let selector = host.selector(RouteConfig::default());
        let mut cache = RouteCache::new();
        let selection = selector
            .select_route(RouteQuery::new(dst("2001:db8:2::10")), &mut cache)
            .unwrap();
        assert!(selection.local_destination);
    }
}
