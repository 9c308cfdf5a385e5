//! The public selection entry points.

use std::sync::Arc;

use sasel_addrs::{AddressTable, CandidateAddress, Interface, InterfaceTable};
use sasel_policy::PolicyTable;
use sasel_primitives::{
    AddressFlags, InterfaceId, OutputFlags, Result, ScopedAddr, SelectError, SourceHints,
    check_protocol_enabled, check_restrictions,
};
use sasel_route::{
    MulticastOptions, PacketOptions, RouteCache, RouteQuery, RouteSelection, RouteSelector,
    RouteTable, RouterTable,
};
use sasel_scorer::{CandidateScorer, Rule, ScoredSource, SourceQuery};
use serde::Serialize;
use tracing::{debug, trace};

use crate::{SelectMetrics, SelectionConfig};

/// The host state selection reads.
#[derive(Clone)]
pub struct Tables {
    pub policy: Arc<PolicyTable>,
    pub interfaces: Arc<InterfaceTable>,
    pub addresses: Arc<AddressTable>,
    pub routes: Arc<dyn RouteTable>,
    pub routers: Arc<dyn RouterTable>,
}

/// How [`SourceSelector::select_source`] arrived at its answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionPath {
    /// The packet options named the source.
    Explicit,
    /// The socket was already bound.
    Bound,
    /// Ranked by the scorer.
    Scored,
}

/// A source address and the interface it goes out on.
#[derive(Debug, Clone)]
pub struct SourceSelection {
    pub address: ScopedAddr,
    /// Outgoing interface. A bound address that no interface owns has none.
    pub interface: Option<Arc<Interface>>,
    /// The configured address backing `address`, unless it came from a bind.
    pub candidate: Option<Arc<CandidateAddress>>,
    /// Deciding rule, for scored selections.
    pub rule: Option<Rule>,
    pub path: SelectionPath,
}

/// Answers "which source, which interface, which route" for a send.
pub struct SourceSelector {
    tables: Tables,
    routes: RouteSelector,
    scorer: CandidateScorer,
    config: SelectionConfig,
    metrics: SelectMetrics,
}

impl SourceSelector {
    pub fn new(tables: Tables, config: SelectionConfig) -> Self {
        let routes = RouteSelector::new(
            Arc::clone(&tables.routes),
            Arc::clone(&tables.interfaces),
            Arc::clone(&tables.addresses),
            config.route,
        );
        let scorer = CandidateScorer::new(
            Arc::clone(&tables.policy),
            Arc::clone(&tables.addresses),
            Arc::clone(&tables.interfaces),
            Arc::clone(&tables.routers),
            config.scorer,
        );
        Self {
            tables,
            routes,
            scorer,
            config,
            metrics: SelectMetrics::default(),
        }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.tables.policy
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Pick the source address and outgoing interface for a send to `dst`.
    ///
    /// An explicit source in `options` is validated and returned without
    /// ranking. A `bound` address is returned as is. Otherwise the route
    /// is resolved first (filling `cache`) and the scorer ranks the
    /// candidates against the interface it leaves through.
    pub fn select_source(
        &self,
        dst: ScopedAddr,
        options: &mut PacketOptions,
        bound: Option<ScopedAddr>,
        scope: Option<InterfaceId>,
        cache: &mut RouteCache,
    ) -> Result<SourceSelection> {
        self.source(dst, options, bound, scope, cache)
            .inspect(|selection| self.metrics.record_source(selection.path))
            .inspect_err(|err| self.metrics.record_failure(err))
    }

    /// Rank the candidates for `dst`, optionally against an outgoing
    /// interface, without touching routes.
    pub fn select_source_core(
        &self,
        dst: ScopedAddr,
        hints: SourceHints,
        interface: Option<&Arc<Interface>>,
        debug: bool,
    ) -> Result<ScoredSource> {
        let query = SourceQuery::new(dst)
            .with_hints(hints)
            .with_interface(interface)
            .with_debug(debug);
        self.scorer
            .select(&query)
            .inspect_err(|err| self.metrics.record_failure(err))
    }

    pub fn select_route(
        &self,
        query: RouteQuery<'_>,
        cache: &mut RouteCache,
    ) -> Result<RouteSelection> {
        self.routes
            .select_route(query, cache)
            .inspect_err(|err| self.metrics.record_failure(err))
    }

    /// The interface a send to `dst` leaves through. Uses a throwaway cache.
    pub fn select_interface(
        &self,
        dst: ScopedAddr,
        options: Option<&mut PacketOptions>,
        multicast: Option<&MulticastOptions>,
    ) -> Result<Arc<Interface>> {
        let mut query = RouteQuery::new(dst).with_multicast(multicast);
        if let Some(options) = options {
            query = query.with_options(options);
        }
        let mut cache = RouteCache::new();
        self.select_route(query, &mut cache)
            .map(|selection| selection.interface)
    }

    fn source(
        &self,
        dst: ScopedAddr,
        options: &mut PacketOptions,
        bound: Option<ScopedAddr>,
        scope: Option<InterfaceId>,
        cache: &mut RouteCache,
    ) -> Result<SourceSelection> {
        if dst.is_unspecified() {
            return Err(SelectError::UnspecifiedDestination);
        }
        let output = options.flags;

        if let Some(source) = options.source.filter(|s| !s.is_unspecified()) {
            return self.explicit_source(&dst, &source, output);
        }

        if let Some(bound) = bound.filter(|b| !b.is_unspecified()) {
            trace!(destination = %dst, source = %bound, "using bound address");
            return Ok(SourceSelection {
                interface: self.tables.addresses.owner_of(&bound),
                address: bound,
                candidate: None,
                rule: None,
                path: SelectionPath::Bound,
            });
        }

        let query = RouteQuery::new(dst)
            .with_options(options)
            .with_scope(scope)
            .allow_no_route(true);
        let RouteSelection {
            interface,
            route,
            ..
        } = self.routes.select_route(query, cache)?;

        let query = SourceQuery::new(dst)
            .with_hints(SourceHints::from(output))
            .with_interface(Some(&interface))
            .with_route(route.as_deref());
        let scored = self.scorer.select(&query)?;
        // The egress interface is checked, not the one owning the source.
        usable(&interface, output)?;

        debug!(
            destination = %dst,
            source = %scored.address,
            %interface,
            rule = %scored.rule,
            "source address selected"
        );
        cache.set_source(Arc::clone(&scored.address));
        Ok(SourceSelection {
            address: scored.address.scoped(),
            interface: Some(interface),
            candidate: Some(scored.address),
            rule: Some(scored.rule),
            path: SelectionPath::Scored,
        })
    }

    /// An explicit source must be one of ours, usable, and in the
    /// destination's zone.
    fn explicit_source(
        &self,
        dst: &ScopedAddr,
        source: &ScopedAddr,
        output: OutputFlags,
    ) -> Result<SourceSelection> {
        let Some(candidate) = self.tables.addresses.find(source) else {
            debug!(%source, "explicit source is not a local address");
            return Err(SelectError::AddressNotAvailable);
        };

        let flags = candidate.flags();
        let unusable = AddressFlags::NOT_READY | AddressFlags::ANYCAST | AddressFlags::CLAT46;
        if flags.intersects(unusable) {
            debug!(%source, ?flags, "explicit source is not usable");
            return Err(SelectError::AddressNotAvailable);
        }

        if dst.scope().is_zoned() && dst.zone() != 0 {
            let zone = candidate.interface().zone_for(dst.addr())?;
            if zone != dst.zone() {
                debug!(%source, destination = %dst, "explicit source is in another zone");
                return Err(SelectError::ScopeMismatch);
            }
        }

        let interface = Arc::clone(candidate.interface());
        usable(&interface, output)?;
        Ok(SourceSelection {
            address: candidate.scoped(),
            interface: Some(interface),
            candidate: Some(candidate),
            rule: None,
            path: SelectionPath::Explicit,
        })
    }
}

fn usable(interface: &Interface, output: OutputFlags) -> Result<()> {
    check_protocol_enabled(interface.id(), interface.flags())?;
    check_restrictions(interface.flags(), output).map_err(|restriction| SelectError::Restricted {
        interface: interface.id(),
        restriction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sasel_primitives::{InterfaceFlags, Restriction};
    use sasel_route::{Route, RouteFlags, StaticRouteTable, StaticRouterTable};

    fn selector() -> (SourceSelector, Arc<Interface>) {
        let interfaces = Arc::new(InterfaceTable::new());
        let en0 = interfaces
            .insert(Interface::new(
                InterfaceId::new(4),
                "en0",
                InterfaceFlags::UP | InterfaceFlags::CELLULAR,
            ))
            .unwrap();
        let addresses = Arc::new(AddressTable::new());
        for (addr, flags) in [
            ("fe80::4", AddressFlags::empty()),
            ("2001:db8::10", AddressFlags::empty()),
            ("2001:db8::a", AddressFlags::ANYCAST),
        ] {
            let candidate = CandidateAddress::new(Arc::clone(&en0), addr.parse().unwrap(), 64)
                .unwrap()
                .with_flags(flags);
            addresses.insert(candidate).unwrap();
        }
        let routes = Arc::new(StaticRouteTable::new());
        routes.insert_route(Route::new(
            "2001:db8::/64".parse().unwrap(),
            Arc::clone(&en0),
            RouteFlags::UP,
        ));

        let tables = Tables {
            policy: Arc::new(PolicyTable::default()),
            interfaces,
            addresses,
            routes,
            routers: Arc::new(StaticRouterTable::new()),
        };
        (SourceSelector::new(tables, SelectionConfig::default()), en0)
    }

    fn dst(s: &str) -> ScopedAddr {
        ScopedAddr::unzoned(s.parse().unwrap())
    }

    #[test]
    fn test_scored_path() {
        let (selector, en0) = selector();
        let mut cache = RouteCache::new();
        let chosen = selector
            .select_source(dst("2001:db8::1"), &mut PacketOptions::new(), None, None, &mut cache)
            .unwrap();
        assert_eq!(chosen.path, SelectionPath::Scored);
        assert_eq!(chosen.address.to_string(), "2001:db8::10");
        assert_eq!(chosen.interface.unwrap().id(), en0.id());
        let cached = cache.source().map(|s| s.addr().to_string());
        assert_eq!(cached.as_deref(), Some("2001:db8::10"));
    }

    #[test]
    fn test_bound_address_passes_through() {
        let (selector, _) = selector();
        let bound = dst("2001:db8:ffff::1");
        let (mut options, mut cache) = (PacketOptions::new(), RouteCache::new());
        let chosen = selector
            .select_source(dst("2001:db8::1"), &mut options, Some(bound), None, &mut cache)
            .unwrap();
        assert_eq!(chosen.path, SelectionPath::Bound);
        assert_eq!(chosen.address, bound);
        assert!(chosen.interface.is_none());
        assert!(chosen.candidate.is_none());
    }

    #[test]
    fn test_explicit_source_validation() {
        let (selector, _) = selector();
        let mut cache = RouteCache::new();
        let to = dst("2001:db8::1");

        let mut options = PacketOptions::new().with_source(dst("2001:db8::10"));
        let chosen = selector.select_source(to, &mut options, None, None, &mut cache).unwrap();
        assert_eq!(chosen.path, SelectionPath::Explicit);
        assert!(cache.is_empty());

        let mut options = PacketOptions::new().with_source(dst("2001:db8::a"));
        assert_matches!(
            selector.select_source(to, &mut options, None, None, &mut cache),
            Err(SelectError::AddressNotAvailable)
        );

        let mut options = PacketOptions::new().with_source(dst("2001:db8::99"));
        assert_matches!(
            selector.select_source(to, &mut options, None, None, &mut cache),
            Err(SelectError::AddressNotAvailable)
        );

        let mut options = PacketOptions::new()
            .with_source(dst("2001:db8::10"))
            .with_flags(OutputFlags::NO_CELLULAR);
        assert_matches!(
            selector.select_source(to, &mut options, None, None, &mut cache),
            Err(SelectError::Restricted { restriction: Restriction::Cellular, .. })
        );
    }

    #[test]
    fn test_explicit_source_zone_mismatch() {
        let (selector, _) = selector();
        let to = ScopedAddr::new("fe80::1".parse().unwrap(), 9);
        let source = ScopedAddr::new("fe80::4".parse().unwrap(), 4);
        let mut options = PacketOptions::new().with_source(source);
        assert_matches!(
            selector.select_source(to, &mut options, None, None, &mut RouteCache::new()),
            Err(SelectError::ScopeMismatch)
        );
    }

    #[test]
    fn test_unspecified_destination() {
        let (selector, _) = selector();
        let mut options = PacketOptions::new();
        assert_matches!(
            selector.select_source(dst("::"), &mut options, None, None, &mut RouteCache::new()),
            Err(SelectError::UnspecifiedDestination)
        );
    }

    #[test]
    fn test_select_interface() {
        let (selector, en0) = selector();
        let interface = selector.select_interface(dst("2001:db8::1"), None, None).unwrap();
        assert_eq!(interface.id(), en0.id());
        assert_matches!(
            selector.select_interface(dst("2001:db9::1"), None, None),
            Err(SelectError::HostUnreachable)
        );
    }
}
