//! Routing-table and default-router collaborators.

use std::net::Ipv6Addr;
use std::sync::Arc;

use auto_impl::auto_impl;
use ipnet::Ipv6Net;
use parking_lot::RwLock;
use sasel_primitives::InterfaceId;
use tracing::{debug, trace};

use crate::{Route, RouteFlags};

/// Route lookup and insertion.
#[auto_impl(&, Box, Arc)]
pub trait RouteTable: Send + Sync {
    /// Best route to `destination`. With a `scope`, only routes through that
    /// interface are considered.
    fn lookup_route(&self, destination: &Ipv6Addr, scope: Option<InterfaceId>)
    -> Option<Arc<Route>>;

    /// Add a route, returning the entry now in the table. An equivalent
    /// existing entry is returned instead of adding a duplicate.
    fn insert_route(&self, route: Route) -> Arc<Route>;
}

/// Default-router list and prefix list maintained by router discovery.
#[auto_impl(&, Box, Arc)]
pub trait RouterTable: Send + Sync {
    /// The default router behind `gateway` on `interface`, if `gateway` is one.
    fn lookup_default_router(&self, gateway: &Ipv6Addr, interface: InterfaceId)
    -> Option<Ipv6Addr>;

    /// Whether `router` advertises `prefix`.
    fn prefix_has_router(&self, prefix: &Ipv6Net, router: &Ipv6Addr) -> bool;
}

/// In-memory longest-prefix-match routing table.
#[derive(Debug, Default)]
pub struct StaticRouteTable {
    routes: RwLock<Vec<Arc<Route>>>,
}

impl StaticRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the route for `destination` on `interface` and invalidate it.
    pub fn remove_route(
        &self,
        destination: &Ipv6Net,
        interface: InterfaceId,
    ) -> Option<Arc<Route>> {
        let mut routes = self.routes.write();
        let index = routes.iter().position(|r| {
            r.destination() == &destination.trunc() && r.interface().id() == interface
        })?;
        let removed = routes.remove(index);
        removed.invalidate();
        debug!(route = %removed, "route removed");
        Some(removed)
    }

    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl RouteTable for StaticRouteTable {
    fn lookup_route(
        &self,
        destination: &Ipv6Addr,
        scope: Option<InterfaceId>,
    ) -> Option<Arc<Route>> {
        let routes = self.routes.read();
        let mut best: Option<&Arc<Route>> = None;
        for route in routes.iter() {
            if !route.is_usable() || !route.destination().contains(destination) {
                continue;
            }
            let in_scope = match scope {
                Some(id) => route.interface().id() == id,
                None => !route.flags().contains(RouteFlags::IFSCOPE),
            };
            if !in_scope {
                continue;
            }
            let longer = best.is_none_or(|b| {
                route.destination().prefix_len() > b.destination().prefix_len()
            });
            if longer {
                best = Some(route);
            }
        }
        trace!(%destination, ?scope, route = ?best.map(|r| r.to_string()), "route lookup");
        best.cloned()
    }

    fn insert_route(&self, route: Route) -> Arc<Route> {
        let mut routes = self.routes.write();
        let existing = routes.iter().find(|r| {
            r.is_usable()
                && r.destination() == route.destination()
                && r.interface().id() == route.interface().id()
        });
        if let Some(existing) = existing {
            return Arc::clone(existing);
        }

        let route = Arc::new(route);
        routes.push(Arc::clone(&route));
        debug!(%route, flags = ?route.flags(), "route added");
        route
    }
}

#[derive(Debug, Default)]
struct Routers {
    defaults: Vec<(Ipv6Addr, InterfaceId)>,
    prefixes: Vec<(Ipv6Net, Vec<Ipv6Addr>)>,
}

/// In-memory default-router and prefix lists.
#[derive(Debug, Default)]
pub struct StaticRouterTable {
    inner: RwLock<Routers>,
}

impl StaticRouterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_router(&self, router: Ipv6Addr, interface: InterfaceId) {
        let mut inner = self.inner.write();
        if !inner.defaults.contains(&(router, interface)) {
            inner.defaults.push((router, interface));
            debug!(%router, %interface, "default router added");
        }
    }

    pub fn remove_router(&self, router: &Ipv6Addr, interface: InterfaceId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.defaults.len();
        inner.defaults.retain(|entry| entry != &(*router, interface));
        before != inner.defaults.len()
    }

    /// Record that `router` advertises `prefix`.
    pub fn advertise(&self, prefix: Ipv6Net, router: Ipv6Addr) {
        let prefix = prefix.trunc();
        let mut inner = self.inner.write();
        match inner.prefixes.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, routers)) if !routers.contains(&router) => routers.push(router),
            Some(_) => {}
            None => inner.prefixes.push((prefix, vec![router])),
        }
        debug!(%prefix, %router, "prefix advertised");
    }
}

impl RouterTable for StaticRouterTable {
    fn lookup_default_router(
        &self,
        gateway: &Ipv6Addr,
        interface: InterfaceId,
    ) -> Option<Ipv6Addr> {
        self.inner
            .read()
            .defaults
            .iter()
            .find(|(router, id)| router == gateway && *id == interface)
            .map(|(router, _)| *router)
    }

    fn prefix_has_router(&self, prefix: &Ipv6Net, router: &Ipv6Addr) -> bool {
        let prefix = prefix.trunc();
        self.inner
            .read()
            .prefixes
            .iter()
            .any(|(p, routers)| *p == prefix && routers.contains(router))
    }
}
