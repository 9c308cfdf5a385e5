//! Host description loaded from TOML.
//!
//! ```toml
//! [[interface]]
//! name = "en0"
//! index = 4
//! flags = "UP"
//!
//! [[address]]
//! interface = "en0"
//! address = "2001:db8::2/64"
//! flags = "TEMPORARY"
//!
//! [[route]]
//! destination = "::/0"
//! interface = "en0"
//! gateway = "fe80::1"
//!
//! [[router]]
//! address = "fe80::1"
//! interface = "en0"
//! prefixes = ["2001:db8::/64"]
//! ```

use std::{fs, net::Ipv6Addr, path::Path, sync::Arc, time::Duration};

use eyre::{Result, WrapErr, eyre};
use ipnet::Ipv6Net;
use sasel::Tables;
use sasel_addrs::{AddressTable, CandidateAddress, Interface, InterfaceTable};
use sasel_policy::{PolicySpec, PolicyTable};
use sasel_primitives::{AddressFlags, InterfaceFlags, InterfaceId};
use sasel_route::{Route, RouteFlags, RouteTable, StaticRouteTable, StaticRouterTable};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct InterfaceSpec {
    pub(crate) name: String,
    pub(crate) index: u32,
    #[serde(default = "up")]
    pub(crate) flags: InterfaceFlags,
    /// Make this the primary interface.
    #[serde(default)]
    pub(crate) primary: bool,
}

fn up() -> InterfaceFlags {
    InterfaceFlags::UP
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AddressSpec {
    pub(crate) interface: String,
    pub(crate) address: Ipv6Net,
    #[serde(default)]
    pub(crate) flags: AddressFlags,
    /// Seconds until the address is deprecated.
    pub(crate) preferred_lifetime: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RouteSpec {
    pub(crate) destination: Ipv6Net,
    pub(crate) interface: String,
    pub(crate) gateway: Option<Ipv6Addr>,
    #[serde(default = "route_up")]
    pub(crate) flags: RouteFlags,
}

fn route_up() -> RouteFlags {
    RouteFlags::UP
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RouterSpec {
    pub(crate) address: Ipv6Addr,
    pub(crate) interface: String,
    #[serde(default)]
    pub(crate) prefixes: Vec<Ipv6Net>,
}

/// Everything selection needs to know about a host.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Topology {
    #[serde(default, rename = "interface")]
    pub(crate) interfaces: Vec<InterfaceSpec>,
    #[serde(default, rename = "address")]
    pub(crate) addresses: Vec<AddressSpec>,
    #[serde(default, rename = "route")]
    pub(crate) routes: Vec<RouteSpec>,
    #[serde(default, rename = "router")]
    pub(crate) routers: Vec<RouterSpec>,
    /// Replaces the default policy table when present.
    #[serde(default)]
    pub(crate) policy: Option<Vec<PolicySpec>>,
}

impl Topology {
    pub(crate) fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("reading topology {}", path.display()))?;
        Self::from_toml_str(&content)
            .wrap_err_with(|| format!("parsing topology {}", path.display()))
    }

    /// Populate fresh tables from the description.
    pub(crate) fn build(&self) -> Result<Tables> {
        let interfaces = Arc::new(InterfaceTable::new());
        for spec in &self.interfaces {
            let interface =
                Interface::new(InterfaceId::new(spec.index), spec.name.clone(), spec.flags);
            interfaces
                .insert(interface)
                .wrap_err_with(|| format!("interface {}", spec.name))?;
            if spec.primary {
                interfaces.set_primary(InterfaceId::new(spec.index))?;
            }
        }
        let interface = |name: &str| {
            interfaces
                .by_name(name)
                .ok_or_else(|| eyre!("unknown interface {name}"))
        };

        let addresses = Arc::new(AddressTable::new());
        for spec in &self.addresses {
            let ifp = interface(&spec.interface)?;
            let mut candidate =
                CandidateAddress::new(ifp, spec.address.addr(), spec.address.prefix_len())?
                    .with_flags(spec.flags);
            if let Some(secs) = spec.preferred_lifetime {
                candidate = candidate.with_preferred_lifetime(Duration::from_secs(secs));
            }
            addresses
                .insert(candidate)
                .wrap_err_with(|| format!("address {}", spec.address))?;
        }

        let routes = Arc::new(StaticRouteTable::new());
        for spec in &self.routes {
            let mut route = Route::new(spec.destination, interface(&spec.interface)?, spec.flags);
            if let Some(gateway) = spec.gateway {
                route = route.with_gateway(gateway);
            }
            routes.insert_route(route);
        }

        let routers = Arc::new(StaticRouterTable::new());
        for spec in &self.routers {
            routers.add_router(spec.address, interface(&spec.interface)?.id());
            for prefix in &spec.prefixes {
                routers.advertise(*prefix, spec.address);
            }
        }

        let policy = match &self.policy {
            Some(specs) => PolicyTable::new(specs.iter().copied()),
            None => PolicyTable::default(),
        };

        debug!(
            interfaces = interfaces.len(),
            addresses = addresses.len(),
            routes = routes.len(),
            "topology loaded"
        );
        Ok(Tables {
            policy: Arc::new(policy),
            interfaces,
            addresses,
            routes,
            routers,
        })
    }
}
