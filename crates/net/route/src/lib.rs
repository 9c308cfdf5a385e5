//! Egress route and interface selection.
//!
//! [`RouteSelector`] answers "which interface, and which route, carries a
//! packet to this destination". It consults the routing table through the
//! [`RouteTable`] trait and keeps the answer in a caller-owned
//! [`RouteCache`] that is revalidated on every call.
//!
//! The routing and default-router tables are collaborators: this crate only
//! defines the traits it needs and in-memory implementations
//! ([`StaticRouteTable`], [`StaticRouterTable`]) used by tests and the
//! diagnostic tool.

mod cache;
mod config;
mod metrics;
mod options;
mod route;
mod selector;
mod table;

pub use cache::{RouteCache, SourceInterface};
pub use config::RouteConfig;
pub use metrics::RouteMetrics;
pub use options::{MulticastOptions, PacketOptions};
pub use route::{Route, RouteFlags};
pub use selector::{RouteQuery, RouteSelection, RouteSelector};
pub use table::{RouteTable, RouterTable, StaticRouteTable, StaticRouterTable};
