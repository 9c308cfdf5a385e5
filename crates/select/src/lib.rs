//! IPv6 source address and egress route selection.
//!
//! [`SourceSelector`] is the entry point the output path calls. It ties
//! together the pieces that live in their own crates:
//!
//! - [`PolicyTable`]: precedence and label lookup
//! - [`AddressTable`] and [`InterfaceTable`]: the live candidate set
//! - [`RouteSelector`]: outgoing interface and route, with a per-socket
//!   [`RouteCache`]
//! - [`CandidateScorer`]: the RFC 6724 ranking
//!
//! ```ignore
//! let selector = SourceSelector::new(tables, SelectionConfig::default());
//! let mut cache = RouteCache::new();
//! let mut options = PacketOptions::new();
//! let chosen = selector.select_source(dst, &mut options, None, None, &mut cache)?;
//! if let Some(interface) = &chosen.interface {
//!     println!("{} via {}", chosen.address, interface.name());
//! }
//! ```

mod config;
mod metrics;
mod selector;

pub use config::{ConfigError, SelectionConfig};
pub use metrics::SelectMetrics;
pub use selector::{SelectionPath, SourceSelection, SourceSelector, Tables};

pub use sasel_addrs::{AddressTable, CandidateAddress, Interface, InterfaceTable};
pub use sasel_policy::PolicyTable;
pub use sasel_primitives::{InterfaceId, OutputFlags, Result, ScopedAddr, SelectError, SourceHints};
pub use sasel_route::{
    MulticastOptions, PacketOptions, RouteCache, RouteQuery, RouteSelection, RouteSelector,
    RouteTable, RouterTable,
};
pub use sasel_scorer::{CandidateScorer, Rule, ScoredSource};
