//! Shared vocabulary for IPv6 source-address and egress-route selection.
//!
//! This crate holds the passive types every other selection crate speaks:
//!
//! - [`Scope`] and [`ScopedAddr`]: address scopes and zone-qualified addresses
//! - [`InterfaceId`]: interface index newtype
//! - [`AddressFlags`], [`InterfaceFlags`], [`OutputFlags`], [`SourceHints`]: flag sets
//! - [`SelectError`]: the error taxonomy surfaced by every selection entry point
//! - [`check_restrictions`]: per-packet interface capability filtering

mod error;
mod flags;
mod restrict;
mod scope;

pub use error::{Result, SelectError};
pub use flags::{AddressFlags, InterfaceFlags, OutputFlags, SourceHints};
pub use restrict::{Restriction, check_protocol_enabled, check_restrictions};
pub use scope::{Scope, ScopedAddr, ZoneId, common_prefix_len};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Interface index, as assigned by the interface registry.
///
/// Index `0` is never assigned to an interface; it is used on the wire to
/// mean "no interface" and is rejected by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(u32);

impl InterfaceId {
    /// Wrap a raw interface index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw interface index.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for InterfaceId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
