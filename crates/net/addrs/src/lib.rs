//! Interfaces and the locally configured candidate address set.
//!
//! Both registries are shared between the control plane, which adds and
//! removes interfaces and addresses, and the selection path, which only
//! reads them. Entries are handed out as [`Arc`](std::sync::Arc) handles so a
//! selection in progress keeps whatever it borrowed alive even if the entry
//! is removed concurrently.
//!
//! [`AddressTable`] carries a generation counter bumped on every mutation.
//! Readers that drop the lock mid-scan (see [`AddressGuard::unlocked`])
//! compare generations to detect that the list changed underneath them.

mod address;
mod error;
mod interface;
mod table;

pub use address::CandidateAddress;
pub use error::AddrsError;
pub use interface::{Interface, InterfaceTable, ZoneTable};
pub use table::{AddressGuard, AddressTable};
