//! Address table errors.

use sasel_primitives::{InterfaceId, SelectError};

/// Errors from registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrsError {
    #[error("interface index 0 is reserved")]
    ReservedIndex,
    #[error("interface {0} already exists")]
    DuplicateInterface(InterfaceId),
    #[error("interface {0} does not exist")]
    UnknownInterface(InterfaceId),
    #[error("address {addr} is already configured on interface {interface}")]
    DuplicateAddress {
        addr: std::net::Ipv6Addr,
        interface: InterfaceId,
    },
    #[error("invalid prefix length {0}")]
    PrefixLength(u8),
    #[error(transparent)]
    Select(#[from] SelectError),
}
