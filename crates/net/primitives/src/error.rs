//! Error taxonomy for source-address and route selection.

use std::io;

use crate::{InterfaceId, Restriction};

/// Result alias used throughout the selection crates.
pub type Result<T, E = SelectError> = std::result::Result<T, E>;

/// Why a selection could not produce a result.
///
/// Selection is all-or-nothing: every variant means no partial result was
/// produced and every reference taken during the attempt has been released.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("destination address is unspecified")]
    UnspecifiedDestination,
    #[error("no eligible source address")]
    AddressNotAvailable,
    #[error("no route to host")]
    HostUnreachable,
    #[error("network is unreachable")]
    NetworkUnreachable,
    #[error("network is down on interface {0}")]
    NetworkDown(InterfaceId),
    #[error("interface {0} does not exist")]
    NoSuchInterface(InterfaceId),
    #[error("interface {interface} is restricted: {restriction}")]
    Restricted {
        interface: InterfaceId,
        restriction: Restriction,
    },
    #[error("next hop is not an IPv6 address")]
    AddressFamilyNotSupported,
    #[error("source and destination scope zones disagree")]
    ScopeMismatch,
    #[error("address has no zone on the given interface")]
    InvalidScope,
}

impl SelectError {
    /// The standard I/O condition callers surface for this error.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::UnspecifiedDestination | Self::HostUnreachable | Self::Restricted { .. } => {
                io::ErrorKind::HostUnreachable
            }
            Self::NetworkUnreachable => io::ErrorKind::NetworkUnreachable,
            Self::NetworkDown(_) => io::ErrorKind::NetworkDown,
            Self::AddressNotAvailable => io::ErrorKind::AddrNotAvailable,
            Self::NoSuchInterface(_) => io::ErrorKind::NotFound,
            Self::AddressFamilyNotSupported => io::ErrorKind::Unsupported,
            Self::ScopeMismatch | Self::InvalidScope => io::ErrorKind::InvalidInput,
        }
    }

    /// Short label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnspecifiedDestination => "unspecified_destination",
            Self::AddressNotAvailable => "address_not_available",
            Self::HostUnreachable => "host_unreachable",
            Self::NetworkUnreachable => "network_unreachable",
            Self::NetworkDown(_) => "network_down",
            Self::NoSuchInterface(_) => "no_such_interface",
            Self::Restricted { .. } => "restricted",
            Self::AddressFamilyNotSupported => "address_family_not_supported",
            Self::ScopeMismatch => "scope_mismatch",
            Self::InvalidScope => "invalid_scope",
        }
    }
}

impl From<SelectError> for io::Error {
    fn from(err: SelectError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
