//! IPv6 address scopes and zone-qualified addresses.

use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

/// Zone identifier within a scope. `0` means "unspecified".
pub type ZoneId = u32;

/// IPv6 address scope (RFC 4291 §2.7 scope values).
///
/// Scopes are totally ordered by their numeric value: a larger value is a
/// wider scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(u8);

impl Scope {
    pub const INTERFACE_LOCAL: Self = Self(0x1);
    pub const LINK_LOCAL: Self = Self(0x2);
    pub const ADMIN_LOCAL: Self = Self(0x4);
    pub const SITE_LOCAL: Self = Self(0x5);
    pub const ORG_LOCAL: Self = Self(0x8);
    pub const GLOBAL: Self = Self(0xe);

    /// Classify an address.
    ///
    /// - multicast: the scope nibble of the second byte
    /// - `fe80::/10`: link-local, `fec0::/10`: site-local
    /// - `::1`: link-local (it only has meaning on the loopback link)
    /// - everything else, including `::`: global
    pub fn of(addr: &Ipv6Addr) -> Self {
        let octets = addr.octets();
        match octets[0] {
            0xfe => match octets[1] & 0xc0 {
                0x80 => Self::LINK_LOCAL,
                0xc0 => Self::SITE_LOCAL,
                _ => Self::GLOBAL,
            },
            0xff => match octets[1] & 0x0f {
                0x1 => Self::INTERFACE_LOCAL,
                0x2 => Self::LINK_LOCAL,
                0x4 => Self::ADMIN_LOCAL,
                0x5 => Self::SITE_LOCAL,
                0x8 => Self::ORG_LOCAL,
                _ => Self::GLOBAL,
            },
            _ if addr.is_loopback() => Self::LINK_LOCAL,
            _ => Self::GLOBAL,
        }
    }

    /// Raw scope value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether addresses of this scope need a zone to be unambiguous.
    pub fn is_zoned(self) -> bool {
        self < Self::GLOBAL
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::INTERFACE_LOCAL => "interface-local",
            Self::LINK_LOCAL => "link-local",
            Self::ADMIN_LOCAL => "admin-local",
            Self::SITE_LOCAL => "site-local",
            Self::ORG_LOCAL => "organization-local",
            Self::GLOBAL => "global",
            Self(other) => return write!(f, "scope-{other:#x}"),
        };
        f.write_str(name)
    }
}

/// An IPv6 address qualified with the zone it belongs to.
///
/// The zone plays the role of `sin6_scope_id`: for link-local addresses it is
/// normally the index of the link's interface, for global addresses it is `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopedAddr {
    addr: Ipv6Addr,
    #[serde(default)]
    zone: ZoneId,
}

impl ScopedAddr {
    pub const fn new(addr: Ipv6Addr, zone: ZoneId) -> Self {
        Self { addr, zone }
    }

    /// An address without an explicit zone.
    pub const fn unzoned(addr: Ipv6Addr) -> Self {
        Self { addr, zone: 0 }
    }

    pub const fn addr(&self) -> &Ipv6Addr {
        &self.addr
    }

    pub const fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn scope(&self) -> Scope {
        Scope::of(&self.addr)
    }

    pub fn is_unspecified(&self) -> bool {
        self.addr.is_unspecified()
    }

    pub fn is_multicast(&self) -> bool {
        self.addr.is_multicast()
    }
}

impl From<Ipv6Addr> for ScopedAddr {
    fn from(addr: Ipv6Addr) -> Self {
        Self::unzoned(addr)
    }
}

impl fmt::Display for ScopedAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.zone == 0 {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}%{}", self.addr, self.zone)
        }
    }
}

/// Number of leading bits two addresses have in common (0..=128).
pub fn common_prefix_len(a: &Ipv6Addr, b: &Ipv6Addr) -> u8 {
    let diff = u128::from(*a) ^ u128::from(*b);
    // leading_zeros() of a u128 is at most 128
    diff.leading_zeros() as u8
}
