//! A locally configured IPv6 address.

use std::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ipnet::Ipv6Net;
use sasel_primitives::{AddressFlags, Scope, ScopedAddr, ZoneId};
use web_time::Instant;

use crate::{AddrsError, Interface};

/// An address owned by an interface, eligible as a packet source.
#[derive(Debug)]
pub struct CandidateAddress {
    interface: Arc<Interface>,
    addr: Ipv6Addr,
    prefix_len: u8,
    zone: ZoneId,
    flags: AtomicU32,
    /// End of the preferred lifetime; `None` is infinite.
    preferred_until: Option<Instant>,
}

impl CandidateAddress {
    /// Configure `addr/prefix_len` on `interface`.
    ///
    /// Fails when the address has no zone on the interface, i.e. the
    /// loopback address on a non-loopback interface.
    pub fn new(
        interface: Arc<Interface>,
        addr: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<Self, AddrsError> {
        if prefix_len > 128 {
            return Err(AddrsError::PrefixLength(prefix_len));
        }
        let zone = interface.zone_for(&addr)?;
        Ok(Self {
            interface,
            addr,
            prefix_len,
            zone,
            flags: AtomicU32::new(0),
            preferred_until: None,
        })
    }

    pub fn with_flags(self, flags: AddressFlags) -> Self {
        self.flags.store(flags.bits(), Ordering::Release);
        self
    }

    /// Limit the preferred lifetime, counted from now.
    pub fn with_preferred_lifetime(mut self, lifetime: Duration) -> Self {
        self.preferred_until = Some(Instant::now() + lifetime);
        self
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    pub fn addr(&self) -> &Ipv6Addr {
        &self.addr
    }

    pub fn scoped(&self) -> ScopedAddr {
        ScopedAddr::new(self.addr, self.zone)
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn scope(&self) -> Scope {
        Scope::of(&self.addr)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The on-link prefix this address was configured from.
    pub fn prefix(&self) -> Ipv6Net {
        Ipv6Net::new(self.addr, self.prefix_len)
            .map(|net| net.trunc())
            .unwrap_or_default()
    }

    pub fn flags(&self) -> AddressFlags {
        AddressFlags::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    pub fn insert_flags(&self, flags: AddressFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub fn remove_flags(&self, flags: AddressFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Deprecated by flag or because the preferred lifetime ran out.
    pub fn is_deprecated(&self, now: Instant) -> bool {
        self.flags().contains(AddressFlags::DEPRECATED)
            || self.preferred_until.is_some_and(|until| now >= until)
    }

    pub fn is_optimistic(&self) -> bool {
        self.flags().contains(AddressFlags::OPTIMISTIC)
    }

    pub fn is_temporary(&self) -> bool {
        self.flags().contains(AddressFlags::TEMPORARY)
    }
}

impl fmt::Display for CandidateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} on {}", self.scoped(), self.prefix_len, self.interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasel_primitives::{InterfaceFlags, InterfaceId, SelectError};
    use assert_matches::assert_matches;

    fn en0() -> Arc<Interface> {
        Arc::new(Interface::new(InterfaceId::new(4), "en0", InterfaceFlags::UP))
    }

    #[test]
    fn test_zone_and_prefix() {
        let link = CandidateAddress::new(en0(), "fe80::1234".parse().unwrap(), 64).unwrap();
        assert_eq!(link.zone(), 4);
        assert_eq!(link.scope(), Scope::LINK_LOCAL);
        assert_eq!(link.scoped().to_string(), "fe80::1234%4");
        assert_eq!(link.prefix().to_string(), "fe80::/64");

        let global = CandidateAddress::new(en0(), "2001:db8:1:2::5".parse().unwrap(), 48).unwrap();
        assert_eq!(global.zone(), 0);
        assert_eq!(global.prefix().to_string(), "2001:db8:1::/48");
    }

    #[test]
    fn test_rejects_unzoned_address() {
        assert_matches!(
            CandidateAddress::new(en0(), Ipv6Addr::LOCALHOST, 128),
            Err(AddrsError::Select(SelectError::InvalidScope))
        );
        assert_matches!(
            CandidateAddress::new(en0(), "2001:db8::1".parse().unwrap(), 129),
            Err(AddrsError::PrefixLength(129))
        );
    }

    #[test]
    fn test_deprecation() {
        let now = Instant::now();
        let stable = CandidateAddress::new(en0(), "2001:db8::1".parse().unwrap(), 64).unwrap();
        assert!(!stable.is_deprecated(now));
        stable.insert_flags(AddressFlags::DEPRECATED);
        assert!(stable.is_deprecated(now));

        let expired = CandidateAddress::new(en0(), "2001:db8::2".parse().unwrap(), 64)
            .unwrap()
            .with_preferred_lifetime(Duration::ZERO);
        assert!(expired.is_deprecated(Instant::now()));

        let fresh = CandidateAddress::new(en0(), "2001:db8::3".parse().unwrap(), 64)
            .unwrap()
            .with_preferred_lifetime(Duration::from_secs(3600));
        assert!(!fresh.is_deprecated(Instant::now()));
    }

    #[test]
    fn test_flag_mutation() {
        let addr = CandidateAddress::new(en0(), "2001:db8::1".parse().unwrap(), 64)
            .unwrap()
            .with_flags(AddressFlags::TEMPORARY | AddressFlags::OPTIMISTIC);
        assert!(addr.is_temporary());
        assert!(addr.is_optimistic());
        addr.remove_flags(AddressFlags::OPTIMISTIC);
        assert!(!addr.is_optimistic());
    }
}
