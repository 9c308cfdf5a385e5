//! Candidate eligibility.

use sasel_addrs::{CandidateAddress, Interface};
use sasel_primitives::{AddressFlags, InterfaceFlags, InterfaceId, ScopedAddr, SourceHints, ZoneId};
use web_time::Instant;

use crate::ScorerConfig;

/// Why a candidate was not considered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Skip {
    /// CLAT46 reservation does not match the request.
    Clat46,
    /// Not on the outgoing interface under strong end-system mode.
    StrongEndSystem,
    /// The destination lies in another zone from the candidate's interface.
    DestinationZone,
    /// The candidate lies in another zone from the outgoing interface.
    SourceZone,
    /// Duplicate address detection has not succeeded.
    NotReady,
    Anycast,
    Detached,
    Deprecated,
    Optimistic,
    /// On an expensive interface that is not the outgoing one.
    ExpensiveSecondary,
}

/// Hard filters applied to every candidate before ranking.
#[derive(Debug)]
pub(crate) struct Eligibility<'a> {
    pub(crate) config: &'a ScorerConfig,
    pub(crate) hints: SourceHints,
    /// Outgoing interface, the reference for zone checks.
    pub(crate) reference: Option<&'a Interface>,
    /// Outgoing interface, or the primary one when it is not known yet.
    pub(crate) primary: Option<InterfaceId>,
    pub(crate) destination: &'a ScopedAddr,
    /// Zone of the destination as seen from the reference interface.
    pub(crate) destination_zone: ZoneId,
    pub(crate) now: Instant,
}

impl Eligibility<'_> {
    pub(crate) fn check(&self, candidate: &CandidateAddress) -> Result<(), Skip> {
        let flags = candidate.flags();
        let interface = candidate.interface();

        if flags.contains(AddressFlags::CLAT46) != self.hints.contains(SourceHints::CLAT46) {
            return Err(Skip::Clat46);
        }
        if self.config.strong_end_system
            && self.reference.is_some_and(|r| r.id() != interface.id())
        {
            return Err(Skip::StrongEndSystem);
        }

        match interface.zone_for(self.destination.addr()) {
            Ok(zone) if zone == self.destination_zone => {}
            _ => return Err(Skip::DestinationZone),
        }
        if let Some(reference) = self.reference {
            match reference.zone_for(candidate.addr()) {
                Ok(zone) if zone == candidate.zone() => {}
                _ => return Err(Skip::SourceZone),
            }
        }

        if flags.intersects(AddressFlags::NOT_READY) {
            return Err(Skip::NotReady);
        }
        if flags.contains(AddressFlags::ANYCAST) {
            return Err(Skip::Anycast);
        }
        if flags.contains(AddressFlags::DETACHED) {
            return Err(Skip::Detached);
        }
        if !self.config.use_deprecated && candidate.is_deprecated(self.now) {
            return Err(Skip::Deprecated);
        }
        if !self.config.optimistic_dad && candidate.is_optimistic() {
            return Err(Skip::Optimistic);
        }
        Ok(())
    }

    /// Expensive interfaces other than the outgoing (or primary) one are
    /// avoided unless allowed.
    pub(crate) fn check_expensive(&self, candidate: &CandidateAddress) -> Result<(), Skip> {
        if self.config.expensive_secondary_if
            || self.hints.contains(SourceHints::ALLOW_EXPENSIVE_SECONDARY)
        {
            return Ok(());
        }
        let interface = candidate.interface();
        let secondary = self.primary.is_some_and(|primary| primary != interface.id());
        if secondary && interface.flags().contains(InterfaceFlags::EXPENSIVE) {
            return Err(Skip::ExpensiveSecondary);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Fixture {
        en0: Arc<Interface>,
        en1: Arc<Interface>,
        config: ScorerConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                en0: Arc::new(Interface::new(InterfaceId::new(4), "en0", InterfaceFlags::UP)),
                en1: Arc::new(Interface::new(
                    InterfaceId::new(5),
                    "en1",
                    InterfaceFlags::UP | InterfaceFlags::EXPENSIVE,
                )),
                config: ScorerConfig::default(),
            }
        }

        fn eligibility<'a>(
            &'a self,
            destination: &'a ScopedAddr,
            hints: SourceHints,
        ) -> Eligibility<'a> {
            Eligibility {
                config: &self.config,
                hints,
                reference: Some(&self.en0),
                primary: Some(self.en0.id()),
                destination,
                destination_zone: self.en0.zone_for(destination.addr()).unwrap(),
                now: Instant::now(),
            }
        }
    }

    fn candidate(ifp: &Arc<Interface>, addr: &str, flags: AddressFlags) -> CandidateAddress {
        CandidateAddress::new(Arc::clone(ifp), addr.parse().unwrap(), 64)
            .unwrap()
            .with_flags(flags)
    }

    #[test]
    fn test_lifecycle_flags() {
        let fx = Fixture::new();
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let check = fx.eligibility(&dst, SourceHints::empty());
        for (flags, skip) in [
            (AddressFlags::TENTATIVE, Skip::NotReady),
            (AddressFlags::DUPLICATED, Skip::NotReady),
            (AddressFlags::ANYCAST, Skip::Anycast),
            (AddressFlags::DETACHED, Skip::Detached),
        ] {
            assert_eq!(check.check(&candidate(&fx.en0, "2001:db8::2", flags)), Err(skip));
        }
        let deprecated = candidate(&fx.en0, "2001:db8::2", AddressFlags::DEPRECATED);
        assert_eq!(check.check(&deprecated), Ok(()));
    }

    #[test]
    fn test_deprecated_and_optimistic_switches() {
        let mut fx = Fixture::new();
        fx.config.use_deprecated = false;
        fx.config.optimistic_dad = false;
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let check = fx.eligibility(&dst, SourceHints::empty());
        assert_eq!(
            check.check(&candidate(&fx.en0, "2001:db8::2", AddressFlags::DEPRECATED)),
            Err(Skip::Deprecated)
        );
        assert_eq!(
            check.check(&candidate(&fx.en0, "2001:db8::2", AddressFlags::OPTIMISTIC)),
            Err(Skip::Optimistic)
        );
    }

    #[test]
    fn test_clat46_both_ways() {
        let fx = Fixture::new();
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let plain = fx.eligibility(&dst, SourceHints::empty());
        let clat = fx.eligibility(&dst, SourceHints::CLAT46);
        let reserved = candidate(&fx.en0, "2001:db8::46", AddressFlags::CLAT46);
        let regular = candidate(&fx.en0, "2001:db8::2", AddressFlags::empty());

        assert_eq!(plain.check(&reserved), Err(Skip::Clat46));
        assert_eq!(plain.check(&regular), Ok(()));
        assert_eq!(clat.check(&reserved), Ok(()));
        assert_eq!(clat.check(&regular), Err(Skip::Clat46));
    }

    #[test]
    fn test_strong_end_system() {
        let mut fx = Fixture::new();
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let other = candidate(&fx.en1, "2001:db8:5::2", AddressFlags::empty());
        let check = fx.eligibility(&dst, SourceHints::empty());
        assert_eq!(check.check(&other), Err(Skip::StrongEndSystem));

        fx.config.strong_end_system = false;
        assert_eq!(fx.eligibility(&dst, SourceHints::empty()).check(&other), Ok(()));
    }

    #[test]
    fn test_zone_checks() {
        let mut fx = Fixture::new();
        fx.config.strong_end_system = false;

        // link-local destination in en0's zone: en1's view of it is another zone
        let dst = ScopedAddr::new("fe80::1".parse().unwrap(), 4);
        let check = fx.eligibility(&dst, SourceHints::empty());
        let global = candidate(&fx.en1, "2001:db8::2", AddressFlags::empty());
        assert_eq!(check.check(&global), Err(Skip::DestinationZone));
        assert_eq!(check.check(&candidate(&fx.en0, "fe80::2", AddressFlags::empty())), Ok(()));

        // global destination, link-local candidate on another link
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let check = fx.eligibility(&dst, SourceHints::empty());
        let foreign = candidate(&fx.en1, "fe80::2", AddressFlags::empty());
        assert_eq!(check.check(&foreign), Err(Skip::SourceZone));
        assert_eq!(check.check(&global), Ok(()));
    }

    #[test]
    fn test_expensive_secondary() {
        let mut fx = Fixture::new();
        let dst = ScopedAddr::unzoned("2001:db8::1".parse().unwrap());
        let metered = candidate(&fx.en1, "2001:db8:5::2", AddressFlags::empty());
        let local = candidate(&fx.en0, "2001:db8::2", AddressFlags::empty());

        let check = fx.eligibility(&dst, SourceHints::empty());
        assert_eq!(check.check_expensive(&metered), Err(Skip::ExpensiveSecondary));
        assert_eq!(check.check_expensive(&local), Ok(()));
        let allowed = fx.eligibility(&dst, SourceHints::ALLOW_EXPENSIVE_SECONDARY);
        assert_eq!(allowed.check_expensive(&metered), Ok(()));

        fx.config.expensive_secondary_if = true;
        let check = fx.eligibility(&dst, SourceHints::empty());
        assert_eq!(check.check_expensive(&metered), Ok(()));
    }
}
