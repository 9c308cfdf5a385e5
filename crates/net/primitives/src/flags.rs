//! Flag sets carried by addresses, interfaces and outgoing packets.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Lifecycle and usage flags of a locally configured address.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AddressFlags: u32 {
        /// Duplicate address detection has not completed.
        const TENTATIVE = 1 << 0;
        /// Duplicate address detection found a conflict.
        const DUPLICATED = 1 << 1;
        const ANYCAST = 1 << 2;
        /// The address's prefix is no longer on-link.
        const DETACHED = 1 << 3;
        /// Deprecated regardless of the remaining preferred lifetime.
        const DEPRECATED = 1 << 4;
        /// Optimistic DAD (RFC 4429) is in progress.
        const OPTIMISTIC = 1 << 5;
        /// Privacy extension address (RFC 8981).
        const TEMPORARY = 1 << 6;
        /// Reserved for CLAT46 translation.
        const CLAT46 = 1 << 7;

        /// Unusable until DAD resolves.
        const NOT_READY = Self::TENTATIVE.bits() | Self::DUPLICATED.bits();
    }
}

bitflags! {
    /// Interface state and capability flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InterfaceFlags: u32 {
        /// Administratively up.
        const UP = 1 << 0;
        const LOOPBACK = 1 << 1;
        /// IPv6 is disabled on the interface.
        const IPV6_DISABLED = 1 << 2;
        const CELLULAR = 1 << 3;
        /// Metered or otherwise costly.
        const EXPENSIVE = 1 << 4;
        /// Low data mode.
        const CONSTRAINED = 1 << 5;
        /// Link to an internal co-processor.
        const COPROCESSOR = 1 << 6;
        /// Peer-to-peer wireless link restricted to opted-in traffic.
        const AWDL_RESTRICTED = 1 << 7;
        /// Out-of-band management network.
        const MANAGEMENT = 1 << 8;
        /// Proxies neighbor discovery for prefixes of other interfaces.
        const ND_PROXY = 1 << 9;
    }
}

bitflags! {
    /// Per-packet output restrictions and allowances.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct OutputFlags: u32 {
        const NO_CELLULAR = 1 << 0;
        const NO_EXPENSIVE = 1 << 1;
        const NO_CONSTRAINED = 1 << 2;
        const COPROCESSOR_ALLOWED = 1 << 3;
        const AWDL_UNRESTRICTED = 1 << 4;
        const MANAGEMENT_ALLOWED = 1 << 5;
        /// The endpoint is bound to an interface; the scope hint is mandatory.
        const BOUND_IF = 1 << 6;
        const PREFER_TEMPORARY = 1 << 7;
        const PREFER_STABLE = 1 << 8;
        /// The caller asks for a CLAT46 source address.
        const CLAT46 = 1 << 9;
        /// Sources on expensive interfaces other than the outgoing one are
        /// acceptable for this send.
        const ALLOW_EXPENSIVE_SECONDARY = 1 << 10;
    }
}

bitflags! {
    /// Hints steering the candidate scorer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SourceHints: u32 {
        const PREFER_TEMPORARY = 1 << 0;
        const PREFER_STABLE = 1 << 1;
        /// Only CLAT46-reserved addresses are acceptable.
        const CLAT46 = 1 << 2;
        /// Candidates on expensive interfaces other than the outgoing one are
        /// acceptable.
        const ALLOW_EXPENSIVE_SECONDARY = 1 << 3;
    }
}

impl SourceHints {
    /// Resolve the temporary-address preference, falling back to `default`
    /// when neither preference flag is set. An explicit stable preference wins.
    pub fn prefers_temporary(self, default: bool) -> bool {
        if self.contains(Self::PREFER_STABLE) {
            false
        } else if self.contains(Self::PREFER_TEMPORARY) {
            true
        } else {
            default
        }
    }
}

impl From<OutputFlags> for SourceHints {
    fn from(flags: OutputFlags) -> Self {
        let mut hints = Self::empty();
        hints.set(Self::PREFER_TEMPORARY, flags.contains(OutputFlags::PREFER_TEMPORARY));
        hints.set(Self::PREFER_STABLE, flags.contains(OutputFlags::PREFER_STABLE));
        hints.set(Self::CLAT46, flags.contains(OutputFlags::CLAT46));
        hints.set(
            Self::ALLOW_EXPENSIVE_SECONDARY,
            flags.contains(OutputFlags::ALLOW_EXPENSIVE_SECONDARY),
        );
        hints
    }
}
