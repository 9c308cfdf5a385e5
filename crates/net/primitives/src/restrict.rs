//! Interface capability filtering applied to the chosen egress interface.

use serde::Serialize;

use crate::{InterfaceFlags, InterfaceId, OutputFlags, SelectError};

/// A capability restriction an interface failed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Restriction {
    /// The caller refused cellular interfaces.
    Cellular,
    /// The caller refused expensive interfaces.
    Expensive,
    /// The caller refused constrained interfaces.
    Constrained,
    /// Co-processor interfaces need an explicit allowance.
    Coprocessor,
    /// Restricted AWDL interfaces need an explicit allowance.
    AwdlRestricted,
    /// Management interfaces need an explicit allowance.
    Management,
}

/// Check an interface against the packet's restrictions and allowances.
///
/// Returns the first violated restriction in a fixed order: the caller's
/// opt-out restrictions first, then the interfaces that are off-limits unless
/// allowed.
pub fn check_restrictions(
    interface: InterfaceFlags,
    output: OutputFlags,
) -> Result<(), Restriction> {
    let rules = [
        (
            output.contains(OutputFlags::NO_CELLULAR)
                && interface.contains(InterfaceFlags::CELLULAR),
            Restriction::Cellular,
        ),
        (
            output.contains(OutputFlags::NO_EXPENSIVE)
                && interface.contains(InterfaceFlags::EXPENSIVE),
            Restriction::Expensive,
        ),
        (
            output.contains(OutputFlags::NO_CONSTRAINED)
                && interface.contains(InterfaceFlags::CONSTRAINED),
            Restriction::Constrained,
        ),
        (
            interface.contains(InterfaceFlags::COPROCESSOR)
                && !output.contains(OutputFlags::COPROCESSOR_ALLOWED),
            Restriction::Coprocessor,
        ),
        (
            interface.contains(InterfaceFlags::AWDL_RESTRICTED)
                && !output.contains(OutputFlags::AWDL_UNRESTRICTED),
            Restriction::AwdlRestricted,
        ),
        (
            interface.contains(InterfaceFlags::MANAGEMENT)
                && !output.contains(OutputFlags::MANAGEMENT_ALLOWED),
            Restriction::Management,
        ),
    ];

    match rules.into_iter().find(|(violated, _)| *violated) {
        Some((_, restriction)) => Err(restriction),
        None => Ok(()),
    }
}

/// Fail with [`SelectError::NetworkDown`] when IPv6 is disabled on the interface.
pub fn check_protocol_enabled(id: InterfaceId, flags: InterfaceFlags) -> Result<(), SelectError> {
    if flags.contains(InterfaceFlags::IPV6_DISABLED) {
        return Err(SelectError::NetworkDown(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_interface_passes() {
        assert!(check_restrictions(InterfaceFlags::UP, OutputFlags::all()).is_ok());
        assert!(check_restrictions(InterfaceFlags::UP, OutputFlags::empty()).is_ok());
    }

    #[test]
    fn test_opt_out_restrictions() {
        let cell = InterfaceFlags::UP | InterfaceFlags::CELLULAR | InterfaceFlags::EXPENSIVE;
        assert!(check_restrictions(cell, OutputFlags::empty()).is_ok());
        assert_eq!(check_restrictions(cell, OutputFlags::NO_CELLULAR), Err(Restriction::Cellular));
        assert_eq!(
            check_restrictions(cell, OutputFlags::NO_EXPENSIVE),
            Err(Restriction::Expensive)
        );
        assert_eq!(
            check_restrictions(InterfaceFlags::CONSTRAINED, OutputFlags::NO_CONSTRAINED),
            Err(Restriction::Constrained)
        );
    }

    #[test]
    fn test_allowance_restrictions() {
        for (flag, allowance, restriction) in [
            (
                InterfaceFlags::COPROCESSOR,
                OutputFlags::COPROCESSOR_ALLOWED,
                Restriction::Coprocessor,
            ),
            (
                InterfaceFlags::AWDL_RESTRICTED,
                OutputFlags::AWDL_UNRESTRICTED,
                Restriction::AwdlRestricted,
            ),
            (
                InterfaceFlags::MANAGEMENT,
                OutputFlags::MANAGEMENT_ALLOWED,
                Restriction::Management,
            ),
        ] {
            assert_eq!(check_restrictions(flag, OutputFlags::empty()), Err(restriction));
            assert!(check_restrictions(flag, allowance).is_ok());
        }
    }

    #[test]
    fn test_protocol_disabled() {
        let id = InterfaceId::new(3);
        assert!(check_protocol_enabled(id, InterfaceFlags::UP).is_ok());
        assert_eq!(
            check_protocol_enabled(id, InterfaceFlags::IPV6_DISABLED),
            Err(SelectError::NetworkDown(id))
        );
    }

    #[test]
    fn test_restriction_names() {
        assert_eq!(Restriction::AwdlRestricted.to_string(), "awdl-restricted");
        let name: &'static str = Restriction::Cellular.into();
        assert_eq!(name, "cellular");
    }
}
