//! The comparison ladder, as pure functions over candidate facts.

use std::fmt;

use sasel_addrs::CandidateAddress;
use sasel_policy::{Label, PolicyTable};
use sasel_primitives::{InterfaceId, Scope, ScopedAddr, common_prefix_len};
use serde::Serialize;
use web_time::Instant;

/// The rule that decided a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    /// Rule 0: first eligible candidate.
    First,
    /// Rule 1: the candidate is the destination.
    SameAddress,
    /// Rule 2: appropriate scope.
    Scope,
    /// Rule 3: avoid deprecated and optimistic addresses.
    AvoidDeprecated,
    /// Rule 5: prefer the outgoing interface.
    OutgoingInterface,
    /// Rule 5.5: prefer a prefix advertised by the next-hop router.
    NextHopPrefix,
    /// Rule 6: matching label.
    Label,
    /// Rule 7: temporary or stable, per preference.
    Temporary,
    /// Rule 7x: interface is up.
    InterfaceUp,
    /// Rule 8: longest matching prefix.
    LongestMatch,
    /// Every rule tied; the earlier candidate stays.
    Tie,
}

impl Rule {
    /// RFC 6724 rule number, with local extensions.
    pub fn number(self) -> &'static str {
        match self {
            Self::First => "0",
            Self::SameAddress => "1",
            Self::Scope => "2",
            Self::AvoidDeprecated => "3",
            Self::OutgoingInterface => "5",
            Self::NextHopPrefix => "5.5",
            Self::Label => "6",
            Self::Temporary => "7",
            Self::InterfaceUp => "7x",
            Self::LongestMatch => "8",
            Self::Tie => "-",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = (*self).into();
        write!(f, "{} ({name})", self.number())
    }
}

/// Outcome of comparing a candidate against the incumbent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The incumbent stays.
    Keep(Rule),
    /// The candidate becomes the incumbent.
    Replace(Rule),
    /// The candidate wins and the scan ends.
    Stop(Rule),
}

impl Verdict {
    pub fn rule(self) -> Rule {
        match self {
            Self::Keep(rule) | Self::Replace(rule) | Self::Stop(rule) => rule,
        }
    }
}

/// What the ladder needs to know about one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Facts {
    pub(crate) scope: Scope,
    pub(crate) deprecated: bool,
    pub(crate) optimistic: bool,
    pub(crate) temporary: bool,
    pub(crate) interface: InterfaceId,
    pub(crate) up: bool,
    pub(crate) label: Label,
    pub(crate) matchlen: u8,
}

impl Facts {
    pub(crate) fn of(
        candidate: &CandidateAddress,
        destination: &ScopedAddr,
        policy: &PolicyTable,
        now: Instant,
    ) -> Self {
        Self {
            scope: candidate.scope(),
            deprecated: candidate.is_deprecated(now),
            optimistic: candidate.is_optimistic(),
            temporary: candidate.is_temporary(),
            interface: candidate.interface().id(),
            up: candidate.interface().is_up(),
            label: policy.label_of(candidate.addr()),
            matchlen: common_prefix_len(candidate.addr(), destination.addr()),
        }
    }
}

/// Per-query inputs shared by every comparison.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ladder {
    pub(crate) dst_scope: Scope,
    pub(crate) dst_label: Label,
    pub(crate) outgoing: Option<InterfaceId>,
    pub(crate) prefer_temporary: bool,
}

/// Rules 2, 3 and 5.
pub(crate) fn leading(best: &Facts, candidate: &Facts, ladder: &Ladder) -> Option<Verdict> {
    // Rule 2: a wider scope wins while the narrower one is too narrow for
    // the destination; otherwise the narrower one wins.
    if best.scope < candidate.scope {
        return Some(if best.scope < ladder.dst_scope {
            Verdict::Replace(Rule::Scope)
        } else {
            Verdict::Keep(Rule::Scope)
        });
    }
    if candidate.scope < best.scope {
        return Some(if candidate.scope < ladder.dst_scope {
            Verdict::Keep(Rule::Scope)
        } else {
            Verdict::Replace(Rule::Scope)
        });
    }

    // Rule 3: optimistic addresses count as deprecated.
    if let Some(verdict) = prefer(best.deprecated, candidate.deprecated, Rule::AvoidDeprecated) {
        return Some(verdict);
    }
    if let Some(verdict) = prefer(best.optimistic, candidate.optimistic, Rule::AvoidDeprecated) {
        return Some(verdict);
    }

    // Rule 5
    if let Some(outgoing) = ladder.outgoing {
        let on = |facts: &Facts| facts.interface == outgoing;
        if let Some(verdict) = prefer(!on(best), !on(candidate), Rule::OutgoingInterface) {
            return Some(verdict);
        }
    }
    None
}

/// Rule 5.5.
pub(crate) fn next_hop_prefix(
    best_has_router: bool,
    candidate_has_router: bool,
) -> Option<Verdict> {
    prefer(!best_has_router, !candidate_has_router, Rule::NextHopPrefix)
}

/// Rules 6, 7, 7x and 8. Always decides.
pub(crate) fn trailing(best: &Facts, candidate: &Facts, ladder: &Ladder) -> Verdict {
    // Rule 6
    if ladder.dst_label.is_applicable() {
        let mismatch = |facts: &Facts| facts.label != ladder.dst_label;
        if let Some(verdict) = prefer(mismatch(best), mismatch(candidate), Rule::Label) {
            return verdict;
        }
    }

    // Rule 7
    let unwanted = |facts: &Facts| facts.temporary != ladder.prefer_temporary;
    if let Some(verdict) = prefer(unwanted(best), unwanted(candidate), Rule::Temporary) {
        return verdict;
    }

    // Rule 7x
    if let Some(verdict) = prefer(!best.up, !candidate.up, Rule::InterfaceUp) {
        return verdict;
    }

    // Rule 8
    if candidate.matchlen > best.matchlen {
        return Verdict::Replace(Rule::LongestMatch);
    }
    if candidate.matchlen < best.matchlen {
        return Verdict::Keep(Rule::LongestMatch);
    }

    Verdict::Keep(Rule::Tie)
}

/// Decide on a single undesirable property.
fn prefer(best_bad: bool, candidate_bad: bool, rule: Rule) -> Option<Verdict> {
    match (best_bad, candidate_bad) {
        (false, true) => Some(Verdict::Keep(rule)),
        (true, false) => Some(Verdict::Replace(rule)),
        _ => None,
    }
}
