//! Policy entries and labels.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

/// Classification assigned to an address range by the policy table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(i32);

impl Label {
    /// Sentinel for "no entry matched"; never equal to a real label for ranking.
    pub const NOT_APPLICABLE: Self = Self(-1);
    pub const LOOPBACK: Self = Self(0);
    pub const DEFAULT: Self = Self(1);
    pub const SIX_TO_FOUR: Self = Self(2);
    pub const IPV4_COMPATIBLE: Self = Self(3);
    pub const IPV4_MAPPED: Self = Self(4);
    pub const TEREDO: Self = Self(5);
    pub const SITE_LOCAL: Self = Self(11);
    pub const SIX_BONE: Self = Self(12);
    pub const UNIQUE_LOCAL: Self = Self(13);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    pub fn is_applicable(self) -> bool {
        self != Self::NOT_APPLICABLE
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declarative form of a policy entry, as found in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub prefix: Ipv6Net,
    pub precedence: u32,
    pub label: Label,
}

/// A row of the policy table.
#[derive(Debug)]
pub struct PolicyEntry {
    prefix: Ipv6Net,
    /// Kept for introspection; ranking only looks at labels.
    precedence: u32,
    label: Label,
    uses: AtomicU64,
}

impl PolicyEntry {
    pub fn new(spec: PolicySpec) -> Self {
        Self {
            // Host bits are irrelevant for matching.
            prefix: spec.prefix.trunc(),
            precedence: spec.precedence,
            label: spec.label,
            uses: AtomicU64::new(0),
        }
    }

    pub(crate) fn not_applicable() -> Self {
        Self::new(PolicySpec {
            prefix: Ipv6Net::default(),
            precedence: 0,
            label: Label::NOT_APPLICABLE,
        })
    }

    pub fn prefix(&self) -> &Ipv6Net {
        &self.prefix
    }

    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    pub fn label(&self) -> Label {
        self.label
    }

    /// How many lookups returned this entry.
    pub fn uses(&self) -> u64 {
        self.uses.load(Ordering::Relaxed)
    }

    pub(crate) fn record_use(&self) {
        self.uses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            prefix: self.prefix,
            precedence: self.precedence,
            label: self.label,
            uses: self.uses(),
        }
    }
}

/// Point-in-time view of an entry, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub prefix: Ipv6Net,
    pub precedence: u32,
    pub label: Label,
    pub uses: u64,
}
