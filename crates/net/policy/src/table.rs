//! The policy table and its longest-prefix lookup.

use std::net::Ipv6Addr;

use ipnet::Ipv6Net;
use tracing::{debug, trace};

use crate::entry::{Label, PolicyEntry, PolicySnapshot, PolicySpec};

/// Errors from the administrative policy surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("policy administration is disabled")]
    AdministrationDisabled,
}

/// Built-in policy rows: RFC 6724 §2.1 plus the deprecated site-local and
/// 6bone prefixes.
const DEFAULT_POLICY: [(&str, u32, Label); 9] = [
    ("::1/128", 50, Label::LOOPBACK),
    ("::/0", 40, Label::DEFAULT),
    ("::ffff:0:0/96", 35, Label::IPV4_MAPPED),
    ("2002::/16", 30, Label::SIX_TO_FOUR),
    ("2001::/32", 5, Label::TEREDO),
    ("fc00::/7", 3, Label::UNIQUE_LOCAL),
    ("::/96", 1, Label::IPV4_COMPATIBLE),
    ("fec0::/10", 1, Label::SITE_LOCAL),
    ("3ffe::/16", 1, Label::SIX_BONE),
];

/// Ordered, immutable set of policy entries.
#[derive(Debug)]
pub struct PolicyTable {
    entries: Vec<PolicyEntry>,
    /// Returned when nothing matches.
    no_match: PolicyEntry,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let specs = DEFAULT_POLICY.iter().filter_map(|(prefix, precedence, label)| {
            prefix.parse::<Ipv6Net>().ok().map(|prefix| PolicySpec {
                prefix,
                precedence: *precedence,
                label: *label,
            })
        });
        Self::new(specs)
    }
}

impl PolicyTable {
    /// Build a table from entries in lookup order. Earlier entries win ties.
    pub fn new(specs: impl IntoIterator<Item = PolicySpec>) -> Self {
        let entries: Vec<_> = specs.into_iter().map(PolicyEntry::new).collect();
        debug!(entries = entries.len(), "policy table loaded");
        Self {
            entries,
            no_match: PolicyEntry::not_applicable(),
        }
    }

    /// Find the entry with the longest prefix containing `addr`.
    ///
    /// Ties go to the earliest entry. When nothing matches, the sentinel
    /// entry labelled [`Label::NOT_APPLICABLE`] is returned. Every call bumps
    /// the returned entry's usage counter.
    pub fn lookup(&self, addr: &Ipv6Addr) -> &PolicyEntry {
        let mut best: Option<&PolicyEntry> = None;
        for entry in &self.entries {
            if !entry.prefix().contains(addr) {
                continue;
            }
            let better = best.is_none_or(|b| entry.prefix().prefix_len() > b.prefix().prefix_len());
            if better {
                best = Some(entry);
            }
        }

        let entry = best.unwrap_or(&self.no_match);
        entry.record_use();
        trace!(%addr, prefix = %entry.prefix(), label = %entry.label(), "policy lookup");
        entry
    }

    /// Label of the best match for `addr`.
    pub fn label_of(&self, addr: &Ipv6Addr) -> Label {
        self.lookup(addr).label()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usage snapshot of every entry, sentinel excluded.
    pub fn snapshot(&self) -> Vec<PolicySnapshot> {
        self.entries.iter().map(PolicyEntry::snapshot).collect()
    }

    /// Administrative insert. Always refused.
    pub fn set_policy(&self, spec: PolicySpec) -> Result<(), PolicyError> {
        debug!(prefix = %spec.prefix, "refusing policy insert");
        Err(PolicyError::AdministrationDisabled)
    }

    /// Administrative delete. Always refused.
    pub fn delete_policy(&self, prefix: &Ipv6Net) -> Result<(), PolicyError> {
        debug!(%prefix, "refusing policy delete");
        Err(PolicyError::AdministrationDisabled)
    }
}
