//! Address-selection policy table (RFC 6724 §2.1).
//!
//! The table classifies addresses into [`Label`]s by longest-prefix match.
//! Source selection prefers a source whose label equals the destination's.
//!
//! The table is built once at startup and is immutable afterwards; the only
//! state that changes is a per-entry usage counter kept for introspection.
//! The administrative add/delete surface exists but is disabled.
//!
//! # Usage
//!
//! ```ignore
//! use sasel_policy::{Label, PolicyTable};
//!
//! let table = PolicyTable::default();
//! let entry = table.lookup(&"2002:c000:0204::1".parse()?);
//! assert_eq!(entry.label(), Label::SIX_TO_FOUR);
//! ```

mod entry;
mod table;

pub use entry::{Label, PolicyEntry, PolicySnapshot, PolicySpec};
pub use table::{PolicyError, PolicyTable};
