//! Source address selection over the live candidate set.
//!
//! [`CandidateScorer`] walks every configured address, drops the ones that
//! are not eligible for the destination, and folds the rest through an
//! ordered rule ladder derived from RFC 6724:
//!
//! | Rule | Preference |
//! |------|------------|
//! | 1    | the destination itself |
//! | 0    | the first eligible candidate, when nothing else is known |
//! | 2    | an appropriate scope |
//! | 3    | not deprecated, not optimistic |
//! | 5    | on the outgoing interface |
//! | 5.5  | on a prefix advertised by the next-hop router |
//! | 6    | a label matching the destination's |
//! | 7    | temporary (or stable, per hints) |
//! | 7x   | on an interface that is up |
//! | 8    | the longest prefix shared with the destination |
//!
//! Each comparison yields a [`Verdict`]. Rule 5.5 consults the router table
//! with the address list unlocked; if the list changed meanwhile the scan
//! restarts from scratch.

mod config;
mod filter;
mod metrics;
mod rule;
mod scorer;

pub use config::ScorerConfig;
pub use filter::Skip;
pub use metrics::ScorerMetrics;
pub use rule::{Rule, Verdict};
pub use scorer::{CandidateScorer, ScoredSource, SourceQuery};
