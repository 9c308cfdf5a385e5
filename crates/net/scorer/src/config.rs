//! Scorer configuration.

use serde::{Deserialize, Serialize};

/// Source address selection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Only consider addresses on the outgoing interface.
    pub strong_end_system: bool,
    /// Deprecated addresses stay eligible (ranked last by rule 3).
    pub use_deprecated: bool,
    /// Optimistic addresses stay eligible (ranked last by rule 3).
    pub optimistic_dad: bool,
    /// Prefer temporary addresses unless the caller asks otherwise.
    pub prefer_temporary: bool,
    /// Enable rule 5.5.
    pub nexthop_prefix_rule: bool,
    /// Allow addresses on expensive interfaces other than the outgoing one.
    pub expensive_secondary_if: bool,
    /// Log every decision at debug level.
    pub debug: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            strong_end_system: true,
            use_deprecated: true,
            optimistic_dad: true,
            prefer_temporary: true,
            nexthop_prefix_rule: true,
            expensive_secondary_if: false,
            debug: false,
        }
    }
}
