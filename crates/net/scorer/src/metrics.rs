//! Source address scorer metrics

use metrics::Counter;

use crate::{Rule, Skip};

/// Source address scorer metrics
#[derive(Clone, Debug)]
pub struct ScorerMetrics {
    /// Scans restarted because the address list changed while unlocked
    pub(crate) restarts_total: Counter,
}

impl Default for ScorerMetrics {
    fn default() -> Self {
        Self {
            restarts_total: metrics::counter!("sasel.scorer.restarts_total"),
        }
    }
}

impl ScorerMetrics {
    pub(crate) fn inc_restarts(&self) {
        self.restarts_total.increment(1);
    }

    /// Count the rule that made the final choice.
    pub(crate) fn record_decision(&self, rule: Rule) {
        let rule: &'static str = rule.into();
        metrics::counter!("sasel.scorer.decisions_total", "rule" => rule).increment(1);
    }

    pub(crate) fn record_skip(&self, reason: Skip) {
        let reason: &'static str = reason.into();
        metrics::counter!("sasel.scorer.skipped_total", "reason" => reason).increment(1);
    }
}
