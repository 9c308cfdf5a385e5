//! Orchestrator metrics

use metrics::Counter;
use sasel_primitives::SelectError;

use crate::SelectionPath;

/// Source selection metrics
#[derive(Clone, Debug)]
pub struct SelectMetrics {
    explicit_total: Counter,
    bound_total: Counter,
    scored_total: Counter,
}

impl Default for SelectMetrics {
    fn default() -> Self {
        Self {
            explicit_total: metrics::counter!("sasel.select.sources_total", "path" => "explicit"),
            bound_total: metrics::counter!("sasel.select.sources_total", "path" => "bound"),
            scored_total: metrics::counter!("sasel.select.sources_total", "path" => "scored"),
        }
    }
}

impl SelectMetrics {
    pub(crate) fn record_source(&self, path: SelectionPath) {
        match path {
            SelectionPath::Explicit => self.explicit_total.increment(1),
            SelectionPath::Bound => self.bound_total.increment(1),
            SelectionPath::Scored => self.scored_total.increment(1),
        }
    }

    pub(crate) fn record_failure(&self, err: &SelectError) {
        metrics::counter!("sasel.select.failures_total", "kind" => err.as_str()).increment(1);
    }
}
