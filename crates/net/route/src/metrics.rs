//! Route selection metrics

use metrics::Counter;

/// Route selection metrics
#[derive(Clone, Debug)]
pub struct RouteMetrics {
    /// Lookups answered from a still-valid route cache
    pub(crate) cache_hits_total: Counter,
    /// Lookups that had to consult the routing table
    pub(crate) cache_misses_total: Counter,
    /// Host routes cloned from cloning network routes
    pub(crate) clones_total: Counter,
}

impl Default for RouteMetrics {
    fn default() -> Self {
        Self {
            cache_hits_total: metrics::counter!("sasel.route.cache_hits_total"),
            cache_misses_total: metrics::counter!("sasel.route.cache_misses_total"),
            clones_total: metrics::counter!("sasel.route.clones_total"),
        }
    }
}

impl RouteMetrics {
    pub(crate) fn inc_cache_hits(&self) {
        self.cache_hits_total.increment(1);
    }

    pub(crate) fn inc_cache_misses(&self) {
        self.cache_misses_total.increment(1);
    }

    pub(crate) fn inc_clones(&self) {
        self.clones_total.increment(1);
    }
}
