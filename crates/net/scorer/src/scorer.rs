//! The candidate scan.

use std::net::Ipv6Addr;
use std::sync::Arc;

use sasel_addrs::{AddressTable, CandidateAddress, Interface, InterfaceTable};
use sasel_policy::PolicyTable;
use sasel_primitives::{Result, ScopedAddr, SelectError, SourceHints};
use sasel_route::{Route, RouteFlags, RouterTable};
use serde::Serialize;
use web_time::Instant;

use crate::filter::Eligibility;
use crate::rule::{Facts, Ladder, leading, next_hop_prefix, trailing};
use crate::{Rule, ScorerConfig, ScorerMetrics, Verdict};

/// Log at debug level when asked to, at trace otherwise.
macro_rules! decision {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// Inputs to [`CandidateScorer::select`].
#[derive(Debug, Clone, Copy)]
pub struct SourceQuery<'a> {
    pub destination: ScopedAddr,
    pub hints: SourceHints,
    /// Outgoing interface, when already chosen.
    pub interface: Option<&'a Arc<Interface>>,
    /// Route to the destination, for the next-hop prefix rule.
    pub route: Option<&'a Route>,
    /// Log every decision at debug level.
    pub debug: bool,
}

impl<'a> SourceQuery<'a> {
    pub fn new(destination: ScopedAddr) -> Self {
        Self {
            destination,
            hints: SourceHints::empty(),
            interface: None,
            route: None,
            debug: false,
        }
    }

    pub fn with_hints(mut self, hints: SourceHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_interface(mut self, interface: Option<&'a Arc<Interface>>) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_route(mut self, route: Option<&'a Route>) -> Self {
        self.route = route;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// The chosen source address.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSource {
    #[serde(serialize_with = "serialize_candidate")]
    pub address: Arc<CandidateAddress>,
    /// Rule that last replaced the incumbent (or stopped the scan).
    pub rule: Rule,
    /// Scans restarted because the address list changed mid-scan.
    pub restarts: u32,
}

fn serialize_candidate<S: serde::Serializer>(
    address: &Arc<CandidateAddress>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&address.scoped())
}

/// Incumbent of the scan.
struct Best {
    address: Arc<CandidateAddress>,
    facts: Facts,
    rule: Rule,
}

/// Ranks the live candidate set for a destination.
pub struct CandidateScorer {
    policy: Arc<PolicyTable>,
    addresses: Arc<AddressTable>,
    interfaces: Arc<InterfaceTable>,
    routers: Arc<dyn RouterTable>,
    config: ScorerConfig,
    metrics: ScorerMetrics,
}

impl CandidateScorer {
    pub fn new(
        policy: Arc<PolicyTable>,
        addresses: Arc<AddressTable>,
        interfaces: Arc<InterfaceTable>,
        routers: Arc<dyn RouterTable>,
        config: ScorerConfig,
    ) -> Self {
        Self {
            policy,
            addresses,
            interfaces,
            routers,
            config,
            metrics: ScorerMetrics::default(),
        }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Pick the best source address for `query.destination`.
    ///
    /// Returns [`SelectError::AddressNotAvailable`] when no candidate is
    /// eligible, and [`SelectError::InvalidScope`] when the destination has
    /// no zone on the outgoing interface. The address list is never
    /// modified.
    pub fn select(&self, query: &SourceQuery<'_>) -> Result<ScoredSource> {
        let dst = query.destination;
        let debug = query.debug || self.config.debug;
        let now = Instant::now();

        let reference = query.interface.map(Arc::as_ref);
        let destination_zone = match reference {
            Some(interface) => interface.zone_for(dst.addr())?,
            None => dst.zone(),
        };
        let primary = reference
            .map(Interface::id)
            .or_else(|| self.interfaces.primary().map(|i| i.id()));
        let eligibility = Eligibility {
            config: &self.config,
            hints: query.hints,
            reference,
            primary,
            destination: &dst,
            destination_zone,
            now,
        };
        let ladder = Ladder {
            dst_scope: dst.scope(),
            dst_label: self.policy.label_of(dst.addr()),
            outgoing: reference.map(Interface::id),
            prefer_temporary: query.hints.prefers_temporary(self.config.prefer_temporary),
        };
        let router = query.route.and_then(|route| self.next_hop_router(route));

        let mut restarts = 0;
        'restart: loop {
            let mut guard = self.addresses.read();
            let generation = guard.generation();
            let mut best: Option<Best> = None;

            let mut index = 0;
            while let Some(candidate) = guard.get(index).cloned() {
                index += 1;

                if let Err(reason) = eligibility.check(&candidate) {
                    decision!(debug, candidate = %candidate, %reason, "candidate skipped");
                    self.metrics.record_skip(reason);
                    continue;
                }

                // Rule 1
                if candidate.addr() == dst.addr() {
                    decision!(
                        debug,
                        candidate = %candidate,
                        rule = %Rule::SameAddress,
                        "candidate is the destination"
                    );
                    best = Some(Best {
                        facts: Facts::of(&candidate, &dst, &self.policy, now),
                        address: candidate,
                        rule: Rule::SameAddress,
                    });
                    break;
                }

                if let Err(reason) = eligibility.check_expensive(&candidate) {
                    decision!(debug, candidate = %candidate, %reason, "candidate skipped");
                    self.metrics.record_skip(reason);
                    continue;
                }

                let facts = Facts::of(&candidate, &dst, &self.policy, now);

                // Rule 0
                let Some(incumbent) = &best else {
                    decision!(
                        debug,
                        candidate = %candidate,
                        rule = %Rule::First,
                        "first eligible candidate"
                    );
                    best = Some(Best {
                        address: candidate,
                        facts,
                        rule: Rule::First,
                    });
                    continue;
                };

                let verdict = match leading(&incumbent.facts, &facts, &ladder) {
                    Some(verdict) => verdict,
                    None => {
                        let by_router = match &router {
                            Some(router) => {
                                let best_prefix = incumbent.address.prefix();
                                let candidate_prefix = candidate.prefix();
                                let (best_has, candidate_has) = guard.unlocked(|| {
                                    (
                                        self.routers.prefix_has_router(&best_prefix, router),
                                        self.routers.prefix_has_router(&candidate_prefix, router),
                                    )
                                });
                                if guard.generation() != generation {
                                    restarts += 1;
                                    self.metrics.inc_restarts();
                                    decision!(
                                        debug,
                                        destination = %dst,
                                        restarts,
                                        "address list changed, restarting scan"
                                    );
                                    continue 'restart;
                                }
                                next_hop_prefix(best_has, candidate_has)
                            }
                            None => None,
                        };
                        by_router.unwrap_or_else(|| trailing(&incumbent.facts, &facts, &ladder))
                    }
                };

                match verdict {
                    Verdict::Keep(rule) => {
                        decision!(
                            debug,
                            candidate = %candidate,
                            incumbent = %incumbent.address,
                            %rule,
                            "incumbent kept"
                        );
                    }
                    Verdict::Replace(rule) => {
                        decision!(
                            debug,
                            candidate = %candidate,
                            incumbent = %incumbent.address,
                            %rule,
                            "incumbent replaced"
                        );
                        best = Some(Best {
                            address: candidate,
                            facts,
                            rule,
                        });
                    }
                    Verdict::Stop(rule) => {
                        decision!(debug, candidate = %candidate, %rule, "scan stopped");
                        best = Some(Best {
                            address: candidate,
                            facts,
                            rule,
                        });
                        break;
                    }
                }
            }
            drop(guard);

            let Some(best) = best else {
                decision!(debug, destination = %dst, restarts, "no eligible source address");
                return Err(SelectError::AddressNotAvailable);
            };
            self.metrics.record_decision(best.rule);
            decision!(
                debug,
                destination = %dst,
                source = %best.address,
                rule = %best.rule,
                scope = %best.facts.scope,
                label = %best.facts.label,
                restarts,
                "source address selected"
            );
            return Ok(ScoredSource {
                address: best.address,
                rule: best.rule,
                restarts,
            });
        }
    }

    /// The default router the route forwards through, if any.
    fn next_hop_router(&self, route: &Route) -> Option<Ipv6Addr> {
        if !self.config.nexthop_prefix_rule || !route.flags().contains(RouteFlags::GATEWAY) {
            return None;
        }
        let gateway = route.gateway()?;
        self.routers.lookup_default_router(gateway, route.interface().id())
    }
}
