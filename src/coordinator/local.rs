use super::{GroupBindingStore, GroupReaping, GroupingHandler};
use crate::domain::{
    is_well_formed, Counters, GroupBinding, GroupingHandlerConfiguration, GroupingMetrics,
    ProposalOutcome, RejectionReason,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, trace};

/// Authoritative coordinator deciding bindings in-process
///
/// Proposals converge on whichever route bound the group first. A proposal for a group that is
/// already bound is accepted with the existing route instead of being rejected.
pub struct LocalCoordinator {
    configuration: Arc<GroupingHandlerConfiguration>,
    store: GroupBindingStore,
    metrics: GroupingMetrics,
}

impl LocalCoordinator {
    /// Creates a new coordinator without any bindings
    pub fn new(configuration: Arc<GroupingHandlerConfiguration>) -> Self {
        Self {
            configuration,
            store: GroupBindingStore::new(),
            metrics: GroupingMetrics::new(),
        }
    }

    /// Configuration this coordinator has been created with
    pub fn configuration(&self) -> &GroupingHandlerConfiguration {
        &self.configuration
    }

    /// Synchronous variant of [`GroupingHandler::propose`]
    pub fn bind(&self, group_id: &str, candidate: &str) -> ProposalOutcome {
        let outcome = if !is_well_formed(group_id, candidate) {
            ProposalOutcome::Rejected(RejectionReason::InvalidProposal)
        } else {
            let (binding, inserted) = self.store.bind(group_id, candidate, Instant::now());

            if inserted {
                debug!(group_id, route = binding.route(), "Bound group");
                self.metrics.miss();
                self.metrics.put();
            } else {
                trace!(group_id, route = binding.route(), "Reusing binding");
                self.metrics.hit();
            }

            ProposalOutcome::Accepted(binding.route().to_owned())
        };

        self.metrics.record_outcome(&outcome);
        outcome
    }

    /// Synchronous variant of [`GroupingHandler::unpropose`], returns whether a binding has been removed
    pub fn release(&self, group_id: &str, route: &str) -> bool {
        let released = self
            .store
            .remove_if(group_id, |binding| binding.route() == route)
            .is_some();

        if released {
            debug!(group_id, route, "Released group");
        } else {
            trace!(group_id, route, "Group not owned by route, keeping binding");
        }

        released
    }

    /// Number of bindings currently held
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no group is bound at all
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl GroupingHandler for LocalCoordinator {
    #[instrument(skip(self))]
    async fn propose(&self, group_id: &str, candidate: &str) -> ProposalOutcome {
        self.bind(group_id, candidate)
    }

    #[instrument(skip(self))]
    async fn unpropose(&self, group_id: &str, route: &str) {
        self.release(group_id, route);
    }

    fn lookup(&self, group_id: &str) -> Option<GroupBinding> {
        self.store.lookup(group_id)
    }

    fn metrics(&self) -> &GroupingMetrics {
        &self.metrics
    }
}

impl GroupReaping for LocalCoordinator {
    fn group_timeout(&self) -> Duration {
        self.configuration.group_timeout()
    }

    fn idle_bindings(&self, now: Instant) -> Vec<GroupBinding> {
        self.store.idle(now, self.group_timeout())
    }

    fn on_group_timeout(&self, group_id: &str, route: &str, now: Instant) -> bool {
        let timeout = self.group_timeout();
        let evicted = self
            .store
            .remove_if(group_id, |binding| {
                binding.route() == route && binding.is_idle(now, timeout)
            })
            .is_some();

        if evicted {
            debug!(group_id, route, "Evicted idle group");
            self.metrics.reaped(1);
        }

        evicted
    }
}
