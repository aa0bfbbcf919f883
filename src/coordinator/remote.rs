use super::{GroupBindingStore, GroupReaping, GroupingHandler};
use crate::domain::{
    is_well_formed, ConfigurationError, Counters, GroupBinding, GroupId,
    GroupingHandlerConfiguration, GroupingMetrics, Proposal, ProposalOutcome, ProposalResponse,
    RejectionReason, Unproposal,
};
use crate::library::communication::event::NotificationPublisher;
use crate::library::communication::request::{RequestError, Requestor, ResponseCollectionTimeout};
use crate::library::communication::BlackboxError;
use crate::library::helpers::Backoff;
use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{error::Elapsed, sleep, timeout, Instant};
use tracing::{debug, instrument, trace, warn};

type SharedOutcome = Shared<BoxFuture<'static, ProposalOutcome>>;
type PendingProposals = Arc<Mutex<HashMap<GroupId, (u64, SharedOutcome)>>>;

/// Coordinator forwarding proposals to the authoritative node
///
/// Accepted bindings are cached locally and served without a network hop until they reach half
/// of the group timeout, after which they are confirmed with the authority again. This keeps
/// bindings that are in active use on this node from being evicted on the authoritative node.
///
/// Concurrent proposals for the same group share one request. Unproposals are delivered in the
/// background and retried with an exponential [`Backoff`].
pub struct RemoteCoordinator<R, P> {
    configuration: Arc<GroupingHandlerConfiguration>,
    address: String,
    requestor: Arc<R>,
    publisher: Arc<P>,
    store: Arc<GroupBindingStore>,
    metrics: Arc<GroupingMetrics>,
    pending: PendingProposals,
    tickets: AtomicU64,
    shutdown: watch::Sender<bool>,
    shutdown_signal: watch::Receiver<bool>,
    retries: Backoff,
}

impl<R, P> RemoteCoordinator<R, P>
where
    R: Requestor + Send + Sync + 'static,
    P: NotificationPublisher + Send + Sync + 'static,
{
    /// Creates a new coordinator talking to the authoritative node named in the configuration
    ///
    /// The requestor is expected to deliver proposals to the queue of that node.
    pub fn new(
        configuration: Arc<GroupingHandlerConfiguration>,
        requestor: R,
        publisher: P,
    ) -> Result<Self, ConfigurationError> {
        let address = configuration
            .address()
            .ok_or(ConfigurationError::MissingAddress)?
            .to_owned();
        let (shutdown, shutdown_signal) = watch::channel(false);

        Ok(Self {
            configuration,
            address,
            requestor: Arc::new(requestor),
            publisher: Arc::new(publisher),
            store: Arc::new(GroupBindingStore::new()),
            metrics: Arc::new(GroupingMetrics::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            tickets: AtomicU64::new(0),
            shutdown,
            shutdown_signal,
            retries: Backoff::default(),
        })
    }

    /// Replaces the retry budget used for delivering unproposals
    pub fn with_retries(mut self, retries: Backoff) -> Self {
        self.retries = retries;
        self
    }

    /// Configuration this coordinator has been created with
    pub fn configuration(&self) -> &GroupingHandlerConfiguration {
        &self.configuration
    }

    /// Age after which a cached binding is confirmed with the authority again
    pub fn refresh_interval(&self) -> Duration {
        self.configuration.group_timeout() / 2
    }

    /// Drops the cached binding if owned by the route and notifies the authority in the background
    ///
    /// The returned handle resolves to whether the authority has been notified. Callers are free
    /// to drop it, delivery failures are logged.
    pub fn release(&self, group_id: &str, route: &str) -> JoinHandle<bool> {
        if self
            .store
            .remove_if(group_id, |binding| binding.route() == route)
            .is_some()
        {
            debug!(group_id, route, "Dropped cached binding");
        }

        let unproposal = Unproposal {
            group_id: group_id.to_owned(),
            route: route.to_owned(),
            requester_node: self.configuration.name().to_owned(),
        };

        tokio::spawn(deliver_unproposal(
            self.publisher.clone(),
            unproposal,
            self.address.clone(),
            self.retries.clone(),
            self.shutdown_signal.clone(),
        ))
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    async fn resolve(&self, group_id: &str, candidate: &str) -> ProposalOutcome {
        if self.is_shut_down() {
            return ProposalOutcome::Rejected(RejectionReason::ShuttingDown);
        }

        if !is_well_formed(group_id, candidate) {
            return ProposalOutcome::Rejected(RejectionReason::InvalidProposal);
        }

        let now = Instant::now();
        let candidate = match self.store.touch(group_id, now) {
            Some(binding) if binding.age(now) < self.refresh_interval() => {
                trace!(group_id, route = binding.route(), "Serving cached binding");
                self.metrics.hit();
                return ProposalOutcome::Accepted(binding.route().to_owned());
            }
            Some(binding) => {
                trace!(group_id, route = binding.route(), "Confirming aged binding");
                self.metrics.miss();
                binding.route().to_owned()
            }
            None => {
                self.metrics.miss();
                candidate.to_owned()
            }
        };

        self.in_flight(group_id, &candidate).await
    }

    /// Returns the outstanding request for the group or sends a new one
    fn in_flight(&self, group_id: &str, candidate: &str) -> SharedOutcome {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((_, outcome)) = pending.get(group_id) {
            trace!(group_id, "Joining in-flight proposal");
            return outcome.clone();
        }

        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let proposal = Proposal::new(group_id, candidate, self.configuration.name());

        // Runs detached so the marker is cleared even when every caller gave up waiting
        let outcome = tokio::spawn(self.round_trip(proposal, ticket))
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    warn!(error = ?e, "Proposal round trip was aborted");
                    ProposalOutcome::Rejected(RejectionReason::ShuttingDown)
                })
            })
            .boxed()
            .shared();

        pending.insert(group_id.to_owned(), (ticket, outcome.clone()));
        outcome
    }

    fn round_trip(&self, proposal: Proposal, ticket: u64) -> BoxFuture<'static, ProposalOutcome> {
        let requestor = self.requestor.clone();
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let pending = self.pending.clone();
        let mut shutdown = self.shutdown_signal.clone();
        let response_timeout = self.configuration.timeout();

        async move {
            debug!(
                group_id = %proposal.group_id,
                route = %proposal.proposed_route,
                correlation_id = %proposal.correlation_id,
                "Sending proposal"
            );

            let request = requestor.request(
                &proposal,
                Some(1),
                ResponseCollectionTimeout::TotalDuration(response_timeout),
            );

            let outcome = tokio::select! {
                result = timeout(response_timeout, request) => interpret(&proposal, result),
                _ = shutdown_requested(&mut shutdown) => {
                    ProposalOutcome::Rejected(RejectionReason::ShuttingDown)
                }
            };

            if let ProposalOutcome::Accepted(route) = &outcome {
                store.replace(GroupBinding::new(proposal.group_id.clone(), route.clone()));
                metrics.put();
            }

            clear_pending(&pending, &proposal.group_id, ticket);

            outcome
        }
        .boxed()
    }
}

fn interpret(
    proposal: &Proposal,
    result: Result<Result<Vec<ProposalResponse>, RequestError>, Elapsed>,
) -> ProposalOutcome {
    let group_id = proposal.group_id.as_str();

    match result {
        Err(_) => {
            warn!(group_id, "Authoritative node did not respond in time");
            ProposalOutcome::Rejected(RejectionReason::Timeout)
        }
        Ok(Err(e)) => {
            warn!(group_id, error = ?e, "Unable to exchange proposal");
            ProposalOutcome::Rejected(RejectionReason::TransportFailure(BlackboxError::new(e)))
        }
        Ok(Ok(responses)) => {
            let response = responses
                .into_iter()
                .find(|response| response.correlation_id == proposal.correlation_id);

            match response {
                Some(response) => response.outcome,
                None => {
                    warn!(group_id, "No matching response received");
                    ProposalOutcome::Rejected(RejectionReason::Timeout)
                }
            }
        }
    }
}

fn clear_pending(pending: &PendingProposals, group_id: &str, ticket: u64) {
    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);

    if matches!(pending.get(group_id), Some((current, _)) if *current == ticket) {
        pending.remove(group_id);
    }
}

/// Resolves once a shutdown has been requested, never resolves if the sender is gone
async fn shutdown_requested(signal: &mut watch::Receiver<bool>) {
    loop {
        let requested = *signal.borrow();

        if requested {
            return;
        }

        if signal.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

#[instrument(skip(publisher, address, retries, shutdown), fields(group_id = %unproposal.group_id, route = %unproposal.route))]
async fn deliver_unproposal<P>(
    publisher: Arc<P>,
    unproposal: Unproposal,
    address: String,
    mut retries: Backoff,
    mut shutdown: watch::Receiver<bool>,
) -> bool
where
    P: NotificationPublisher + Send + Sync,
{
    loop {
        let failure = match publisher
            .publish_with_extension(&unproposal, address.clone())
            .await
        {
            Ok(()) => {
                trace!("Delivered unproposal");
                return true;
            }
            Err(e) => RejectionReason::TransportFailure(BlackboxError::from_boxed(e)),
        };

        match retries.next() {
            Some(delay) => {
                debug!(?delay, ?failure, "Failed to deliver unproposal, retrying");

                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown_requested(&mut shutdown) => {
                        warn!(?failure, "Dropping undelivered unproposal due to shutdown");
                        return false;
                    }
                }
            }
            None => {
                warn!(
                    ?failure,
                    attempts = retries.retries() + 1,
                    "Giving up on delivering unproposal"
                );
                return false;
            }
        }
    }
}

#[async_trait]
impl<R, P> GroupingHandler for RemoteCoordinator<R, P>
where
    R: Requestor + Send + Sync + 'static,
    P: NotificationPublisher + Send + Sync + 'static,
{
    #[instrument(skip(self))]
    async fn propose(&self, group_id: &str, candidate: &str) -> ProposalOutcome {
        let outcome = self.resolve(group_id, candidate).await;
        self.metrics.record_outcome(&outcome);
        outcome
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

    async fn shutdown(&self) {
        debug!("Shutting down, releasing pending proposals");

        self.shutdown.send(true).ok();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<R, P> GroupReaping for RemoteCoordinator<R, P>
where
    R: Send + Sync,
    P: Send + Sync,
{
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
            trace!(group_id, route, "Evicted idle cached binding");
            self.metrics.reaped(1);
        }

        evicted
    }
}
