use super::LocalCoordinator;
use crate::domain::{Proposal, ProposalResponse, Unproposal};
use crate::library::communication::event::{Consumer, ConsumerExt, QueueProvider};
use crate::library::communication::request::{RequestProcessor, Responder, ResponsePublisher};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Answers proposals received over the transport using the authoritative coordinator
pub struct ProposalProcessor {
    coordinator: Arc<LocalCoordinator>,
}

impl ProposalProcessor {
    /// Creates a new processor deciding with the given coordinator
    pub fn new(coordinator: Arc<LocalCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl RequestProcessor for ProposalProcessor {
    type Request = Proposal;

    #[instrument(skip(self), fields(group_id = %proposal.group_id, requester = %proposal.requester_node))]
    async fn process(&self, proposal: Proposal) -> Result<ProposalResponse, BoxedError> {
        if !proposal.is_valid() {
            warn!(route = %proposal.proposed_route, "Received malformed proposal");
        }

        let outcome = self
            .coordinator
            .bind(&proposal.group_id, &proposal.proposed_route);

        debug!(?outcome, "Answering proposal");

        Ok(ProposalResponse {
            correlation_id: proposal.correlation_id,
            outcome,
        })
    }
}

/// Releases bindings on behalf of unproposals received over the transport
pub struct UnproposalConsumer {
    coordinator: Arc<LocalCoordinator>,
}

impl UnproposalConsumer {
    /// Creates a new consumer releasing bindings of the given coordinator
    pub fn new(coordinator: Arc<LocalCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl Consumer for UnproposalConsumer {
    type Notification = Unproposal;

    async fn consume(&self, unproposal: Unproposal) -> EmptyResult {
        debug!(
            group_id = %unproposal.group_id,
            route = %unproposal.route,
            requester = %unproposal.requester_node,
            "Received unproposal"
        );

        self.coordinator
            .release(&unproposal.group_id, &unproposal.route);

        Ok(())
    }
}

/// Serves proposals and unproposals addressed to the given address until the transport stops
pub async fn serve_proposals<T>(
    coordinator: Arc<LocalCoordinator>,
    transport: T,
    address: &str,
) -> EmptyResult
where
    T: QueueProvider + ResponsePublisher + Clone + Send + Sync + 'static,
{
    let extension = Some(address.to_owned());
    let proposals = Responder::new(ProposalProcessor::new(coordinator.clone()), transport.clone());
    let unproposals = UnproposalConsumer::new(coordinator);

    futures::try_join!(
        proposals.consume_queue(transport.clone(), &extension),
        unproposals.consume_queue(transport, &extension)
    )?;

    Ok(())
}

/// Job serving proposals for an authoritative coordinator
pub struct ProposalResponderJob<T> {
    coordinator: Arc<LocalCoordinator>,
    transport: T,
    address: String,
}

impl<T> ProposalResponderJob<T> {
    /// Creates a new job answering proposals sent to the given address
    pub fn new(coordinator: Arc<LocalCoordinator>, transport: T, address: String) -> Self {
        Self {
            coordinator,
            transport,
            address,
        }
    }
}

#[async_trait]
impl<T> Job for ProposalResponderJob<T>
where
    T: QueueProvider + ResponsePublisher + Clone + Send + Sync + 'static,
{
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = true;

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let serving = serve_proposals(
            self.coordinator.clone(),
            self.transport.clone(),
            &self.address,
        );

        manager.ready().await;
        info!(address = %self.address, "Serving proposals");

        tokio::select! {
            result = serving => result,
            _ = manager.termination_signal() => Ok(()),
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::coordinator::{GroupingHandler, RemoteCoordinator};
    use crate::domain::{
        GroupingHandlerConfiguration, HandlerType, ProposalOutcome, RejectionReason,
    };
    use crate::library::communication::implementation::memory::MemoryTransport;
    use crate::library::communication::request::CompositeRequestor;
    use std::time::Duration;
    use tokio::time::sleep;

    type MemoryRemote =
        RemoteCoordinator<CompositeRequestor<MemoryTransport, MemoryTransport>, MemoryTransport>;

    fn configuration(name: &str, handler_type: HandlerType) -> Arc<GroupingHandlerConfiguration> {
        Arc::new(
            GroupingHandlerConfiguration::with_timing(
                name,
                handler_type,
                Some("authority".into()),
                Duration::from_secs(2),
                Duration::from_secs(60),
                Duration::from_secs(30),
            )
            .unwrap(),
        )
    }

    fn remote(name: &str, transport: &MemoryTransport) -> MemoryRemote {
        let requestor = CompositeRequestor::with_extension(
            transport.clone(),
            transport.clone(),
            "authority".into(),
        );

        RemoteCoordinator::new(
            configuration(name, HandlerType::Remote),
            requestor,
            transport.clone(),
        )
        .unwrap()
    }

    fn authority(transport: &MemoryTransport) -> Arc<LocalCoordinator> {
        let coordinator = Arc::new(LocalCoordinator::new(configuration(
            "authority",
            HandlerType::Local,
        )));

        tokio::spawn(serve_proposals(
            coordinator.clone(),
            transport.clone(),
            "authority",
        ));

        coordinator
    }

    #[tokio::test]
    async fn answer_proposals_directly() {
        let coordinator = Arc::new(LocalCoordinator::new(configuration(
            "authority",
            HandlerType::Local,
        )));
        let processor = ProposalProcessor::new(coordinator);
        let proposal = Proposal::new("order-42", "consumerA", "node-1");

        let response = processor.process(proposal.clone()).await.unwrap();

        assert_eq!(response.correlation_id, proposal.correlation_id);
        assert_eq!(response.outcome, ProposalOutcome::Accepted("consumerA".into()));
    }

    #[tokio::test]
    async fn refuse_malformed_proposals() {
        let coordinator = Arc::new(LocalCoordinator::new(configuration(
            "authority",
            HandlerType::Local,
        )));
        let processor = ProposalProcessor::new(coordinator.clone());

        let response = processor
            .process(Proposal::new("order-42", "", "node-1"))
            .await
            .unwrap();

        assert_eq!(
            response.outcome,
            ProposalOutcome::Rejected(RejectionReason::InvalidProposal)
        );
        assert!(coordinator.is_empty());
    }

    #[tokio::test]
    async fn decide_for_all_nodes() {
        let transport = MemoryTransport::new();
        let authority = authority(&transport);
        let first = remote("node-1", &transport);
        let second = remote("node-2", &transport);

        assert_eq!(
            first.propose("order-42", "consumerA").await,
            ProposalOutcome::Accepted("consumerA".into())
        );
        assert_eq!(
            second.propose("order-42", "consumerB").await,
            ProposalOutcome::Accepted("consumerA".into())
        );
        assert_eq!(
            authority.lookup("order-42").map(|b| b.route().to_owned()),
            Some("consumerA".into())
        );
    }

    #[tokio::test]
    async fn release_bindings_for_remote_nodes() {
        let transport = MemoryTransport::new();
        let authority = authority(&transport);
        let node = remote("node-1", &transport);

        node.propose("order-42", "consumerA").await;
        assert!(node.release("order-42", "consumerA").await.unwrap());

        for _ in 0..100 {
            if authority.lookup("order-42").is_none() {
                break;
            }

            sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(authority.lookup("order-42"), None);
        assert_eq!(
            node.propose("order-42", "consumerB").await,
            ProposalOutcome::Accepted("consumerB".into())
        );
    }
}
