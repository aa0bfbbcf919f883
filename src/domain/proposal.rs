use super::{GroupId, RouteId};
use crate::library::communication::event::{Notification, QueueDescriptor};
use crate::library::communication::request::{Request, ResponseLocation};
use crate::library::communication::BlackboxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const PROPOSAL_QUEUE: &str = "grouping.proposal";
const UNPROPOSAL_QUEUE: &str = "grouping.unproposal";
const QUEUE_LIMIT: usize = 100_000;

/// Reason why a proposal did not result in a binding
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Group id or route is empty
    #[error("proposal is malformed")]
    InvalidProposal,
    /// Authoritative node did not answer within the response timeout
    #[error("authoritative node did not respond in time")]
    Timeout,
    /// Coordinator has been shut down while or before the proposal was processed
    #[error("coordinator is shutting down")]
    ShuttingDown,
    /// Proposal could not be delivered or its response could not be received
    #[error("transport failed")]
    TransportFailure(#[source] BlackboxError),
}

/// Result of proposing a route for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalOutcome {
    /// Group is bound to the contained route which is not necessarily the proposed one
    Accepted(RouteId),
    /// No binding is available right now
    Rejected(RejectionReason),
}

impl ProposalOutcome {
    /// Route the group is bound to, if the proposal has been accepted
    pub fn route(&self) -> Option<&str> {
        match self {
            ProposalOutcome::Accepted(route) => Some(route),
            ProposalOutcome::Rejected(_) => None,
        }
    }

    /// Whether the proposal resulted in a binding
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProposalOutcome::Accepted(_))
    }

    /// Reason for the rejection, if the proposal has been rejected
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            ProposalOutcome::Accepted(_) => None,
            ProposalOutcome::Rejected(reason) => Some(reason),
        }
    }
}

/// Whether a group id and route may form a binding, both have to be non-empty
pub fn is_well_formed(group_id: &str, route: &str) -> bool {
    !group_id.is_empty() && !route.is_empty()
}

/// Request to establish or confirm a binding, sent to the authoritative node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Group to bind
    pub group_id: GroupId,
    /// Route the requester would like the group to be bound to
    pub proposed_route: RouteId,
    /// Name of the node sending the proposal
    pub requester_node: String,
    /// Identifier correlating the proposal with its response
    pub correlation_id: Uuid,
}

impl Proposal {
    /// Creates a new proposal with a random correlation id
    pub fn new(
        group_id: impl Into<GroupId>,
        proposed_route: impl Into<RouteId>,
        requester_node: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            proposed_route: proposed_route.into(),
            requester_node: requester_node.into(),
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Whether the proposal carries a group id and a route
    pub fn is_valid(&self) -> bool {
        is_well_formed(&self.group_id, &self.proposed_route)
    }
}

impl Notification for Proposal {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(PROPOSAL_QUEUE.into(), QUEUE_LIMIT)
    }
}

impl Request for Proposal {
    type Response = ProposalResponse;

    fn reply_to(&self) -> ResponseLocation {
        format!("{}.{}", self.requester_node, self.correlation_id)
    }
}

/// Answer of the authoritative node to a [`Proposal`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    /// Correlation id of the proposal this answers
    pub correlation_id: Uuid,
    /// Decision of the authoritative node
    pub outcome: ProposalOutcome,
}

/// Notification asking the authoritative node to release a binding owned by the given route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unproposal {
    /// Group to release
    pub group_id: GroupId,
    /// Route which has to own the group for the release to happen
    pub route: RouteId,
    /// Name of the node sending the unproposal
    pub requester_node: String,
}

impl Notification for Unproposal {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(UNPROPOSAL_QUEUE.into(), QUEUE_LIMIT)
    }
}
