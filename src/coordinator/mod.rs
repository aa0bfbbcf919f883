//! Coordinators deciding which route owns a message group
//!
//! Every broker node runs exactly one coordinator. The node whose handler type is
//! [`Local`](crate::domain::HandlerType::Local) runs a [`LocalCoordinator`] and is the single
//! authority for all bindings in the cluster. All other nodes run a [`RemoteCoordinator`] which
//! forwards proposals to the authority and caches the results. Both present the same
//! [`GroupingHandler`] interface to the routing layer.
//!
//! Idle bindings are evicted by a [`Reaper`] which works on any coordinator implementing
//! [`GroupReaping`].

mod local;
mod reaper;
mod remote;
mod responder;
mod store;

pub use local::*;
pub use reaper::*;
pub use remote::*;
pub use responder::*;
pub use store::*;

use crate::domain::{GroupBinding, GroupingMetrics, ProposalOutcome};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Interface used by the routing layer to keep message groups sticky
#[async_trait]
pub trait GroupingHandler: Send + Sync {
    /// Establishes or confirms the binding of a group, returning the route that owns it
    ///
    /// The returned route may differ from the candidate when another route bound the group first.
    async fn propose(&self, group_id: &str, candidate: &str) -> ProposalOutcome;

    /// Releases the binding of a group if and only if it is currently owned by the given route
    async fn unpropose(&self, group_id: &str, route: &str);

    /// Binding currently known to this handler, without refreshing it
    fn lookup(&self, group_id: &str) -> Option<GroupBinding>;

    /// Counters kept by this handler
    fn metrics(&self) -> &GroupingMetrics;

    /// Releases all pending callers and refuses further proposals
    async fn shutdown(&self) {}
}

/// Coordinator whose bindings can be evicted once they have been idle for too long
pub trait GroupReaping: Send + Sync {
    /// Time after which unused bindings become eligible for eviction
    fn group_timeout(&self) -> Duration;

    /// Bindings that have been idle for longer than the group timeout at the given instant
    fn idle_bindings(&self, now: Instant) -> Vec<GroupBinding>;

    /// Evicts the binding if it is still owned by the route and still idle at the given instant
    ///
    /// Returns whether the binding has been evicted. A binding that has been used or rebound
    /// since it was found idle is left untouched.
    fn on_group_timeout(&self, group_id: &str, route: &str, now: Instant) -> bool;
}
