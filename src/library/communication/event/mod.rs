//! Structures to send notifications between nodes
//!
//! A [`Notification`] describes something that happened on one node and that another
//! node should act upon. Every notification type is bound to a [`Queue`](QueueDescriptor)
//! on which it is published and from which it is consumed. Since a cluster usually contains
//! more than one consuming node, queues can be specialised with a [`QueueDescriptorExtension`]
//! (e.g. the address of the node that should consume them).
//!
//! Notifications are consumed by implementations of the [`Consumer`] trait which are fed
//! from a [`QueueProvider`]. Delivery is best-effort: a notification may get lost and
//! senders that care have to retry.

mod consumer;
mod notification;
mod publisher;
mod queue;
mod queue_provider;

pub use consumer::*;
pub use notification::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
