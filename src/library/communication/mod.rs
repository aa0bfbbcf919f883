//! Structures to communicate between nodes of a distributed system
//!
//! There are two modes of operation:
//!
//! 1. Fire and forget notifications
//! 2. Request and response
//!
//! The first is used for messages where the sender does not care about a reply, like
//! telling another node that some state may be dropped. The notification data structure
//! implements the [`Notification`](event::Notification) trait and thus describes on which
//! queue to expect it in a type-safe manner. For more details, consult the [`event`] module.
//!
//! The second mode of operation is request and response. A component sends a request
//! to a queue that some other node consumes and waits for a reply on a location that is
//! unique to the request. This is implemented using the [`Request`](request::Request) trait
//! which builds on the [`Notification`](event::Notification) trait by adding a response channel.
//!
//! Both modes are transport agnostic. The [`implementation`] module provides an in-process
//! transport for components that live in the same process and a Redis based one for when
//! a message has to cross the network.

mod error;

pub mod event;
pub mod implementation;
pub mod request;

pub use error::BlackboxError;
