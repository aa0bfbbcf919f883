//! Structures to send requests and collect their responses

mod collector;
mod publisher;
mod requestor;
mod responder;

pub use collector::*;
pub use publisher::*;
pub use requestor::*;
pub use responder::*;

use super::event::Notification;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Describes a location where a response should be sent to
///
/// References a list data structure on which the requesting node can block and
/// which may hold more than one reply. Responses can only be consumed by one node
/// (usually the requesting one) and the location is cleaned up once it has been drained.
pub type ResponseLocation = String;

/// Query which can be replied to
///
/// Since the response will not be acknowledged, it may get lost and the request
/// can and will get repeated eventually. Processing a request must therefore be idempotent
/// or the response must not matter to the requesting side.
pub trait Request: Notification {
    /// Expected response type
    type Response: Serialize + DeserializeOwned + Debug + PartialEq;

    /// Location where a reply should be sent to
    fn reply_to(&self) -> ResponseLocation;
}
