use super::ResponseLocation;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::Serialize;

/// Structure which allows publishing of serialized responses
#[async_trait]
pub trait RawResponsePublisher {
    /// Sends an opaque payload to the given [`ResponseLocation`]
    async fn publish_raw(&self, data: &[u8], location: ResponseLocation) -> EmptyResult;
}

/// Publisher for responses to [`Requests`](super::Request)
#[async_trait]
pub trait ResponsePublisher {
    /// Sends a response to the given [`ResponseLocation`]
    async fn publish<R: Send + Sync + Serialize>(
        &self,
        response: &R,
        location: ResponseLocation,
    ) -> EmptyResult;
}
