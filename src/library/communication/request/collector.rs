use super::ResponseLocation;
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;

use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout structure for response collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCollectionTimeout {
    /// Block until the provided limit is reached
    None,
    /// Wait at most for the given duration or until the limit is reached
    TotalDuration(Duration),
}

impl ResponseCollectionTimeout {
    /// Duration after which the collection ends, if any
    pub fn duration(&self) -> Option<Duration> {
        match self {
            ResponseCollectionTimeout::None => None,
            ResponseCollectionTimeout::TotalDuration(duration) => Some(*duration),
        }
    }
}

/// Structure to wait for and collect one or more raw responses
#[async_trait]
pub trait RawResponseCollector {
    /// Streams one or more raw responses until the given timeout or limit is reached
    async fn collect_raw(
        &self,
        location: ResponseLocation,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError>;
}

/// Collector of typed responses to [`Requests`](super::Request)
#[async_trait]
pub trait ResponseCollector {
    /// Streams one or more deserialized responses until the given timeout or limit is reached
    async fn collect<R: DeserializeOwned + Send + Sync + 'static>(
        &self,
        location: ResponseLocation,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<BoxStream<'static, Result<R, BoxedError>>, BoxedError>;
}
