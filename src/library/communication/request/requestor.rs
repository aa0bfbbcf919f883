use super::super::event::{NotificationPublisher, QueueDescriptorExtension};
use super::ResponseCollectionTimeout;
use super::{Request, ResponseCollector};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::TryStreamExt;
use thiserror::Error;

/// Error type for sending requests
#[derive(Error, Debug)]
pub enum RequestError {
    /// Publishing of the request failed
    #[error("sending of request failed")]
    SendingFailure(#[source] BoxedError),
    /// Response collector was unable to start listening for responses
    #[error("unable to collect responses")]
    ResponseCollectionFailed(#[source] BoxedError),
    /// An individual response could not be received or parsed
    #[error("response not receivable")]
    ReceptionFailed(#[source] BoxedError),
}

/// Handler for sending requests and collecting responses
#[async_trait]
pub trait Requestor {
    /// Sends out a request and awaits responses
    ///
    /// Note that either a `limit` or `timeout` has to be provided. If neither is given, the function would block indefinitely and will panic.
    async fn request<R>(
        &self,
        request: &R,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<Vec<R::Response>, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static;
}

/// [`Requestor`] implementation by combining a [`NotificationPublisher`] and [`ResponseCollector`]
pub struct CompositeRequestor<P: NotificationPublisher, C: ResponseCollector> {
    publisher: P,
    collector: C,
    extension: Option<QueueDescriptorExtension>,
}

impl<P, C> CompositeRequestor<P, C>
where
    P: NotificationPublisher,
    C: ResponseCollector,
{
    /// Creates a new instance from raw parts
    pub fn new(publisher: P, collector: C) -> Self {
        Self {
            publisher,
            collector,
            extension: None,
        }
    }

    /// Creates a new instance which publishes all requests to the queue specialised with the given extension
    pub fn with_extension(publisher: P, collector: C, extension: QueueDescriptorExtension) -> Self {
        Self {
            publisher,
            collector,
            extension: Some(extension),
        }
    }
}

#[async_trait]
impl<P, C> Requestor for CompositeRequestor<P, C>
where
    P: NotificationPublisher + Send + Sync,
    C: ResponseCollector + Send + Sync,
{
    /// Sends a request by delegating to a [`NotificationPublisher`] and collects responses using a [`ResponseCollector`]
    async fn request<R>(
        &self,
        request: &R,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<Vec<R::Response>, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        assert!(
            limit.is_some() || timeout != ResponseCollectionTimeout::None,
            "Calling `request` without a limit or timeout would block indefinitely!"
        );

        // Send the request
        let published = match &self.extension {
            Some(extension) => {
                self.publisher
                    .publish_with_extension(request, extension.clone())
                    .await
            }
            None => self.publisher.publish(request).await,
        };

        published.map_err(RequestError::SendingFailure)?;

        // Create a stream for receiving responses
        let stream = self
            .collector
            .collect::<R::Response>(request.reply_to(), limit, timeout)
            .await
            .map_err(RequestError::ResponseCollectionFailed)?;

        // Condense the stream of responses, a single broken response poisons the whole batch
        let responses = stream
            .try_collect::<Vec<_>>()
            .await
            .map_err(RequestError::ReceptionFailed)?;

        Ok(responses)
    }
}
