use super::super::event::Consumer;
use super::Request;
use super::ResponsePublisher;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use thiserror::Error;

/// Error that may be thrown while responding to a request
#[derive(Error, Debug)]
pub enum ResponderError {
    /// The [`RequestProcessor`] threw an error
    #[error("processing request failed")]
    ProcessingFailed(#[source] BoxedError),
    /// Unable to deliver the response
    #[error("sending response failed")]
    ResponseUndeliverable(#[source] BoxedError),
}

/// Structure which processes requests and produces responses
///
/// Subject specific failures should be encoded in the response type. An `Err(_)`
/// is reserved for system failures and results in no response being sent at all.
#[async_trait]
pub trait RequestProcessor {
    /// Type of request to process
    type Request: Request;

    /// Handler for requests, returning a response
    async fn process(
        &self,
        request: Self::Request,
    ) -> Result<<Self::Request as Request>::Response, BoxedError>;
}

/// Convenience wrapper to process requests and send responses
pub struct Responder<C, P> {
    processor: C,
    publisher: P,
}

impl<C, P> Responder<C, P>
where
    C: RequestProcessor,
    P: ResponsePublisher,
{
    /// Creates a new responder from raw parts
    pub fn new(processor: C, publisher: P) -> Self {
        Self {
            processor,
            publisher,
        }
    }
}

#[async_trait]
impl<C, P> Consumer for Responder<C, P>
where
    C: RequestProcessor + Send + Sync,
    C::Request: Send + Sync,
    <C::Request as Request>::Response: Send + Sync,
    P: ResponsePublisher + Send + Sync,
{
    type Notification = C::Request;

    async fn consume(&self, request: Self::Notification) -> EmptyResult {
        let location = request.reply_to();

        let response = self
            .processor
            .process(request)
            .await
            .map_err(ResponderError::ProcessingFailed)?;

        self.publisher
            .publish(&response, location)
            .await
            .map_err(ResponderError::ResponseUndeliverable)?;

        Ok(())
    }
}
