//! JSON wire format shared by all byte-oriented transports
//!
//! Transports only move opaque byte buffers around. By implementing [`JsonTransport`] a
//! transport receives the typed [`NotificationPublisher`], [`ResponsePublisher`] and
//! [`ResponseCollector`] traits, with every message travelling as a [`serde_json`] document.
//! Queue entries are decoded the same way through [`QueueEntry`].

use super::super::event::{
    ListEntry, Notification, NotificationPublisher, QueueDescriptorExtension, QueueEntry,
    RawNotificationPublisher, RawQueueEntry,
};
use super::super::request::{
    RawResponseCollector, RawResponsePublisher, ResponseCollectionTimeout, ResponseCollector,
    ResponseLocation, ResponsePublisher,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use thiserror::Error;

/// Failure to translate between a message and its wire representation
#[derive(Error, Debug)]
pub enum CodecError {
    /// Message could not be serialized
    #[error("unable to encode {message_type}")]
    Encoding {
        /// Rust type of the message
        message_type: &'static str,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },
    /// Payload does not contain a valid document of the expected type
    #[error("unable to decode {message_type} from {length} bytes")]
    Decoding {
        /// Rust type the payload has been decoded into
        message_type: &'static str,
        /// Size of the rejected payload
        length: usize,
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },
}

/// Serializes a message into its wire representation
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(message).map_err(|source| CodecError::Encoding {
        message_type: type_name::<T>(),
        source,
    })
}

/// Parses a message from its wire representation
pub fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, CodecError> {
    serde_json::from_slice(payload).map_err(|source| CodecError::Decoding {
        message_type: type_name::<T>(),
        length: payload.len(),
        source,
    })
}

/// Byte-oriented transport exchanging all messages as JSON documents
pub trait JsonTransport:
    RawNotificationPublisher + RawResponsePublisher + RawResponseCollector + Send + Sync
{
}

#[async_trait]
impl<T> NotificationPublisher for T
where
    T: JsonTransport,
{
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult {
        RawNotificationPublisher::publish_raw(self, &encode(notification)?, N::queue(), None).await
    }

    async fn publish_with_extension<N: Notification + Send + Sync>(
        &self,
        notification: &N,
        extension: QueueDescriptorExtension,
    ) -> EmptyResult {
        let payload = encode(notification)?;
        RawNotificationPublisher::publish_raw(self, &payload, N::queue(), Some(extension)).await
    }
}

#[async_trait]
impl<T> ResponsePublisher for T
where
    T: JsonTransport,
{
    async fn publish<R: Send + Sync + Serialize>(
        &self,
        response: &R,
        location: ResponseLocation,
    ) -> EmptyResult {
        RawResponsePublisher::publish_raw(self, &encode(response)?, location).await
    }
}

#[async_trait]
impl<T> ResponseCollector for T
where
    T: JsonTransport,
{
    async fn collect<R: DeserializeOwned + Send + Sync + 'static>(
        &self,
        location: ResponseLocation,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<BoxStream<'static, Result<R, BoxedError>>, BoxedError> {
        let responses = self.collect_raw(location, limit, timeout).await?;

        Ok(responses
            .and_then(|payload| async move { decode(&payload).map_err(Into::into) })
            .boxed())
    }
}

impl QueueEntry for ListEntry {
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>,
    {
        decode(self.payload()).map_err(Into::into)
    }
}

#[cfg(test)]
mod does {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Ping {
        sequence: usize,
    }

    #[test]
    fn name_the_expected_type_on_decoding_failure() {
        let error = decode::<Ping>(b"{\"sequence\":").unwrap_err();

        assert!(matches!(error, CodecError::Decoding { length: 12, .. }));
        assert!(error.to_string().contains("Ping"));
    }

    #[test]
    fn decode_list_entries() {
        let entry = ListEntry::new(encode(&Ping { sequence: 7 }).unwrap());
        let ping: Ping = entry.parse_payload().unwrap();

        assert_eq!(ping, Ping { sequence: 7 });
    }
}
