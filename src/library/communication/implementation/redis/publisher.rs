use super::super::super::event::{
    QueueDescriptor, QueueDescriptorExtension, RawNotificationPublisher,
};
use super::super::super::request::{RawResponsePublisher, ResponseLocation};
use super::{RedisTransport, RESPONSE_EXPIRY_SECS, RESPONSE_KEY_PREFIX};
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::convert::TryInto;

/// [`NotificationPublisher`](super::super::super::event::NotificationPublisher) implementation using
/// [`RPUSH`](https://redis.io/commands/rpush) followed by [`LTRIM`](https://redis.io/commands/ltrim)
#[async_trait]
impl RawNotificationPublisher for RedisTransport {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: QueueDescriptor,
        extension: Option<QueueDescriptorExtension>,
    ) -> EmptyResult {
        let key = descriptor.resolve(extension.as_deref());
        let limit: isize = descriptor.limit().try_into().unwrap_or(isize::MAX);
        let mut con = self.shared();

        redis::pipe()
            .atomic()
            .rpush(&key, data)
            .ignore()
            .ltrim(&key, -limit, -1)
            .ignore()
            .query_async::<_, ()>(&mut con)
            .await?;

        Ok(())
    }
}

/// [`ResponsePublisher`](super::super::super::request::ResponsePublisher) implementation using
/// [`RPUSH`](https://redis.io/commands/rpush) on a list that expires when not collected
#[async_trait]
impl RawResponsePublisher for RedisTransport {
    async fn publish_raw(&self, data: &[u8], location: ResponseLocation) -> EmptyResult {
        let key = format!("{}{}", RESPONSE_KEY_PREFIX, location);
        let mut con = self.shared();

        redis::pipe()
            .atomic()
            .rpush(&key, data)
            .ignore()
            .expire(&key, RESPONSE_EXPIRY_SECS)
            .ignore()
            .query_async::<_, ()>(&mut con)
            .await?;

        Ok(())
    }
}
