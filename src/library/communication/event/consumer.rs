use super::Notification;
use super::QueueDescriptorExtension;
use super::{QueueEntry, QueueProvider};
use crate::library::EmptyResult;
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::any::type_name;
use tracing::warn;

const DEFAULT_CONCURRENCY: usize = 16;

/// Entity which may consume and process [`Notifications`](Notification)
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: Notification;

    /// Processes an event notification and returns whether it succeeded or failed
    async fn consume(&self, notification: Self::Notification) -> EmptyResult;
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Consumes notifications from a queue using the given provider until the queue stream ends.
    ///
    /// Failures to receive, parse or process individual notifications are logged and skipped.
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        extension: &Option<QueueDescriptorExtension>,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync,
    C::Notification: DeserializeOwned + Send + Sync,
{
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        extension: &Option<QueueDescriptorExtension>,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync,
    {
        let stream = provider
            .consume(C::Notification::queue(), extension)
            .await?;

        stream
            .for_each_concurrent(Some(DEFAULT_CONCURRENCY), |item| async move {
                let notification = type_name::<C::Notification>();

                match item {
                    Ok(entry) => match entry.parse_payload::<C::Notification>() {
                        Ok(parsed) => {
                            if let Err(error) = self.consume(parsed).await {
                                warn!(notification, ?error, "Failed to consume notification");
                            }
                        }
                        Err(error) => {
                            warn!(notification, ?error, "Failed to deserialize notification")
                        }
                    },
                    Err(error) => warn!(notification, ?error, "Failed to receive notification"),
                }
            })
            .await;

        Ok(())
    }
}
