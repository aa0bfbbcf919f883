use super::{QueueDescriptor, QueueDescriptorExtension, QueueEntry};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Allows consumption of notification queues
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned by the provider
    type Entry: QueueEntry + Send + Sync;

    /// Streams entries from a given queue, removing them from the queue as they are yielded.
    ///
    /// Every entry is delivered to exactly one consumer of the queue. The stream does not end
    /// on its own while the queue exists.
    async fn consume(
        &self,
        queue: QueueDescriptor,
        extension: &Option<QueueDescriptorExtension>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError>;
}
