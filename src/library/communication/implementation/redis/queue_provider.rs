use super::super::super::event::{
    ListEntry, QueueDescriptor, QueueDescriptorExtension, QueueProvider,
};
use super::RedisTransport;
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::error;

const FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Queue provider implementation using a blocking [`BLPOP`](https://redis.io/commands/blpop)
/// on a dedicated connection
#[async_trait]
impl QueueProvider for RedisTransport {
    type Entry = ListEntry;

    async fn consume(
        &self,
        queue: QueueDescriptor,
        extension: &Option<QueueDescriptorExtension>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = queue.resolve(extension.as_deref());
        let con = self.dedicated().await?;

        let stream = stream::unfold((con, key), |(mut con, key)| async move {
            loop {
                match con.blpop::<_, Option<(String, Vec<u8>)>>(&key, 0).await {
                    Ok(Some((_, payload))) => {
                        return Some((Ok(ListEntry::new(payload)), (con, key)));
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        error!(?e, %key, "Failed to read from queue");
                        tokio::time::sleep(FAILURE_BACKOFF).await;
                        return Some((Err(e.into()), (con, key)));
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
