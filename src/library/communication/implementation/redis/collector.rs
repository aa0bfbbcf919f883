use super::super::super::request::{
    RawResponseCollector, ResponseCollectionTimeout, ResponseLocation,
};
use super::{RedisTransport, RESPONSE_KEY_PREFIX};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::Instant;

/// [`ResponseCollector`](super::super::super::request::ResponseCollector) implementation using
/// [`BLPOP`](https://redis.io/commands/blpop) on a dedicated connection
#[async_trait]
impl RawResponseCollector for RedisTransport {
    async fn collect_raw(
        &self,
        location: ResponseLocation,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError> {
        let con = self.dedicated().await?;
        let key = format!("{}{}", RESPONSE_KEY_PREFIX, location);
        let deadline = timeout.duration().map(|duration| Instant::now() + duration);

        let stream = stream::unfold(
            (con, key, limit),
            move |(mut con, key, remaining)| async move {
                if remaining == Some(0) {
                    return None;
                }

                let block_secs = match deadline {
                    Some(deadline) => {
                        blocking_seconds(deadline.saturating_duration_since(Instant::now()))?
                    }
                    None => 0,
                };

                let result = con
                    .blpop::<_, Option<(String, Vec<u8>)>>(&key, block_secs)
                    .await;

                let remaining = remaining.map(|r| r - 1);

                // A timeout while blocking surfaces as `Ok(None)`
                match result {
                    Ok(Some((_, response))) => Some((Ok(response), (con, key, remaining))),
                    Ok(None) => None,
                    Err(e) => Some((Err(e.into()), (con, key, remaining))),
                }
            },
        );

        Ok(stream.boxed())
    }
}

/// Converts the remaining time into the whole seconds `BLPOP` accepts
///
/// Returns `None` once the time is used up as a value of zero would block indefinitely.
fn blocking_seconds(remaining: Duration) -> Option<usize> {
    if remaining.is_zero() {
        return None;
    }

    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    Some(secs.max(1) as usize)
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn round_partial_seconds_up() {
        assert_eq!(blocking_seconds(Duration::from_millis(200)), Some(1));
        assert_eq!(blocking_seconds(Duration::from_millis(1500)), Some(2));
        assert_eq!(blocking_seconds(Duration::from_secs(3)), Some(3));
    }

    #[test]
    fn refuse_exhausted_time() {
        assert_eq!(blocking_seconds(Duration::ZERO), None);
    }
}
