//! Trait implementations using [`redis`](::redis)
//!
//! Notifications are appended to [Redis Lists](https://redis.io/topics/data-types#lists) which are
//! trimmed to the queue limit. Responses use separate lists which expire if nobody collects them.

const RESPONSE_KEY_PREFIX: &str = "response.";
const RESPONSE_EXPIRY_SECS: usize = 60;

mod collector;
mod publisher;
mod queue_provider;

use super::json::JsonTransport;
use redis::aio::{Connection, MultiplexedConnection};
use redis::{Client, RedisResult};

/// Multi-purpose transport using a redis server
///
/// Regular commands share one multiplexed connection while every blocking
/// operation (collecting responses, consuming queues) opens a dedicated one.
#[derive(Clone)]
pub struct RedisTransport {
    client: Client,
    shared: MultiplexedConnection,
}

impl RedisTransport {
    /// Connects to the redis server at the given url
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let shared = client.get_multiplexed_tokio_connection().await?;

        Ok(Self { client, shared })
    }

    fn shared(&self) -> MultiplexedConnection {
        self.shared.clone()
    }

    async fn dedicated(&self) -> RedisResult<Connection> {
        self.client.get_async_connection().await
    }
}

impl JsonTransport for RedisTransport {}
