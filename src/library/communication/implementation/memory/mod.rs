//! Trait implementations for components that live in the same process
//!
//! Queues and response locations are plain in-memory lists which are created on first use.
//! This allows running a full request/response exchange without any network hop which
//! is used when the authoritative node and the requesting node share a process.

use super::super::event::{
    ListEntry, QueueDescriptor, QueueDescriptorExtension, QueueProvider, RawNotificationPublisher,
};
use super::super::request::{
    RawResponseCollector, RawResponsePublisher, ResponseCollectionTimeout, ResponseLocation,
};
use super::json::JsonTransport;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Instant};
use tracing::trace;

const RESPONSE_KEY_PREFIX: &str = "response.";

#[derive(Default)]
struct MemoryList {
    items: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl MemoryList {
    async fn push(&self, data: Vec<u8>, limit: Option<usize>) {
        let mut items = self.items.lock().await;
        items.push_back(data);

        if let Some(limit) = limit {
            while items.len() > limit {
                items.pop_front();
            }
        }

        drop(items);
        self.notify.notify_one();
    }

    /// Pops the first item, waiting for one to arrive until the optional deadline is reached
    async fn pop(&self, deadline: Option<Instant>) -> Option<Vec<u8>> {
        loop {
            if let Some(item) = self.items.lock().await.pop_front() {
                return Some(item);
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, self.notify.notified()).await.is_err() {
                        return None;
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

/// In-process transport providing all raw communication traits
///
/// Cloning the transport yields a handle to the same set of lists.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    lists: Arc<Mutex<HashMap<String, Arc<MemoryList>>>>,
    published: Arc<AtomicUsize>,
}

impl MemoryTransport {
    /// Creates a new, empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications (including requests) published through this transport
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Number of entries currently waiting in the given queue
    pub async fn pending(&self, queue: &QueueDescriptor, extension: Option<&str>) -> usize {
        let key = queue.resolve(extension);
        let list = self.lists.lock().await.get(&key).cloned();

        match list {
            Some(list) => list.len().await,
            None => 0,
        }
    }

    async fn list(&self, key: &str) -> Arc<MemoryList> {
        self.lists
            .lock()
            .await
            .entry(key.to_owned())
            .or_default()
            .clone()
    }

    async fn discard(&self, key: &str) {
        self.lists.lock().await.remove(key);
    }
}

#[async_trait]
impl RawNotificationPublisher for MemoryTransport {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: QueueDescriptor,
        extension: Option<QueueDescriptorExtension>,
    ) -> EmptyResult {
        let key = descriptor.resolve(extension.as_deref());
        trace!(%key, "Publishing notification");

        self.list(&key)
            .await
            .push(data.to_vec(), Some(descriptor.limit()))
            .await;
        self.published.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}

#[async_trait]
impl RawResponsePublisher for MemoryTransport {
    async fn publish_raw(&self, data: &[u8], location: ResponseLocation) -> EmptyResult {
        let key = format!("{}{}", RESPONSE_KEY_PREFIX, location);
        trace!(%key, "Publishing response");

        self.list(&key).await.push(data.to_vec(), None).await;

        Ok(())
    }
}

/// State carried between items of a response collection stream
struct Collection {
    transport: MemoryTransport,
    list: Arc<MemoryList>,
    key: String,
    remaining: Option<usize>,
    deadline: Option<Instant>,
}

#[async_trait]
impl RawResponseCollector for MemoryTransport {
    async fn collect_raw(
        &self,
        location: ResponseLocation,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, BoxedError>>, BoxedError> {
        let key = format!("{}{}", RESPONSE_KEY_PREFIX, location);
        let collection = Collection {
            transport: self.clone(),
            list: self.list(&key).await,
            key,
            remaining: limit,
            deadline: timeout.duration().map(|duration| Instant::now() + duration),
        };

        let stream = stream::unfold(collection, |mut collection| async move {
            if collection.remaining == Some(0) {
                collection.transport.discard(&collection.key).await;
                return None;
            }

            match collection.list.pop(collection.deadline).await {
                Some(response) => {
                    collection.remaining = collection.remaining.map(|r| r - 1);
                    Some((Ok(response), collection))
                }
                None => {
                    collection.transport.discard(&collection.key).await;
                    None
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[async_trait]
impl QueueProvider for MemoryTransport {
    type Entry = ListEntry;

    async fn consume(
        &self,
        queue: QueueDescriptor,
        extension: &Option<QueueDescriptorExtension>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let list = self.list(&queue.resolve(extension.as_deref())).await;

        let stream = stream::unfold(list, |list| async move {
            list.pop(None)
                .await
                .map(|payload| (Ok(ListEntry::new(payload)), list))
        });

        Ok(stream.boxed())
    }
}

impl JsonTransport for MemoryTransport {}

#[cfg(test)]
mod does {
    use super::*;
    use crate::library::communication::event::{
        Notification, NotificationPublisher, QueueEntry,
    };
    use crate::library::communication::request::{
        CompositeRequestor, Request, Requestor, ResponsePublisher,
    };
    use futures::TryStreamExt;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
    struct EchoResponse(usize);

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct EchoRequest(usize);

    impl Notification for EchoRequest {
        fn queue() -> QueueDescriptor {
            QueueDescriptor::new("echo".into(), 2)
        }
    }

    impl Request for EchoRequest {
        type Response = EchoResponse;

        fn reply_to(&self) -> ResponseLocation {
            format!("echo.{}", self.0)
        }
    }

    #[tokio::test]
    async fn deliver_notifications_in_order() {
        let transport = MemoryTransport::new();
        NotificationPublisher::publish(&transport, &EchoRequest(1))
            .await
            .unwrap();
        NotificationPublisher::publish(&transport, &EchoRequest(2))
            .await
            .unwrap();

        let entries: Vec<EchoRequest> = transport
            .consume(EchoRequest::queue(), &None)
            .await
            .unwrap()
            .take(2)
            .map(|entry| entry.unwrap().parse_payload().unwrap())
            .collect()
            .await;

        assert_eq!(entries, vec![EchoRequest(1), EchoRequest(2)]);
        assert_eq!(transport.published_count(), 2);
    }

    #[tokio::test]
    async fn separate_extended_queues() {
        let transport = MemoryTransport::new();
        transport
            .publish_with_extension(&EchoRequest(1), "node-a".into())
            .await
            .unwrap();

        let queue = EchoRequest::queue();
        assert_eq!(transport.pending(&queue, Some("node-a")).await, 1);
        assert_eq!(transport.pending(&queue, Some("node-b")).await, 0);
        assert_eq!(transport.pending(&queue, None).await, 0);
    }

    #[tokio::test]
    async fn evict_beyond_queue_limit() {
        let transport = MemoryTransport::new();

        for i in 0..5 {
            NotificationPublisher::publish(&transport, &EchoRequest(i))
                .await
                .unwrap();
        }

        assert_eq!(transport.pending(&EchoRequest::queue(), None).await, 2);
    }

    #[tokio::test]
    async fn fulfill_requests() {
        let transport = MemoryTransport::new();
        let requestor = CompositeRequestor::new(transport.clone(), transport.clone());

        // Answer before the request is even sent, responses are retained until collected
        ResponsePublisher::publish(&transport, &EchoResponse(42), "echo.42".into())
            .await
            .unwrap();

        let responses = requestor
            .request(
                &EchoRequest(42),
                Some(1),
                ResponseCollectionTimeout::TotalDuration(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        assert_eq!(responses, vec![EchoResponse(42)]);
    }

    #[tokio::test]
    async fn stop_collecting_at_deadline() {
        tokio::time::pause();

        let transport = MemoryTransport::new();
        let responses: Vec<Vec<u8>> = transport
            .collect_raw(
                "nobody".into(),
                Some(1),
                ResponseCollectionTimeout::TotalDuration(Duration::from_millis(500)),
            )
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert!(responses.is_empty());
    }
}
