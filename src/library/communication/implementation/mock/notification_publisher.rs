use crate::library::communication::event::{
    Notification, NotificationPublisher, QueueDescriptorExtension,
};
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Publisher recording every notification, optionally failing a number of attempts first
#[derive(Default)]
pub struct MockNotificationPublisher {
    failures: AtomicUsize,
    attempts: AtomicUsize,
    published: Mutex<Vec<(String, Value)>>,
}

impl MockNotificationPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Rejects the first `failures` publishing attempts
    pub fn failing(failures: usize) -> Arc<Self> {
        let publisher = Self::default();
        publisher.failures.store(failures, Ordering::SeqCst);
        Arc::new(publisher)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Queue keys and serialized notifications in publishing order
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }

    fn record<N: Notification>(&self, notification: &N, key: String) -> EmptyResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if failed {
            return Err("mocked publishing failure".into());
        }

        let value = serde_json::to_value(notification)?;
        self.published.lock().unwrap().push((key, value));

        Ok(())
    }
}

#[async_trait]
impl NotificationPublisher for Arc<MockNotificationPublisher> {
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult {
        self.record(notification, N::queue().key().to_owned())
    }

    async fn publish_with_extension<N: Notification + Send + Sync>(
        &self,
        notification: &N,
        extension: QueueDescriptorExtension,
    ) -> EmptyResult {
        self.record(notification, N::queue().key_with_extension(&extension))
    }
}
