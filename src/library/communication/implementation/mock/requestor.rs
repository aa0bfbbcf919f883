use crate::library::communication::request::{
    Request, RequestError, Requestor, ResponseCollectionTimeout,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Box<dyn Fn(Value) -> Result<Vec<Value>, String> + Send + Sync>;

/// Requestor that answers every request using a handler operating on the serialized request
pub struct MockRequestor {
    handler: Handler,
    delay: Option<Duration>,
    hang: bool,
    requests: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl MockRequestor {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(Value) -> Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        Arc::new(Self::build(Box::new(handler), None, false))
    }

    /// Answers only after the given delay has passed
    pub fn delayed<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(Value) -> Result<Vec<Value>, String> + Send + Sync + 'static,
    {
        Arc::new(Self::build(Box::new(handler), Some(delay), false))
    }

    /// Never answers at all
    pub fn unresponsive() -> Arc<Self> {
        Arc::new(Self::build(Box::new(|_| Ok(vec![])), None, true))
    }

    fn build(handler: Handler, delay: Option<Duration>, hang: bool) -> Self {
        Self {
            handler,
            delay,
            hang,
            requests: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Requestor for Arc<MockRequestor> {
    async fn request<R>(
        &self,
        request: &R,
        limit: Option<usize>,
        timeout: ResponseCollectionTimeout,
    ) -> Result<Vec<R::Response>, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        assert!(
            limit.is_some() || timeout != ResponseCollectionTimeout::None,
            "Calling `request` without a limit or timeout would block indefinitely!"
        );

        self.requests.fetch_add(1, Ordering::SeqCst);

        let serialized = serde_json::to_value(request)
            .map_err(|e| RequestError::SendingFailure(Box::new(e)))?;
        self.received.lock().unwrap().push(serialized.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.hang {
            futures::future::pending::<()>().await;
        }

        let responses =
            (self.handler)(serialized).map_err(|e| RequestError::ReceptionFailed(e.into()))?;

        responses
            .into_iter()
            .map(|response| {
                serde_json::from_value(response)
                    .map_err(|e| RequestError::ReceptionFailed(Box::new(e)))
            })
            .collect()
    }
}
