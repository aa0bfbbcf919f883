use crate::library::BoxedError;
use serde::Deserialize;

/// Describes a notification queue and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    key: String,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(key: String, limit: usize) -> Self {
        Self { key, limit }
    }

    /// Value which may be used by queue implementations to identify a queue
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Retrieves the key (ref [`key()`](QueueDescriptor::key) method) with an extension added
    pub fn key_with_extension(&self, extension: &str /* QueueDescriptorExtension */) -> String {
        format!("{}.{}", self.key, extension)
    }

    /// Resolves the key with an optional extension
    pub fn resolve(&self, extension: Option<&str>) -> String {
        match extension {
            Some(extension) => self.key_with_extension(extension),
            None => self.key.clone(),
        }
    }

    /// Maximum number of notifications to be retained in the queue
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Adds additional information to the key of a queue, specialising it further
///
/// Use this with well-known and long-lived values only, like the address of a cluster node.
/// Every distinct extension creates a separate queue and ephemeral values leave unused queues behind.
pub type QueueDescriptorExtension = String;

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
pub trait RawQueueEntry {
    /// Payload of the item
    fn payload(&self) -> &[u8];
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>;
}

/// Queue entry backed by an owned buffer, used by list-based queue implementations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    payload: Vec<u8>,
}

impl ListEntry {
    /// Creates a new entry from a raw payload
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }
}

impl RawQueueEntry for ListEntry {
    fn payload(&self) -> &[u8] {
        &self.payload
    }
}
