//! Exponential backoff implementations

use std::{iter::Iterator, time::Duration};

/// Exponential backoff iterator
///
/// Yields monotonically increasing delays until the retry budget, specified by the `limit` field, is used up.
/// Each element is the previous element multiplied by the `multiplier` property.
#[derive(Debug, Clone)]
pub struct Backoff {
    retries: u32,
    limit: u32,
    multiplier: u32,
    current: Duration,
}

impl Backoff {
    /// Creates a new backoff which yields at most `limit` delays, the first one being `initial`
    pub fn new(limit: u32, initial: Duration) -> Self {
        Self {
            retries: 0,
            limit,
            multiplier: 2,
            current: initial / 2,
        }
    }

    /// Number of delays handed out so far
    pub fn retries(&self) -> u32 {
        self.retries.min(self.limit)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(50))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.retries >= self.limit {
            return None;
        }

        self.retries += 1;
        self.current *= self.multiplier;
        Some(self.current)
    }
}
