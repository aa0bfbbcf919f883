//! Various small helpers

mod backoff;

pub use backoff::Backoff;
