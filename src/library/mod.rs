//! Independent and project agnostic libraries
//!
//! Any of the library submodules in this module could be extracted into their own crate.
//! They power the transport of proposals between broker nodes but know nothing about message
//! groups; everything grouping specific lives in the [`domain`](super::domain) and
//! [`coordinator`](super::coordinator) modules.

pub mod communication;
pub mod helpers;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
