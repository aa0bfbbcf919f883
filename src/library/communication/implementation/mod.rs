//! Implementations of traits from this module

pub mod json;
pub mod memory;
pub mod redis;

#[cfg(test)]
pub(crate) mod mock;
