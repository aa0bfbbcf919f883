//! This library crate contains everything required to keep message groups sticky across a cluster of broker nodes.
//!
//! Submodules have been introduced to split responsibilities. Each module has a specific focus
//! and they together form a chain of dependencies from the low-level [`library`], over the grouping [`domain`]
//! types and the [`coordinator`] that decides bindings, through the executable [`harness`], up to the
//! runnable [`module`] which wires a coordinator node together.

#![deny(missing_docs)]

pub mod coordinator;
pub mod domain;
pub mod harness;
pub mod library;
pub mod module;
