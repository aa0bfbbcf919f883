//! Runnable modules providing a unified configuration

pub mod options;

pub mod coordinator;
