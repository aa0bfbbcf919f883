//! Data structures shared by all coordinators and the wire protocol

mod binding;
mod configuration;
mod metrics;
mod proposal;

pub use binding::*;
pub use configuration::*;
pub use metrics::*;
pub use proposal::*;
