//! Runtime harness executing a coordinator node until the process is asked to stop

mod heart;
mod module;

pub use heart::*;
pub use module::*;
