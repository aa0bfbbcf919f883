mod notification_publisher;
mod requestor;

pub use notification_publisher::*;
pub use requestor::*;
