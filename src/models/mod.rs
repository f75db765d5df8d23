//! Unsend Notification Models

pub mod notification;
pub mod options;
pub mod template;

pub use notification::*;
pub use options::*;
pub use template::*;
