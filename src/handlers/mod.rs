//! Unsend Notification Handlers

pub mod notification;
pub mod template;

pub use notification::{NotificationHandler, NotificationProvider, PROVIDER_IDENTIFIER};
pub use template::TemplateHandler;
