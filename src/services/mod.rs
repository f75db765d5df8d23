//! Unsend Notification Services

pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod sender;
pub mod template;
pub mod validator;

pub use client::{ClientError, EmailClient, UnsendClient};
pub use rate_limiter::RateLimiter;
pub use retry::{Backoff, RetryPolicy, RetryStrategy};
pub use sender::NotificationSender;
pub use template::{TemplateError, TemplateRepository};
pub use validator::{TemplateValidator, ValidationIssue, ValidationResult, ValidationRule};
