//! Unsend Notification - Email notification provider backed by the Unsend API
//!
//! The provider resolves a named template, renders it, and submits the email:
//!
//! - **Templates**: static html or data-driven component renderers, stored by key
//! - **Validation**: a rule chain checks templates before they are accepted
//! - **Rate limiting**: a fixed window caps sends per minute
//! - **Retries**: linear or exponential backoff around the API call
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unsend_notification::{NotificationRequest, Template, UnsendOptions, UnsendPlugin};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = UnsendOptions::new("us_api_key", "no-reply@example.com")
//!         .with_rate_limit(60);
//!     let plugin = UnsendPlugin::from_options(options).unwrap();
//!
//!     plugin.templates()
//!         .add("welcome", Template::html("Welcome!", "<html><body>Hi</body></html>"))
//!         .await
//!         .unwrap();
//!
//!     let result = plugin.sender()
//!         .send(&NotificationRequest::new("user@example.com", "welcome", json!({})))
//!         .await
//!         .unwrap();
//!     println!("sent {}", result.id);
//! }
//! ```
//!
//! ## Component Templates
//!
//! ```rust,ignore
//! use unsend_notification::{ComponentRenderer, Template};
//! use serde_json::json;
//!
//! let renderer = ComponentRenderer::handlebars("<p>Order {{order_id}} shipped</p>")?
//!     .with_preview_props(json!({ "order_id": "ORD-1" }));
//! plugin.templates().add("order-shipped", Template::component("Shipped", renderer)).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod plugin;
pub mod services;

// Re-exports
pub use error::{ProviderError, ProviderErrorKind, UnsendError, UnsendResult};

pub use models::{
    ComponentRenderer, EmailBody, Environment, NotificationRequest, NotificationResult,
    RateLimitConfig, RenderError, RetryConfig, SendEmailPayload, Template, TemplateBuilder,
    TemplateContent, TemplateMetadata, TemplateMetadataFile, UnsendOptions, to_kebab_case,
};

pub use services::{
    Backoff, EmailClient, NotificationSender, RateLimiter, RetryPolicy, RetryStrategy,
    TemplateRepository, TemplateValidator, UnsendClient, ValidationIssue, ValidationResult,
    ValidationRule,
};

pub use handlers::{NotificationHandler, NotificationProvider, TemplateHandler};

pub use plugin::{plugin_info, PluginInfo, UnsendPlugin};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
