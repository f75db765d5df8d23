//! Notification Handler - the provider surface the host framework calls

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, UnsendError};
use crate::models::{NotificationRequest, UnsendOptions};
use crate::services::NotificationSender;

/// Provider identifier registered with the host
pub const PROVIDER_IDENTIFIER: &str = "notification-unsend";

/// Notification as dispatched by the host framework
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSendNotification {
    pub to: String,
    #[serde(default)]
    pub from: Option<String>,
    pub template: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSendResult {
    pub id: String,
}

/// Host-side notification provider contract
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    fn identifier(&self) -> &'static str;

    async fn send(&self, notification: ProviderSendNotification) -> Result<ProviderSendResult, ProviderError>;
}

/// Notification handler
pub struct NotificationHandler {
    sender: Arc<NotificationSender>,
}

impl NotificationHandler {
    pub fn new(sender: Arc<NotificationSender>) -> Self {
        Self { sender }
    }

    /// Validate raw provider options before the provider is constructed
    pub fn validate_options(options: &serde_json::Value) -> Result<(), ProviderError> {
        let options = UnsendOptions::from_value(options.clone()).map_err(UnsendError::from)?;
        options.validate().map_err(UnsendError::from)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for NotificationHandler {
    fn identifier(&self) -> &'static str {
        PROVIDER_IDENTIFIER
    }

    async fn send(&self, notification: ProviderSendNotification) -> Result<ProviderSendResult, ProviderError> {
        let request = NotificationRequest {
            to: notification.to,
            from: notification.from,
            template_key: notification.template,
            subject_override: notification.subject,
            data: notification.data,
        };

        let result = self.sender.send(&request).await?;
        Ok(ProviderSendResult { id: result.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::models::Template;
    use crate::services::testing::RecordingClient;
    use crate::services::TemplateRepository;
    use serde_json::json;

    async fn handler() -> NotificationHandler {
        let templates = Arc::new(TemplateRepository::new());
        templates
            .add("welcome", Template::html("Hi", "<html><body>x</body></html>"))
            .await
            .unwrap();
        let sender = NotificationSender::new(
            UnsendOptions::new("k", "a@b.com"),
            templates,
            Arc::new(RecordingClient::succeeding("em_1")),
        )
        .unwrap();
        NotificationHandler::new(Arc::new(sender))
    }

    #[tokio::test]
    async fn test_send_from_host_payload() {
        let handler = handler().await;
        let notification: ProviderSendNotification = serde_json::from_value(json!({
            "to": "u@v.com",
            "template": "welcome",
            "data": { "name": "Ada" }
        }))
        .unwrap();

        let result = handler.send(notification).await.unwrap();
        assert_eq!(result, ProviderSendResult { id: "em_1".to_string() });
        assert_eq!(handler.identifier(), "notification-unsend");
    }

    #[tokio::test]
    async fn test_unknown_template_is_invalid_data() {
        let handler = handler().await;
        let notification = ProviderSendNotification {
            to: "u@v.com".to_string(),
            from: None,
            template: "missing".to_string(),
            subject: None,
            data: json!({}),
        };

        let err = handler.send(notification).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidData);
        assert_eq!(err.message, "Couldn't find an email template for missing");
    }

    #[test]
    fn test_validate_options() {
        assert!(NotificationHandler::validate_options(&json!({ "api_key": "k", "from": "a@b.com" })).is_ok());

        let err = NotificationHandler::validate_options(&json!({ "from": "a@b.com" })).unwrap_err();
        assert!(err.message.contains("api_key"));
    }

    #[test]
    fn test_validate_options_reports_malformed_counts_with_missing_fields() {
        let err = NotificationHandler::validate_options(&json!({
            "api_key": "",
            "from": "",
            "retry": { "maxAttempts": 1.5 }
        }))
        .unwrap_err();

        assert_eq!(err.kind, ProviderErrorKind::InvalidData);
        assert_eq!(
            err.message,
            "Invalid options for Unsend plugin: \
             Option `api_key` is required in the Unsend options; \
             Option `from` is required in the Unsend options; \
             Option `retry.maxAttempts` must be a positive integer"
        );
    }
}
