//! Notification Sender - resolves a template, composes the email and hands it
//! to the Unsend API through the rate limiter and retry strategy

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{UnsendError, UnsendResult};
use crate::models::{
    EmailBody, NotificationRequest, NotificationResult, Template, TemplateContent, UnsendOptions,
    SendEmailPayload,
};
use crate::services::client::EmailClient;
use crate::services::rate_limiter::RateLimiter;
use crate::services::retry::RetryStrategy;
use crate::services::template::TemplateRepository;

/// Notification sender
pub struct NotificationSender {
    /// Validated options
    options: UnsendOptions,
    /// Template repository
    templates: Arc<TemplateRepository>,
    /// Email API client
    client: Arc<dyn EmailClient>,
    /// Present when a rate limit is configured
    rate_limiter: Option<RateLimiter>,
    /// Retry strategy around the API call
    retry: RetryStrategy,
}

impl NotificationSender {
    /// Create a sender; options are validated here, not per send
    pub fn new(
        options: UnsendOptions,
        templates: Arc<TemplateRepository>,
        client: Arc<dyn EmailClient>,
    ) -> UnsendResult<Self> {
        options.validate()?;

        let rate_limiter = options.rate_limit.as_ref().map(|r| r.limiter());
        let retry = RetryStrategy::new(options.retry_policy());

        Ok(Self {
            options,
            templates,
            client,
            rate_limiter,
            retry,
        })
    }

    pub fn options(&self) -> &UnsendOptions {
        &self.options
    }

    pub fn templates(&self) -> &Arc<TemplateRepository> {
        &self.templates
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    pub fn retry(&self) -> &RetryStrategy {
        &self.retry
    }

    /// Send a notification
    pub async fn send(&self, request: &NotificationRequest) -> UnsendResult<NotificationResult> {
        let send_id = Uuid::now_v7();

        let template = self
            .templates
            .get(&request.template_key)
            .await
            .ok_or_else(|| UnsendError::TemplateNotFound(request.template_key.clone()))?;

        let payload = self.compose(request, &template)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.check_limit().await;
        }

        debug!(
            send_id = %send_id,
            template = %request.template_key,
            to = %request.to,
            "Submitting email"
        );

        let response = self
            .retry
            .execute(|| self.client.send_email(&payload))
            .await?;

        if let Some(error) = response.error {
            warn!(send_id = %send_id, error = %error.message, "Provider rejected email");
            return Err(UnsendError::SendFailed(error.message));
        }

        let data = response
            .data
            .ok_or_else(|| UnsendError::SendFailed("No data returned".to_string()))?;

        info!(
            send_id = %send_id,
            template = %request.template_key,
            email_id = %data.email_id,
            "Email sent"
        );

        Ok(NotificationResult { id: data.email_id })
    }

    /// Build the provider payload for a request
    pub fn compose(
        &self,
        request: &NotificationRequest,
        template: &Template,
    ) -> UnsendResult<SendEmailPayload> {
        let body = match &template.content {
            Some(TemplateContent::Component(renderer)) => {
                let markup = renderer.render(&request.data).map_err(|e| UnsendError::Render {
                    template: request.template_key.clone(),
                    message: e.to_string(),
                })?;
                EmailBody::Rendered(markup)
            }
            Some(TemplateContent::Html(html)) => EmailBody::Html(html.clone()),
            None => {
                return Err(UnsendError::Render {
                    template: request.template_key.clone(),
                    message: "Template has no content".to_string(),
                })
            }
        };

        Ok(SendEmailPayload {
            from: request
                .from
                .clone()
                .unwrap_or_else(|| self.options.from.clone()),
            to: vec![request.to.clone()],
            subject: request
                .subject_override
                .clone()
                .unwrap_or_else(|| template.subject.clone()),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentRenderer, ProviderResponse, RetryConfig};
    use crate::services::retry::Backoff;
    use crate::services::testing::RecordingClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn sender_with(options: UnsendOptions, client: Arc<RecordingClient>) -> NotificationSender {
        let templates = Arc::new(TemplateRepository::new());
        templates
            .add("welcome", Template::html("Hi", "<html><body>x</body></html>"))
            .await
            .unwrap();
        NotificationSender::new(options, templates, client).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_payload() {
        let client = Arc::new(RecordingClient::succeeding("em_1"));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;

        let result = sender
            .send(&NotificationRequest::new("u@v.com", "welcome", json!({})))
            .await
            .unwrap();

        assert_eq!(result, NotificationResult { id: "em_1".to_string() });
        assert_eq!(
            client.payloads(),
            vec![SendEmailPayload {
                from: "a@b.com".to_string(),
                to: vec!["u@v.com".to_string()],
                subject: "Hi".to_string(),
                body: EmailBody::Html("<html><body>x</body></html>".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_template_makes_no_call() {
        let client = Arc::new(RecordingClient::succeeding("em_1"));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;

        let err = sender
            .send(&NotificationRequest::new("u@v.com", "missing", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, UnsendError::TemplateNotFound(ref k) if k == "missing"));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_overrides_and_component_body() {
        let client = Arc::new(RecordingClient::succeeding("em_2"));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;
        let renderer = ComponentRenderer::handlebars("<p>Order {{order}}</p>").unwrap();
        sender
            .templates()
            .add("order-placed", Template::component("Order placed", renderer))
            .await
            .unwrap();

        let request = NotificationRequest::new("u@v.com", "order-placed", json!({ "order": 42 }))
            .from_address("shop@b.com")
            .subject("Your order #42");
        sender.send(&request).await.unwrap();

        let payload = client.payloads().remove(0);
        assert_eq!(payload.from, "shop@b.com");
        assert_eq!(payload.subject, "Your order #42");
        assert_eq!(payload.body, EmailBody::Rendered("<p>Order 42</p>".to_string()));
    }

    #[tokio::test]
    async fn test_provider_error_is_send_failed() {
        let client = Arc::new(RecordingClient::with_responses(vec![Ok(ProviderResponse::failed(
            "Invalid from address",
        ))]));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;

        let err = sender
            .send(&NotificationRequest::new("u@v.com", "welcome", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to send email: Invalid from address");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_success_is_send_failed() {
        let client = Arc::new(RecordingClient::with_responses(vec![Ok(ProviderResponse::default())]));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;

        let err = sender
            .send(&NotificationRequest::new("u@v.com", "welcome", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, UnsendError::SendFailed(ref m) if m == "No data returned"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_are_retried() {
        let client = Arc::new(RecordingClient::with_responses(vec![
            Err("connection reset".to_string()),
            Err("connection reset".to_string()),
            Ok(ProviderResponse::sent("em_3")),
        ]));
        let options = UnsendOptions::new("k", "a@b.com").with_retry(RetryConfig {
            max_attempts: 3,
            delay: 500,
            backoff: Backoff::Exponential,
        });
        let sender = sender_with(options, Arc::clone(&client)).await;

        let result = sender
            .send(&NotificationRequest::new("u@v.com", "welcome", json!({})))
            .await
            .unwrap();

        assert_eq!(result.id, "em_3");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_without_retry_config() {
        let client = Arc::new(RecordingClient::with_responses(vec![Err("timeout".to_string())]));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com"), Arc::clone(&client)).await;

        let err = sender
            .send(&NotificationRequest::new("u@v.com", "welcome", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, UnsendError::SendFailed(ref m) if m == "Transport error: timeout"));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_applies_to_sends() {
        let client = Arc::new(RecordingClient::succeeding("em"));
        let sender = sender_with(UnsendOptions::new("k", "a@b.com").with_rate_limit(2), Arc::clone(&client)).await;
        let request = NotificationRequest::new("u@v.com", "welcome", json!({}));
        let start = tokio::time::Instant::now();

        sender.send(&request).await.unwrap();
        sender.send(&request).await.unwrap();
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);

        sender.send(&request).await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_secs(60));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_at_construction() {
        let result = NotificationSender::new(
            UnsendOptions::new("", "").with_rate_limit(0),
            Arc::new(TemplateRepository::new()),
            Arc::new(RecordingClient::succeeding("em")),
        );

        let Err(UnsendError::InvalidConfiguration(violations)) = result else {
            panic!("expected invalid configuration");
        };
        assert_eq!(violations.len(), 3);
    }
}
