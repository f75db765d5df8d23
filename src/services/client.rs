//! Unsend API Client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{ProviderResponse, SendEmailPayload};

/// Transport-level failure talking to the email API
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Outbound email API
#[async_trait]
pub trait EmailClient: Send + Sync {
    /// Submit one email. Provider-side rejections come back in the
    /// response; only transport failures are errors.
    async fn send_email(&self, payload: &SendEmailPayload) -> Result<ProviderResponse, ClientError>;
}

/// Request body for `POST /api/v1/emails`
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    email_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Nested { error: ErrorDetail },
    Flat { message: String },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Unsend HTTP client
pub struct UnsendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl UnsendClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn emails_url(&self) -> String {
        format!("{}/api/v1/emails", self.base_url)
    }
}

#[async_trait]
impl EmailClient for UnsendClient {
    async fn send_email(&self, payload: &SendEmailPayload) -> Result<ProviderResponse, ClientError> {
        let url = self.emails_url();
        let request = SendEmailRequest {
            from: &payload.from,
            to: &payload.to,
            subject: &payload.subject,
            html: payload.body.markup(),
        };

        debug!(url = %url, recipients = payload.to.len(), "Sending email");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse::Nested { error }) => error.message,
                Ok(ErrorResponse::Flat { message }) => message,
                Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
                Err(_) => format!("HTTP {status}: {body}"),
            };
            return Ok(ProviderResponse::failed(&message));
        }

        match serde_json::from_str::<SendEmailResponse>(&body) {
            Ok(SendEmailResponse { email_id: Some(id) }) => Ok(ProviderResponse::sent(&id)),
            _ => Ok(ProviderResponse::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailBody;

    #[test]
    fn test_base_url_normalised() {
        let client = UnsendClient::new("https://app.unsend.dev/", "k").unwrap();
        assert_eq!(client.base_url(), "https://app.unsend.dev");
        assert_eq!(client.emails_url(), "https://app.unsend.dev/api/v1/emails");
    }

    #[test]
    fn test_request_body_shape() {
        let payload = SendEmailPayload {
            from: "a@b.com".to_string(),
            to: vec!["u@v.com".to_string()],
            subject: "Hi".to_string(),
            body: EmailBody::Rendered("<p>x</p>".to_string()),
        };
        let request = SendEmailRequest {
            from: &payload.from,
            to: &payload.to,
            subject: &payload.subject,
            html: payload.body.markup(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "from": "a@b.com",
                "to": ["u@v.com"],
                "subject": "Hi",
                "html": "<p>x</p>"
            })
        );
    }

    #[test]
    fn test_error_body_shapes() {
        let nested: ErrorResponse = serde_json::from_str(r#"{"error":{"code":"BAD_REQUEST","message":"Invalid from"}}"#).unwrap();
        assert!(matches!(nested, ErrorResponse::Nested { error } if error.message == "Invalid from"));

        let flat: ErrorResponse = serde_json::from_str(r#"{"message":"Unauthorized"}"#).unwrap();
        assert!(matches!(flat, ErrorResponse::Flat { message } if message == "Unauthorized"));
    }
}
