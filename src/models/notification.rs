//! Notification Models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notification send request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient address
    pub to: String,
    /// Sender override
    #[serde(default)]
    pub from: Option<String>,
    /// Template key
    #[serde(alias = "template", alias = "templateKey")]
    pub template_key: String,
    /// Subject override
    #[serde(alias = "subjectOverride", default)]
    pub subject_override: Option<String>,
    /// Data passed to the template renderer
    #[serde(default)]
    pub data: Value,
}

impl NotificationRequest {
    pub fn new(to: &str, template_key: &str, data: Value) -> Self {
        Self {
            to: to.to_string(),
            from: None,
            template_key: template_key.to_string(),
            subject_override: None,
            data,
        }
    }

    pub fn from_address(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject_override = Some(subject.to_string());
        self
    }
}

/// Successful send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    /// Provider-assigned message id
    pub id: String,
}

/// Email body handed to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBody {
    /// Static template markup
    Html(String),
    /// Markup rendered by a component
    Rendered(String),
}

impl EmailBody {
    pub fn markup(&self) -> &str {
        match self {
            Self::Html(html) | Self::Rendered(html) => html,
        }
    }
}

/// Payload composed for the email API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: EmailBody,
}

/// Provider answer to a send call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub data: Option<SentEmail>,
    #[serde(default)]
    pub error: Option<ProviderFailure>,
}

impl ProviderResponse {
    pub fn sent(email_id: &str) -> Self {
        Self {
            data: Some(SentEmail {
                email_id: email_id.to_string(),
            }),
            error: None,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            data: None,
            error: Some(ProviderFailure {
                message: message.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentEmail {
    pub email_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub message: String,
}
