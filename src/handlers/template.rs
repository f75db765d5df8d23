//! Template Handler

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, UnsendError};
use crate::models::{Template, TemplateBuilder, TemplateMetadata};
use crate::services::TemplateRepository;

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub key: String,
    pub subject: String,
    pub html: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub key: String,
    pub subject: String,
    pub version: String,
    pub content_type: Option<&'static str>,
    pub metadata: Option<TemplateMetadata>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub subject: String,
    pub html: String,
}

/// Template handler
pub struct TemplateHandler {
    templates: Arc<TemplateRepository>,
}

impl TemplateHandler {
    pub fn new(templates: Arc<TemplateRepository>) -> Self {
        Self { templates }
    }

    /// Create a static html template
    pub async fn create(&self, request: CreateTemplateRequest) -> Result<TemplateResponse, ProviderError> {
        let mut builder = TemplateBuilder::new()
            .subject(&request.subject)
            .html(&request.html);

        if let Some(version) = &request.version {
            builder = builder.version(version).metadata_version(version);
        }
        if let Some(description) = &request.description {
            builder = builder.description(description);
        }
        for tag in request.tags.iter().flatten() {
            builder = builder.tag(tag);
        }
        if let Some(category) = &request.category {
            builder = builder.category(category);
        }

        let template = builder.build().map_err(ProviderError::invalid_data)?;
        self.templates
            .add(&request.key, template.clone())
            .await
            .map_err(UnsendError::from)?;

        Ok(Self::to_response(&request.key, &template))
    }

    pub async fn get(&self, key: &str) -> Result<TemplateResponse, ProviderError> {
        let template = self
            .templates
            .get(key)
            .await
            .ok_or_else(|| UnsendError::TemplateNotFound(key.to_string()))?;

        Ok(Self::to_response(key, &template))
    }

    pub async fn list(&self) -> Vec<TemplateResponse> {
        self.templates
            .get_all()
            .await
            .iter()
            .map(|(key, template)| Self::to_response(key, template))
            .collect()
    }

    pub async fn delete(&self, key: &str) {
        self.templates.remove_one(key).await;
    }

    /// Render a stored template with sample data
    pub async fn preview(&self, key: &str, request: PreviewRequest) -> Result<PreviewResponse, ProviderError> {
        let template = self
            .templates
            .get(key)
            .await
            .ok_or_else(|| UnsendError::TemplateNotFound(key.to_string()))?;

        let html = template.render_body(&request.data).map_err(|e| UnsendError::Render {
            template: key.to_string(),
            message: e.to_string(),
        })?;

        Ok(PreviewResponse {
            subject: template.subject,
            html,
        })
    }

    fn to_response(key: &str, template: &Template) -> TemplateResponse {
        TemplateResponse {
            key: key.to_string(),
            subject: template.subject.clone(),
            version: template.version.clone(),
            content_type: template.content.as_ref().map(|c| c.kind()),
            metadata: template.metadata.clone(),
        }
    }
}
