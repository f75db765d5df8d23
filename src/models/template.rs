//! Email Template Models

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::validator::{codes, ValidationIssue};

/// Default template version
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Error raised by a component renderer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type RenderFn = dyn Fn(&Value) -> Result<String, RenderError> + Send + Sync;

/// Data-driven markup renderer
///
/// Takes the notification data and produces the email markup. Optional
/// preview props are used to smoke-test the renderer when the template is
/// added to a repository.
#[derive(Clone)]
pub struct ComponentRenderer {
    render: Arc<RenderFn>,
    preview_props: Option<Value>,
}

impl ComponentRenderer {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&Value) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
            preview_props: None,
        }
    }

    /// Build a renderer from a Handlebars source, binding the data as context
    pub fn handlebars(source: &str) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_template_string("component", source)
            .map_err(|e| RenderError::new(e.to_string()))?;

        Ok(Self::new(move |data| {
            registry
                .render("component", data)
                .map_err(|e| RenderError::new(e.to_string()))
        }))
    }

    pub fn with_preview_props(mut self, props: Value) -> Self {
        self.preview_props = Some(props);
        self
    }

    pub fn preview_props(&self) -> Option<&Value> {
        self.preview_props.as_ref()
    }

    pub fn render(&self, data: &Value) -> Result<String, RenderError> {
        (self.render)(data)
    }
}

impl fmt::Debug for ComponentRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRenderer")
            .field("preview_props", &self.preview_props)
            .finish_non_exhaustive()
    }
}

/// Template body: either a renderer or static markup
#[derive(Debug, Clone)]
pub enum TemplateContent {
    /// Markup produced from the notification data
    Component(ComponentRenderer),
    /// Static markup, sent verbatim
    Html(String),
}

impl TemplateContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Html(_) => "html",
        }
    }
}

/// Template metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Semantic version of the template content
    pub version: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Tags for categorization
    pub tags: Option<Vec<String>>,
    /// Category
    pub category: Option<String>,
}

/// Email template
#[derive(Debug, Clone)]
pub struct Template {
    /// Subject line, may be overridden per send
    pub subject: String,
    /// Template version
    pub version: String,
    /// Optional metadata
    pub metadata: Option<TemplateMetadata>,
    /// Body renderer. `None` is rejected by validation.
    pub content: Option<TemplateContent>,
}

impl Template {
    pub fn html(subject: &str, html: &str) -> Self {
        Self {
            subject: subject.to_string(),
            version: DEFAULT_VERSION.to_string(),
            metadata: None,
            content: Some(TemplateContent::Html(html.to_string())),
        }
    }

    pub fn component(subject: &str, renderer: ComponentRenderer) -> Self {
        Self {
            subject: subject.to_string(),
            version: DEFAULT_VERSION.to_string(),
            metadata: None,
            content: Some(TemplateContent::Component(renderer)),
        }
    }

    pub fn with_metadata(mut self, metadata: TemplateMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Static markup, if this is an html template
    pub fn html_content(&self) -> Option<&str> {
        match &self.content {
            Some(TemplateContent::Html(html)) => Some(html),
            _ => None,
        }
    }

    /// Renderer, if this is a component template
    pub fn component_content(&self) -> Option<&ComponentRenderer> {
        match &self.content {
            Some(TemplateContent::Component(renderer)) => Some(renderer),
            _ => None,
        }
    }

    /// Produce the body markup for the given data
    pub fn render_body(&self, data: &Value) -> Result<String, RenderError> {
        match &self.content {
            Some(TemplateContent::Component(renderer)) => renderer.render(data),
            Some(TemplateContent::Html(html)) => Ok(html.clone()),
            None => Err(RenderError::new("Template has no content")),
        }
    }
}

/// Template builder
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    subject: Option<String>,
    version: Option<String>,
    html: Option<String>,
    component: Option<ComponentRenderer>,
    description: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    metadata_version: Option<String>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = Some(html.to_string());
        self
    }

    pub fn component(mut self, renderer: ComponentRenderer) -> Self {
        self.component = Some(renderer);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn metadata_version(mut self, version: &str) -> Self {
        self.metadata_version = Some(version.to_string());
        self
    }

    /// Build the template.
    ///
    /// Missing content is allowed here so the repository validator can
    /// report it; supplying both a component and html is rejected.
    pub fn build(self) -> Result<Template, String> {
        let content = match (self.component, self.html) {
            (Some(_), Some(_)) => {
                return Err("Template content must be either a component or html, not both".to_string())
            }
            (Some(renderer), None) => Some(TemplateContent::Component(renderer)),
            (None, Some(html)) => Some(TemplateContent::Html(html)),
            (None, None) => None,
        };

        let has_metadata = self.description.is_some()
            || !self.tags.is_empty()
            || self.category.is_some()
            || self.metadata_version.is_some();

        let metadata = has_metadata.then(|| TemplateMetadata {
            version: self.metadata_version,
            description: self.description,
            tags: (!self.tags.is_empty()).then_some(self.tags),
            category: self.category,
        });

        Ok(Template {
            subject: self.subject.unwrap_or_default(),
            version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            metadata,
            content,
        })
    }
}

/// Per-template metadata side-file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMetadataFile {
    pub version: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
struct RawMetadataFile {
    version: Option<String>,
    subject: Option<String>,
    description: Option<String>,
    tags: Option<Value>,
    category: Option<String>,
}

/// Side-file parse failure
#[derive(Debug, thiserror::Error)]
pub enum MetadataFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}", .0.message)]
    Invalid(ValidationIssue),
}

impl TemplateMetadataFile {
    pub fn from_json_str(json: &str) -> Result<Self, MetadataFileError> {
        let raw: RawMetadataFile = serde_json::from_str(json)?;

        let tags = match raw.tags {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(tag) => Ok(tag),
                        _ => Err(invalid_tags()),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(invalid_tags()),
        };

        Ok(Self {
            version: raw.version,
            subject: raw.subject,
            description: raw.description,
            tags,
            category: raw.category,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MetadataFileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Overlay the side-file onto a template
    pub fn apply_to(self, mut template: Template) -> Template {
        if let Some(subject) = self.subject {
            template.subject = subject;
        }
        if let Some(version) = &self.version {
            template.version = version.clone();
        }

        let mut metadata = template.metadata.take().unwrap_or_default();
        metadata.version = self.version.or(metadata.version);
        metadata.description = self.description.or(metadata.description);
        metadata.tags = self.tags.or(metadata.tags);
        metadata.category = self.category.or(metadata.category);
        template.metadata = Some(metadata);

        template
    }
}

fn invalid_tags() -> MetadataFileError {
    MetadataFileError::Invalid(ValidationIssue::new(
        codes::INVALID_TAGS,
        "Tags must be an array of strings",
        &["metadata", "tags"],
    ))
}

/// Convert a component name to a kebab-case template key
///
/// `ProductUpsert` becomes `product-upsert`, `HTMLTemplate` becomes `html-template`.
pub fn to_kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('-');
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    out
}
