//! Template Validation
//!
//! An ordered chain of independent rules. Every rule runs on every template
//! and the validator concatenates their findings: errors block insertion into
//! the repository, warnings are only logged.

use std::panic::{self, AssertUnwindSafe};

use regex::Regex;
use serde::Serialize;

use crate::models::{Template, TemplateContent};

/// Machine-readable issue codes produced by the built-in rules
pub mod codes {
    pub const MISSING_SUBJECT: &str = "MISSING_SUBJECT";
    pub const MISSING_CONTENT: &str = "MISSING_CONTENT";
    pub const INVALID_COMPONENT_PROPS: &str = "INVALID_COMPONENT_PROPS";
    pub const MISSING_HTML_TAG: &str = "MISSING_HTML_TAG";
    pub const MISSING_BODY_TAG: &str = "MISSING_BODY_TAG";
    pub const INVALID_VERSION: &str = "INVALID_VERSION";
    pub const INVALID_TAGS: &str = "INVALID_TAGS";
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Field names leading to the offending field
    pub path: Vec<String>,
}

impl ValidationIssue {
    pub fn new(code: &str, message: impl Into<String>, path: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Dotted path, e.g. `metadata.version`
    pub fn display_path(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.display_path(), self.message)
    }
}

/// Outcome of validating one template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// `path: message` pairs joined with `, `
    pub fn summarize(issues: &[ValidationIssue]) -> String {
        issues
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A single template check
pub trait ValidationRule: Send + Sync {
    fn validate(&self, template: &Template) -> ValidationResult;
}

/// Ordered rule chain
pub struct TemplateValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl TemplateValidator {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Validator with the built-in rules in their standard order
    pub fn with_default_rules() -> Self {
        Self::new(vec![
            Box::new(RequiredFieldsRule),
            Box::new(ComponentPropsRule),
            Box::new(MarkupShapeRule),
            Box::new(MetadataShapeRule::new()),
        ])
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn validate(&self, template: &Template) -> ValidationResult {
        let mut result = ValidationResult::default();
        for rule in &self.rules {
            result.merge(rule.validate(template));
        }
        result
    }
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// Subject and content must be present
pub struct RequiredFieldsRule;

impl ValidationRule for RequiredFieldsRule {
    fn validate(&self, template: &Template) -> ValidationResult {
        let mut result = ValidationResult::default();

        if template.subject.is_empty() {
            result.error(ValidationIssue::new(
                codes::MISSING_SUBJECT,
                "Template must have a subject",
                &["subject"],
            ));
        }

        let has_content = match &template.content {
            Some(TemplateContent::Component(_)) => true,
            Some(TemplateContent::Html(html)) => !html.is_empty(),
            None => false,
        };
        if !has_content {
            result.error(ValidationIssue::new(
                codes::MISSING_CONTENT,
                "Template must have either component or html content",
                &["content"],
            ));
        }

        result
    }
}

/// Renders a component once with its preview props, if it has any
pub struct ComponentPropsRule;

impl ValidationRule for ComponentPropsRule {
    fn validate(&self, template: &Template) -> ValidationResult {
        let mut result = ValidationResult::default();

        let Some(renderer) = template.component_content() else {
            return result;
        };
        let Some(props) = renderer.preview_props() else {
            return result;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(props)));
        let failure = match outcome {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        if let Some(message) = failure {
            result.error(ValidationIssue::new(
                codes::INVALID_COMPONENT_PROPS,
                format!("Component failed to render with preview props: {message}"),
                &["content", "component"],
            ));
        }

        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "renderer panicked".to_string()
    }
}

/// Advisory check for document and body wrappers in static markup
pub struct MarkupShapeRule;

impl ValidationRule for MarkupShapeRule {
    fn validate(&self, template: &Template) -> ValidationResult {
        let mut result = ValidationResult::default();

        let Some(html) = template.html_content().filter(|h| !h.is_empty()) else {
            return result;
        };

        if !html.contains("<html") {
            result.warning(ValidationIssue::new(
                codes::MISSING_HTML_TAG,
                "HTML content should be wrapped in <html> tags",
                &["content", "html"],
            ));
        }
        if !html.contains("<body") {
            result.warning(ValidationIssue::new(
                codes::MISSING_BODY_TAG,
                "HTML content should be wrapped in <body> tags",
                &["content", "html"],
            ));
        }

        result
    }
}

/// Metadata version must be `x.y.z`; tags must be non-blank
pub struct MetadataShapeRule {
    version: Regex,
}

impl MetadataShapeRule {
    pub fn new() -> Self {
        Self {
            version: semver_regex(),
        }
    }
}

impl Default for MetadataShapeRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationRule for MetadataShapeRule {
    fn validate(&self, template: &Template) -> ValidationResult {
        let mut result = ValidationResult::default();

        let Some(metadata) = &template.metadata else {
            return result;
        };

        if let Some(version) = metadata.version.as_deref().filter(|v| !v.is_empty()) {
            if !self.version.is_match(version) {
                result.error(ValidationIssue::new(
                    codes::INVALID_VERSION,
                    "Version must follow semantic versioning (e.g., 1.0.0)",
                    &["metadata", "version"],
                ));
            }
        }

        if let Some(tags) = &metadata.tags {
            if tags.iter().any(|t| t.trim().is_empty()) {
                result.error(ValidationIssue::new(
                    codes::INVALID_TAGS,
                    "Tags must be an array of non-empty strings",
                    &["metadata", "tags"],
                ));
            }
        }

        result
    }
}

fn semver_regex() -> Regex {
    Regex::new(r"^\d+\.\d+\.\d+$").expect("semver pattern is valid")
}
