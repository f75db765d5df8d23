//! Template Repository
//!
//! Named templates in insertion order. `add` enforces unique keys and runs the
//! validator; `set` and `merge` write without either check.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::Template;
use crate::services::validator::{TemplateValidator, ValidationIssue, ValidationResult};

/// Template repository error
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template with key \"{0}\" already exists")]
    Duplicate(String),
    #[error("Invalid template: {}", ValidationResult::summarize(.0))]
    Invalid(Vec<ValidationIssue>),
}

/// Insertion-ordered key to template map
#[derive(Debug, Clone, Default)]
struct OrderedTemplates {
    order: Vec<String>,
    entries: HashMap<String, Template>,
}

impl OrderedTemplates {
    fn from_entries(entries: impl IntoIterator<Item = (String, Template)>) -> Self {
        let mut map = Self::default();
        for (key, template) in entries {
            map.upsert(key, template);
        }
        map
    }

    fn upsert(&mut self, key: String, template: Template) {
        if self.entries.insert(key.clone(), template).is_none() {
            self.order.push(key);
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn to_vec(&self) -> Vec<(String, Template)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|t| (key.clone(), t.clone())))
            .collect()
    }
}

/// Template repository
pub struct TemplateRepository {
    templates: RwLock<OrderedTemplates>,
    validator: Option<TemplateValidator>,
}

impl TemplateRepository {
    /// Repository validating with the built-in rules
    pub fn new() -> Self {
        Self::with_validator(TemplateValidator::with_default_rules())
    }

    pub fn with_validator(validator: TemplateValidator) -> Self {
        Self {
            templates: RwLock::new(OrderedTemplates::default()),
            validator: Some(validator),
        }
    }

    /// Repository that accepts any template on `add`
    pub fn without_validation() -> Self {
        Self {
            templates: RwLock::new(OrderedTemplates::default()),
            validator: None,
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.templates.read().await.entries.contains_key(key)
    }

    pub async fn get(&self, key: &str) -> Option<Template> {
        self.templates.read().await.entries.get(key).cloned()
    }

    /// Add a template under a new key
    pub async fn add(&self, key: &str, template: Template) -> Result<(), TemplateError> {
        if self.has(key).await {
            return Err(TemplateError::Duplicate(key.to_string()));
        }

        if let Some(validator) = &self.validator {
            let result = validator.validate(&template);
            if !result.is_valid() {
                return Err(TemplateError::Invalid(result.errors));
            }
            if !result.warnings.is_empty() {
                warn!(
                    template = %key,
                    warnings = %ValidationResult::summarize(&result.warnings),
                    "Template warnings"
                );
            }
        }

        let mut templates = self.templates.write().await;
        // Re-check under the write lock; validation ran without it.
        if templates.entries.contains_key(key) {
            return Err(TemplateError::Duplicate(key.to_string()));
        }
        templates.upsert(key.to_string(), template);
        debug!(template = %key, "Template added");

        Ok(())
    }

    /// Add each entry in order, stopping at the first failure
    pub async fn add_many(
        &self,
        templates: impl IntoIterator<Item = (String, Template)>,
    ) -> Result<(), TemplateError> {
        for (key, template) in templates {
            self.add(&key, template).await?;
        }
        Ok(())
    }

    /// Replace the whole repository.
    ///
    /// Unvalidated write path: no duplicate check, no rule chain.
    pub async fn set(&self, templates: impl IntoIterator<Item = (String, Template)>) {
        let replacement = OrderedTemplates::from_entries(templates);
        *self.templates.write().await = replacement;
    }

    /// Upsert entries, overwriting existing keys.
    ///
    /// Unlike `add` this neither rejects existing keys nor validates.
    pub async fn merge(&self, templates: impl IntoIterator<Item = (String, Template)>) {
        let mut current = self.templates.write().await;
        for (key, template) in templates {
            current.upsert(key, template);
        }
    }

    /// Remove a template; absent keys are ignored
    pub async fn remove_one(&self, key: &str) {
        self.templates.write().await.remove(key);
    }

    pub async fn remove_many<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut templates = self.templates.write().await;
        for key in keys {
            templates.remove(key.as_ref());
        }
    }

    /// Copy of all entries in insertion order
    pub async fn get_all(&self) -> Vec<(String, Template)> {
        self.templates.read().await.to_vec()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.templates.read().await.order.clone()
    }

    pub async fn len(&self) -> usize {
        self.templates.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for TemplateRepository {
    fn default() -> Self {
        Self::new()
    }
}
