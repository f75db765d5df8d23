//! Unsend Plugin Entry Point

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::error::{UnsendError, UnsendResult};
use crate::handlers::{NotificationHandler, TemplateHandler, PROVIDER_IDENTIFIER};
use crate::models::{Environment, Template, UnsendOptions};
use crate::services::{EmailClient, NotificationSender, TemplateRepository, UnsendClient};

/// Unsend notification plugin
pub struct UnsendPlugin {
    /// Template repository
    templates: Arc<TemplateRepository>,
    /// Notification sender
    sender: Arc<NotificationSender>,
    /// Notification handler
    notification_handler: NotificationHandler,
    /// Template handler
    template_handler: TemplateHandler,
}

impl UnsendPlugin {
    /// Create the plugin around an email client
    pub fn new(options: UnsendOptions, client: Arc<dyn EmailClient>) -> UnsendResult<Self> {
        let templates = Arc::new(TemplateRepository::new());
        let sender = Arc::new(NotificationSender::new(options, Arc::clone(&templates), client)?);

        let notification_handler = NotificationHandler::new(Arc::clone(&sender));
        let template_handler = TemplateHandler::new(Arc::clone(&templates));

        Ok(Self {
            templates,
            sender,
            notification_handler,
            template_handler,
        })
    }

    /// Create the plugin talking to the Unsend API
    pub fn from_options(options: UnsendOptions) -> UnsendResult<Self> {
        options.validate()?;
        let client = UnsendClient::new(options.api_url(), &options.api_key)
            .map_err(|e| UnsendError::InvalidConfiguration(vec![e.to_string()]))?;
        Self::new(options, Arc::new(client))
    }

    /// Load options from the environment and resolve them for `UNSEND_ENV`
    pub fn from_env() -> anyhow::Result<Self> {
        let options = UnsendOptions::from_env().context("loading Unsend options")?;

        let environment = match std::env::var("UNSEND_ENV") {
            Ok(label) => label
                .parse::<Environment>()
                .map_err(anyhow::Error::msg)
                .context("reading UNSEND_ENV")?,
            Err(_) => Environment::default(),
        };

        let options = options.resolve(environment);
        let plugin = Self::from_options(options).context("initialising Unsend plugin")?;
        info!(environment = %environment, "Unsend plugin initialised");

        Ok(plugin)
    }

    /// Register templates at startup, stopping at the first failure
    pub async fn register_templates(
        &self,
        templates: impl IntoIterator<Item = (String, Template)>,
    ) -> UnsendResult<()> {
        self.templates.add_many(templates).await?;
        Ok(())
    }

    /// Get plugin name
    pub fn name(&self) -> &'static str {
        "Unsend"
    }

    /// Get plugin version
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn identifier(&self) -> &'static str {
        PROVIDER_IDENTIFIER
    }

    // Service accessors
    pub fn templates(&self) -> &Arc<TemplateRepository> {
        &self.templates
    }

    pub fn sender(&self) -> &Arc<NotificationSender> {
        &self.sender
    }

    // Handler accessors
    pub fn notification_handler(&self) -> &NotificationHandler {
        &self.notification_handler
    }

    pub fn template_handler(&self) -> &TemplateHandler {
        &self.template_handler
    }
}

/// Plugin metadata for registration
pub fn plugin_info() -> PluginInfo {
    PluginInfo {
        name: "Unsend",
        identifier: PROVIDER_IDENTIFIER,
        version: env!("CARGO_PKG_VERSION"),
        description: "Unsend email notification provider",
        author: "RustPress Team",
        license: "MIT",
        channels: vec!["email"],
        hooks: vec!["notification.send"],
    }
}

/// Plugin information
#[derive(Debug)]
pub struct PluginInfo {
    pub name: &'static str,
    pub identifier: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub license: &'static str,
    pub channels: Vec<&'static str>,
    pub hooks: Vec<&'static str>,
}
