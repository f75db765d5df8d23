//! Plugin Options

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::rate_limiter::RateLimiter;
use crate::services::retry::{Backoff, RetryPolicy};

/// Default Unsend API base URL
pub const DEFAULT_API_URL: &str = "https://app.unsend.dev";

/// Options error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid options for Unsend plugin: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("Failed to load options: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Failed to parse options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Deployment environment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Development, Self::Staging, Self::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(format!("Unknown environment: {other}")),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum send attempts
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: i64,
    /// Base delay in milliseconds
    #[serde(default = "default_delay")]
    pub delay: i64,
    /// Backoff strategy
    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_attempts() -> i64 {
    3
}

fn default_delay() -> i64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_delay(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Policy for a validated config
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            saturating_u32(self.max_attempts),
            Duration::from_millis(u64::try_from(self.delay).unwrap_or(0)),
            self.backoff,
        )
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum sends per minute
    #[serde(default = "default_max_per_minute", alias = "maxPerMinute")]
    pub max_per_minute: i64,
}

fn default_max_per_minute() -> i64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_max_per_minute(),
        }
    }
}

impl RateLimitConfig {
    /// Limiter for a validated config
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::per_minute(saturating_u32(self.max_per_minute))
    }
}

fn saturating_u32(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}

/// Partial options applied on top of the base for one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsOverride {
    pub url: Option<String>,
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    pub from: Option<String>,
    #[serde(alias = "templateDir")]
    pub template_dir: Option<String>,
    pub retry: Option<RetryConfig>,
    #[serde(alias = "rateLimit")]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Unsend plugin options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsendOptions {
    /// API key
    #[serde(alias = "apiKey", default)]
    pub api_key: String,
    /// API base URL
    #[serde(default)]
    pub url: Option<String>,
    /// Default sender address
    #[serde(default)]
    pub from: String,
    /// Template directory, used by host-side loaders
    #[serde(alias = "templateDir", default)]
    pub template_dir: Option<String>,
    /// Retry configuration; absent means a single attempt
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Rate limit; absent means unlimited
    #[serde(alias = "rateLimit", default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Overrides keyed by environment label
    #[serde(default)]
    pub environment: Option<BTreeMap<String, OptionsOverride>>,
}

impl UnsendOptions {
    pub fn new(api_key: &str, from: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            url: None,
            from: from.to_string(),
            template_dir: None,
            retry: None,
            rate_limit: None,
            environment: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_rate_limit(mut self, max_per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimitConfig { max_per_minute });
        self
    }

    pub fn with_override(mut self, environment: Environment, partial: OptionsOverride) -> Self {
        self.environment
            .get_or_insert_with(BTreeMap::new)
            .insert(environment.to_string(), partial);
        self
    }

    /// Parse host-supplied options.
    ///
    /// Count and delay fields that are not integers are reported together
    /// with every other violation instead of failing the parse.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self, ConfigError> {
        let mut malformed = Vec::new();
        take_malformed_numbers(&mut value, "", &mut malformed);
        if let Some(environments) = value.get_mut("environment").and_then(|v| v.as_object_mut()) {
            for (label, partial) in environments.iter_mut() {
                take_malformed_numbers(partial, &format!("environment.{label}."), &mut malformed);
            }
        }

        let options: Self = serde_json::from_value(value)?;
        if malformed.is_empty() {
            return Ok(options);
        }

        let mut violations = match options.validate() {
            Err(ConfigError::Invalid(violations)) => violations,
            _ => Vec::new(),
        };
        violations.extend(malformed);
        Err(ConfigError::Invalid(violations))
    }

    /// Load from `.env` and `UNSEND__*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("UNSEND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn api_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Check every option, reporting all violations together
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        if self.api_key.trim().is_empty() {
            violations.push("Option `api_key` is required in the Unsend options".to_string());
        }
        if self.from.trim().is_empty() {
            violations.push("Option `from` is required in the Unsend options".to_string());
        }
        if let Some(url) = &self.url {
            check_url(url, "url", &mut violations);
        }
        if let Some(retry) = &self.retry {
            check_retry(retry, "retry", &mut violations);
        }
        if let Some(rate_limit) = &self.rate_limit {
            check_rate_limit(rate_limit, "rateLimit", &mut violations);
        }

        for (label, partial) in self.environment.iter().flatten() {
            let Ok(env) = label.parse::<Environment>() else {
                violations.push(format!(
                    "Option `environment.{label}` must be one of: {}",
                    Environment::ALL.map(|e| e.as_str()).join(", ")
                ));
                continue;
            };
            let prefix = format!("environment.{env}");
            if let Some(url) = &partial.url {
                check_url(url, &format!("{prefix}.url"), &mut violations);
            }
            if let Some(retry) = &partial.retry {
                check_retry(retry, &format!("{prefix}.retry"), &mut violations);
            }
            if let Some(rate_limit) = &partial.rate_limit {
                check_rate_limit(rate_limit, &format!("{prefix}.rateLimit"), &mut violations);
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(violations))
        }
    }

    /// Options with the override for `env` applied
    pub fn resolve(&self, env: Environment) -> Self {
        let mut resolved = self.clone();
        resolved.environment = None;

        let partial = self
            .environment
            .iter()
            .flatten()
            .find(|(label, _)| label.parse::<Environment>().ok() == Some(env))
            .map(|(_, partial)| partial.clone());

        if let Some(partial) = partial {
            if let Some(url) = partial.url {
                resolved.url = Some(url);
            }
            if let Some(api_key) = partial.api_key {
                resolved.api_key = api_key;
            }
            if let Some(from) = partial.from {
                resolved.from = from;
            }
            if let Some(dir) = partial.template_dir {
                resolved.template_dir = Some(dir);
            }
            if let Some(retry) = partial.retry {
                resolved.retry = Some(retry);
            }
            if let Some(rate_limit) = partial.rate_limit {
                resolved.rate_limit = Some(rate_limit);
            }
        }

        resolved
    }

    /// Retry policy, or a single attempt when retries are not configured
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.as_ref().map(RetryConfig::policy).unwrap_or_else(RetryPolicy::once)
    }
}

fn check_url(url: &str, field: &str, violations: &mut Vec<String>) {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => violations.push(format!("Option `{field}` must be an absolute http(s) URL")),
    }
}

/// Drop non-integer count and delay fields from an options object, recording a violation for each
fn take_malformed_numbers(options: &mut serde_json::Value, prefix: &str, violations: &mut Vec<String>) {
    let Some(options) = options.as_object_mut() else {
        return;
    };

    if let Some(retry) = options.get_mut("retry") {
        take_non_integer(
            retry,
            &["maxAttempts", "max_attempts"],
            &format!("{prefix}retry.maxAttempts"),
            "a positive integer",
            violations,
        );
        take_non_integer(retry, &["delay"], &format!("{prefix}retry.delay"), "a non-negative integer", violations);
    }
    for key in ["rateLimit", "rate_limit"] {
        if let Some(rate_limit) = options.get_mut(key) {
            take_non_integer(
                rate_limit,
                &["maxPerMinute", "max_per_minute"],
                &format!("{prefix}rateLimit.maxPerMinute"),
                "a positive integer",
                violations,
            );
        }
    }
}

fn take_non_integer(
    block: &mut serde_json::Value,
    keys: &[&str],
    field: &str,
    expected: &str,
    violations: &mut Vec<String>,
) {
    let Some(block) = block.as_object_mut() else {
        return;
    };
    for key in keys {
        if block.get(*key).is_some_and(|v| v.as_i64().is_none()) {
            block.remove(*key);
            violations.push(format!("Option `{field}` must be {expected}"));
        }
    }
}

fn check_count(value: i64, field: &str, violations: &mut Vec<String>) {
    if value < 1 {
        violations.push(format!("Option `{field}` must be a positive integer"));
    } else if value > i64::from(u32::MAX) {
        violations.push(format!("Option `{field}` must be at most {}", u32::MAX));
    }
}

fn check_retry(retry: &RetryConfig, field: &str, violations: &mut Vec<String>) {
    check_count(retry.max_attempts, &format!("{field}.maxAttempts"), violations);
    if retry.delay < 0 {
        violations.push(format!("Option `{field}.delay` must be a non-negative integer"));
    }
}

fn check_rate_limit(rate_limit: &RateLimitConfig, field: &str, violations: &mut Vec<String>) {
    check_count(rate_limit.max_per_minute, &format!("{field}.maxPerMinute"), violations);
}
