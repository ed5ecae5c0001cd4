//! Configuration loading and validation for the reconciler Lambda.
//!
//! All values are read from environment variables at cold start. The function
//! refuses to start if any value is invalid, so a misconfigured deployment
//! fails fast instead of answering CloudFormation with a half-applied run.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::context::RetryPolicy;

/// Validated reconciler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Role assumed in each target account.
    #[serde(default = "default_execution_role_name")]
    pub execution_role_name: String,

    /// StackSet whose instances define the governed accounts.
    #[serde(default = "default_stack_set_name")]
    pub stack_set_name: String,

    /// Name of the per-account, per-region topic whose key is managed.
    #[serde(default = "default_topic_name")]
    pub topic_name: String,

    /// Attempts per topic mutation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff between mutation attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Backoff ceiling between mutation attempts.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Timeout for uploading the response document to CloudFormation.
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,

    /// OTLP endpoint. Spans are exported only when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_execution_role_name() -> String {
    "AWSControlTowerExecution".into()
}
fn default_stack_set_name() -> String {
    "AWSControlTowerBP-BASELINE-CLOUDWATCH".into()
}
fn default_topic_name() -> String {
    "aws-controltower-SecurityNotifications".into()
}
fn default_max_attempts() -> u32 {
    10
}
fn default_retry_base_delay_ms() -> u64 {
    200
}
fn default_retry_max_delay_ms() -> u64 {
    5000
}
fn default_callback_timeout_secs() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Mutation retry settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.execution_role_name, "EXECUTION_ROLE_NAME")?;
        ensure_non_empty(&self.stack_set_name, "STACK_SET_NAME")?;
        ensure_non_empty(&self.topic_name, "TOPIC_NAME")?;

        if self.max_attempts == 0 {
            anyhow::bail!("MAX_ATTEMPTS must be > 0");
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            anyhow::bail!("RETRY_BASE_DELAY_MS must not exceed RETRY_MAX_DELAY_MS");
        }
        if self.callback_timeout_secs == 0 {
            anyhow::bail!("CALLBACK_TIMEOUT_SECS must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
