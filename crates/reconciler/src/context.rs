//! Per-invocation context threaded through every component.

use std::time::Duration;

use tracing::Span;

use crate::config::Config;
use crate::plan::AccountRegion;

/// Bounded exponential backoff for topic mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Settings and log scope for one custom resource invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Partition of the invoking account (`aws`, `aws-cn`, `aws-us-gov`).
    pub partition: String,
    /// Account the Lambda runs in; targets in this account skip the role exchange.
    pub caller_account: String,
    pub role_name: String,
    pub topic_name: String,
    pub retry: RetryPolicy,
    /// Parent span for all per-account spans of this invocation.
    pub span: Span,
}

impl RunContext {
    pub fn new(cfg: &Config, partition: String, caller_account: String, span: Span) -> Self {
        Self {
            partition,
            caller_account,
            role_name: cfg.execution_role_name.clone(),
            topic_name: cfg.topic_name.clone(),
            retry: cfg.retry_policy(),
            span,
        }
    }

    /// ARN of the managed topic in `target`.
    pub fn topic_arn(&self, target: &AccountRegion) -> String {
        format!(
            "arn:{}:sns:{}:{}:{}",
            self.partition, target.region, target.account, self.topic_name
        )
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> RunContext {
    RunContext {
        partition: "aws".into(),
        caller_account: "999999999999".into(),
        role_name: "AWSControlTowerExecution".into(),
        topic_name: "aws-controltower-SecurityNotifications".into(),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        span: Span::none(),
    }
}
