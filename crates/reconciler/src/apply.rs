//! Topic encryption mutations, the only writes this service performs.
//!
//! Both operations are idempotent: writing the same `KmsMasterKeyId` twice
//! leaves the topic unchanged.

use common::ReconcileError;
use tracing::{debug, info, warn};

use crate::access::TargetAccount;
use crate::context::RetryPolicy;

/// Point `topic_arn` at `key_id`.
///
/// # Errors
///
/// Returns [`ReconcileError::MutationFailed`] once retries are exhausted or a
/// non-transient error is returned.
pub async fn set_key(
    account: &dyn TargetAccount,
    topic_arn: &str,
    key_id: &str,
    retry: &RetryPolicy,
) -> Result<(), ReconcileError> {
    write_key_attribute(account, topic_arn, key_id, retry).await?;
    info!(topic = topic_arn, key = key_id, "topic encryption key set");
    Ok(())
}

/// Revert `topic_arn` to the service-managed key.
///
/// # Errors
///
/// Same as [`set_key`].
pub async fn clear_key(
    account: &dyn TargetAccount,
    topic_arn: &str,
    retry: &RetryPolicy,
) -> Result<(), ReconcileError> {
    write_key_attribute(account, topic_arn, "", retry).await?;
    info!(topic = topic_arn, "topic encryption key cleared");
    Ok(())
}

async fn write_key_attribute(
    account: &dyn TargetAccount,
    topic_arn: &str,
    value: &str,
    retry: &RetryPolicy,
) -> Result<(), ReconcileError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match account.set_topic_key(topic_arn, value).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = retry.delay(attempt);
                warn!(topic = topic_arn, attempt, ?delay, error = %e, "transient failure; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(topic = topic_arn, attempt, "giving up");
                return Err(ReconcileError::MutationFailed {
                    topic: topic_arn.to_owned(),
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }
        }
    }
}
