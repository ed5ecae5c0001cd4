//! Read-only pre-mutation checks on the key and the topic.

use common::{CallError, ValidationFailure};

use crate::access::TargetAccount;

/// KMS state of a usable key.
const KEY_STATE_ENABLED: &str = "Enabled";

/// The only key spec SNS server-side encryption accepts.
const KEY_SPEC_SYMMETRIC: &str = "SYMMETRIC_DEFAULT";

/// Confirm `key_id` exists, is enabled and is a symmetric key.
///
/// # Errors
///
/// Returns a [`ValidationFailure`] naming the first failed condition.
pub async fn check_key(account: &dyn TargetAccount, key_id: &str) -> Result<(), ValidationFailure> {
    let key = account.describe_key(key_id).await.map_err(|e| match e {
        CallError::NotFound(_) => ValidationFailure::KeyNotFound(key_id.to_owned()),
        CallError::AccessDenied(_) => ValidationFailure::KeyAccessDenied(key_id.to_owned()),
        CallError::Transient(reason) | CallError::Other(reason) => ValidationFailure::KeyLookupFailed {
            key: key_id.to_owned(),
            reason,
        },
    })?;

    if key.state != KEY_STATE_ENABLED {
        return Err(ValidationFailure::KeyDisabled {
            key: key_id.to_owned(),
            state: key.state,
        });
    }
    if key.spec != KEY_SPEC_SYMMETRIC {
        return Err(ValidationFailure::KeyWrongType {
            key: key_id.to_owned(),
            spec: key.spec,
        });
    }
    Ok(())
}

/// Confirm the managed topic exists and is readable.
///
/// # Errors
///
/// Returns [`ValidationFailure::TopicNotFound`] on any lookup failure.
pub async fn check_topic(account: &dyn TargetAccount, topic_arn: &str) -> Result<(), ValidationFailure> {
    account
        .get_topic(topic_arn)
        .await
        .map_err(|_| ValidationFailure::TopicNotFound(topic_arn.to_owned()))
}
