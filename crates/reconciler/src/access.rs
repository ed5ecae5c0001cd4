//! Cross-account access: the seam between orchestration and per-account AWS calls.
//!
//! An [`AccessBroker`] hands out one [`TargetAccount`] per target. The handle
//! owns credentials scoped to that account and region and is dropped as soon
//! as the target has been processed; nothing is cached across targets.

use async_trait::async_trait;
use common::{CallError, ReconcileError};

use crate::plan::AccountRegion;

/// Key metadata relevant to SNS server-side encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescription {
    /// KMS key state, e.g. `Enabled`, `Disabled`, `PendingDeletion`.
    pub state: String,
    /// KMS key spec, e.g. `SYMMETRIC_DEFAULT`.
    pub spec: String,
}

/// Operations performed inside one target account/region.
#[async_trait]
pub trait TargetAccount: Send + Sync {
    /// Resolve key metadata for `key_id`.
    async fn describe_key(&self, key_id: &str) -> Result<KeyDescription, CallError>;

    /// Succeeds if the topic exists and is readable.
    async fn get_topic(&self, topic_arn: &str) -> Result<(), CallError>;

    /// Set `KmsMasterKeyId` on the topic; an empty value restores the
    /// service-managed key.
    async fn set_topic_key(&self, topic_arn: &str, key_id: &str) -> Result<(), CallError>;
}

/// Exchanges the invoker's identity for access to a target account.
#[async_trait]
pub trait AccessBroker: Send + Sync {
    /// Open a handle for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::AccessDenied`] if the role exchange is rejected.
    async fn open(&self, target: &AccountRegion) -> Result<Box<dyn TargetAccount>, ReconcileError>;
}

/// Role ARN for `role_name` in `account`.
pub fn role_arn(partition: &str, account: &str, role_name: &str) -> String {
    format!("arn:{partition}:iam::{account}:role/{role_name}")
}

/// STS session name, traceable in CloudTrail back to the target.
pub fn session_name(account: &str, role_name: &str) -> String {
    // STS caps session names at 64 characters.
    let mut name = format!("{account}-{role_name}");
    name.truncate(64);
    name
}
