//! Error taxonomy shared across crates.

use thiserror::Error;

/// Why a target failed its pre-mutation checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// `DescribeKey` reported no such key in the target account/region.
    #[error("KMS key {0} not found")]
    KeyNotFound(String),

    /// The assumed role may not describe the key.
    #[error("access denied describing KMS key {0}")]
    KeyAccessDenied(String),

    /// `DescribeKey` failed for a reason other than absence or permissions.
    #[error("could not describe KMS key {key}: {reason}")]
    KeyLookupFailed { key: String, reason: String },

    /// The key exists but is not in the `Enabled` state.
    #[error("KMS key {key} is not enabled (state: {state})")]
    KeyDisabled { key: String, state: String },

    /// SNS server-side encryption only accepts symmetric keys.
    #[error("KMS key {key} has spec {spec}, expected SYMMETRIC_DEFAULT")]
    KeyWrongType { key: String, spec: String },

    /// The security notifications topic is missing or unreadable.
    #[error("SNS topic {0} not found or not accessible")]
    TopicNotFound(String),
}

/// Top-level reconciliation error type.
///
/// Variants split into two classes:
/// - fatal: [`ReconcileError::MalformedIdentifier`] and [`ReconcileError::Unexpected`]
///   abort the whole run before or during planning.
/// - per-account: everything else is recorded against one target and the run
///   continues with the next one.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An input key identifier is not a six-segment ARN.
    #[error("malformed key identifier: {0:?}")]
    MalformedIdentifier(String),

    /// The membership registry could not be queried.
    #[error("membership query failed for account {account}: {reason}")]
    MembershipQuery { account: String, reason: String },

    /// STS rejected the role exchange for the target account.
    #[error("access denied assuming {role} in account {account}: {reason}")]
    AccessDenied {
        account: String,
        role: String,
        reason: String,
    },

    /// A pre-mutation check failed.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationFailure),

    /// The topic attribute update failed after retries or non-transiently.
    #[error("failed to update {topic} after {attempts} attempt(s): {reason}")]
    MutationFailed {
        topic: String,
        attempts: u32,
        reason: String,
    },

    /// Anything the taxonomy above does not cover.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ReconcileError {
    /// Returns `true` if this error should abort the whole run rather than be
    /// recorded against a single account.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::MalformedIdentifier(_) | ReconcileError::Unexpected(_)
        )
    }
}

/// Failure of a single remote service call, classified for retry and
/// validation decisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not authorised for the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Throttling, 5xx, timeouts and connection failures; safe to retry.
    #[error("transient: {0}")]
    Transient(String),

    /// Any other service or client failure.
    #[error("{0}")]
    Other(String),
}

impl CallError {
    /// Returns `true` if the call may succeed when retried unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient(_))
    }
}
