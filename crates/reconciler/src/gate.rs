//! Membership gate: only accounts enrolled in the governing StackSet are touched.

use async_trait::async_trait;
use common::{CallError, ReconcileError};
use tracing::{debug, warn};

/// Registry of accounts governed by the automation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    /// Returns `true` if any membership record exists for `account`.
    async fn has_member(&self, account: &str) -> Result<bool, CallError>;
}

/// Decide whether `account` may be mutated.
///
/// Registry failures are logged and treated as "not a member" so a registry
/// outage skips accounts instead of failing the run.
pub async fn is_member(registry: &dyn MembershipRegistry, account: &str) -> bool {
    match registry.has_member(account).await {
        Ok(true) => true,
        Ok(false) => {
            debug!(account, "account is not a governed member; skipping");
            false
        }
        Err(e) => {
            let e = ReconcileError::MembershipQuery {
                account: account.to_owned(),
                reason: e.to_string(),
            };
            warn!(error = %e, "treating account as non-member");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn member_passes() {
        let mut registry = MockMembershipRegistry::new();
        registry
            .expect_has_member()
            .with(eq("111111111111"))
            .times(1)
            .returning(|_| Ok(true));
        assert!(is_member(&registry, "111111111111").await);
    }

    #[tokio::test]
    async fn non_member_is_rejected() {
        let mut registry = MockMembershipRegistry::new();
        registry.expect_has_member().returning(|_| Ok(false));
        assert!(!is_member(&registry, "111111111111").await);
    }

    #[tokio::test]
    async fn query_error_fails_closed() {
        let mut registry = MockMembershipRegistry::new();
        registry
            .expect_has_member()
            .returning(|_| Err(CallError::Transient("throttled".into())));
        assert!(!is_member(&registry, "111111111111").await);
    }
}
