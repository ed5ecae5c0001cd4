//! AWS SDK clients for the invoking (management) account.

use aws_config::{BehaviorVersion, SdkConfig};
use aws_smithy_types::error::display::DisplayErrorContext;
use common::ReconcileError;

/// Bundle of management-account clients.
///
/// All clients share the same [`SdkConfig`], which is also the base for the
/// per-account clients built after a role exchange.
#[derive(Clone)]
pub struct AwsClients {
    /// Ambient SDK configuration (region and credentials of the Lambda role).
    pub config: SdkConfig,
    /// STS client used to resolve the caller and assume execution roles.
    pub sts: aws_sdk_sts::Client,
    /// CloudFormation client used to list StackSet instances.
    pub cloudformation: aws_sdk_cloudformation::Client,
}

/// Identity of the account the function runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub partition: String,
}

impl AwsClients {
    /// Initialise all clients from the standard credential chain.
    pub async fn init() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        Self {
            sts: aws_sdk_sts::Client::new(&config),
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            config,
        }
    }

    /// Resolve the caller's account and partition.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Unexpected`]; without a caller identity no
    /// role ARN can be built, so the run cannot proceed.
    pub async fn caller_identity(&self) -> Result<CallerIdentity, ReconcileError> {
        let out = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                ReconcileError::Unexpected(format!(
                    "GetCallerIdentity failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let account = out
            .account()
            .ok_or_else(|| ReconcileError::Unexpected("GetCallerIdentity returned no account".into()))?;
        let partition = out
            .arn()
            .and_then(partition_of)
            .ok_or_else(|| ReconcileError::Unexpected("GetCallerIdentity returned no ARN".into()))?;

        Ok(CallerIdentity {
            account: account.to_owned(),
            partition: partition.to_owned(),
        })
    }
}

/// Partition segment of any ARN.
fn partition_of(arn: &str) -> Option<&str> {
    let mut parts = arn.split(':');
    match (parts.next(), parts.next()) {
        (Some("arn"), Some(partition)) if !partition.is_empty() => Some(partition),
        _ => None,
    }
}
