//! STS role exchange and the per-account KMS/SNS clients it yields.

use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_kms::types::KeyMetadata;
use aws_sdk_sns::config::retry::RetryConfig;
use aws_smithy_types::error::display::DisplayErrorContext;
use common::{CallError, ReconcileError};
use tracing::debug;

use super::errors::classify;
use crate::access::{role_arn, session_name, AccessBroker, KeyDescription, TargetAccount};
use crate::context::RunContext;
use crate::plan::AccountRegion;

/// SNS topic attribute holding the server-side encryption key.
const KMS_MASTER_KEY_ATTRIBUTE: &str = "KmsMasterKeyId";

const UNKNOWN_KEY_SPEC: &str = "unknown";

/// Assumes the execution role in each target account.
pub struct StsBroker {
    base: SdkConfig,
    sts: aws_sdk_sts::Client,
    partition: String,
    caller_account: String,
    role_name: String,
}

impl StsBroker {
    pub fn new(base: SdkConfig, sts: aws_sdk_sts::Client, ctx: &RunContext) -> Self {
        Self {
            base,
            sts,
            partition: ctx.partition.clone(),
            caller_account: ctx.caller_account.clone(),
            role_name: ctx.role_name.clone(),
        }
    }

    fn denied(&self, account: &str, reason: impl Into<String>) -> ReconcileError {
        ReconcileError::AccessDenied {
            account: account.to_owned(),
            role: self.role_name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AccessBroker for StsBroker {
    async fn open(&self, target: &AccountRegion) -> Result<Box<dyn TargetAccount>, ReconcileError> {
        let region = Region::new(target.region.clone());

        // The execution role is not provisioned in the management account itself.
        if target.account == self.caller_account {
            debug!(%target, "target is the caller account; using ambient credentials");
            return Ok(Box::new(AccountClients::new(&self.base, region, None)));
        }

        let role = role_arn(&self.partition, &target.account, &self.role_name);
        let out = self
            .sts
            .assume_role()
            .role_arn(&role)
            .role_session_name(session_name(&target.account, &self.role_name))
            .send()
            .await
            .map_err(|e| self.denied(&target.account, DisplayErrorContext(&e).to_string()))?;

        let creds = out
            .credentials()
            .ok_or_else(|| self.denied(&target.account, "AssumeRole returned no credentials"))?;

        let credentials = Credentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            Some(creds.session_token().to_owned()),
            SystemTime::try_from(*creds.expiration()).ok(),
            "AssumeRole",
        );
        debug!(%target, role = %role, "assumed execution role");

        Ok(Box::new(AccountClients::new(&self.base, region, Some(credentials))))
    }
}

/// Reduce KMS key metadata to the fields the validator checks.
fn describe(meta: &KeyMetadata) -> KeyDescription {
    let state = match meta.key_state() {
        Some(state) => state.as_str().to_owned(),
        None if meta.enabled() => "Enabled".to_owned(),
        None => "Disabled".to_owned(),
    };
    let spec = meta
        .key_spec()
        .map_or_else(|| UNKNOWN_KEY_SPEC.to_owned(), |spec| spec.as_str().to_owned());
    KeyDescription { state, spec }
}

/// KMS and SNS clients bound to one account and region.
pub struct AccountClients {
    kms: aws_sdk_kms::Client,
    sns: aws_sdk_sns::Client,
}

impl AccountClients {
    /// Build clients from `base`, overriding region and, if given, credentials.
    fn new(base: &SdkConfig, region: Region, credentials: Option<Credentials>) -> Self {
        let mut kms = aws_sdk_kms::config::Builder::from(base).region(region.clone());
        let mut sns = aws_sdk_sns::config::Builder::from(base).region(region);
        if let Some(credentials) = credentials {
            kms = kms.credentials_provider(credentials.clone());
            sns = sns.credentials_provider(credentials);
        }
        Self {
            kms: aws_sdk_kms::Client::from_conf(kms.build()),
            sns: aws_sdk_sns::Client::from_conf(sns.build()),
        }
    }
}

#[async_trait]
impl TargetAccount for AccountClients {
    async fn describe_key(&self, key_id: &str) -> Result<KeyDescription, CallError> {
        let out = self
            .kms
            .describe_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(classify)?;

        let meta = out
            .key_metadata()
            .ok_or_else(|| CallError::NotFound(format!("{key_id}: no key metadata returned")))?;

        Ok(describe(meta))
    }

    async fn get_topic(&self, topic_arn: &str) -> Result<(), CallError> {
        self.sns
            .get_topic_attributes()
            .topic_arn(topic_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn set_topic_key(&self, topic_arn: &str, key_id: &str) -> Result<(), CallError> {
        // Retries are owned by the applier's policy, not the SDK.
        self.sns
            .set_topic_attributes()
            .topic_arn(topic_arn)
            .attribute_name(KMS_MASTER_KEY_ATTRIBUTE)
            .attribute_value(key_id)
            .customize()
            .config_override(aws_sdk_sns::config::Builder::default().retry_config(RetryConfig::disabled()))
            .send()
            .await
            .map(|_| ())
            .map_err(classify)
    }
}
