//! Drives one change event from plan to report.
//!
//! ```text
//! Received ─► Planning ─► Applying (updates, then removals) ─► Reporting
//! ```
//!
//! Targets are processed sequentially. Per target:
//! membership gate → role exchange → validation (updates only) → mutation.
//! Per-account failures become report entries; only planning errors and
//! [`ReconcileError::Unexpected`] abort the run.

use common::protocol::{CustomResourceRequest, RequestType, ResponseStatus};
use common::ReconcileError;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::access::AccessBroker;
use crate::apply;
use crate::context::RunContext;
use crate::gate::{self, MembershipRegistry};
use crate::plan::{self, AccountRegion, KeyReference, ReconciliationPlan};
use crate::validate;

/// Result of one successfully processed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub topic_arn: String,
    pub message: String,
}

/// Aggregate of every target in the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub target_count: usize,
    pub success_count: usize,
    pub processed_topics: Vec<String>,
    pub errors: Vec<String>,
}

impl RunReport {
    /// Best-effort batch semantics: the run succeeds if anything was applied,
    /// or if there was nothing to apply.
    pub fn status(&self) -> ResponseStatus {
        if self.success_count > 0 || self.target_count == 0 {
            ResponseStatus::Success
        } else {
            ResponseStatus::Failed
        }
    }

    fn record(
        &mut self,
        target: &AccountRegion,
        result: Result<Option<OperationOutcome>, ReconcileError>,
    ) -> Result<(), ReconcileError> {
        match result {
            Ok(Some(outcome)) => {
                debug!(%target, topic = %outcome.topic_arn, "target applied");
                self.success_count += 1;
                self.processed_topics.push(outcome.message);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(%target, error = %e, "target failed");
                self.errors.push(format!("{target}: {e}"));
                Ok(())
            }
        }
    }
}

/// Derive the plan for `request` without touching any account.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedIdentifier`] for any invalid key ARN.
pub fn plan_request(request: &CustomResourceRequest) -> Result<ReconciliationPlan, ReconcileError> {
    let desired = request.resource_properties.kms_key_arns.entries();
    match request.request_type {
        RequestType::Delete => Ok(ReconciliationPlan {
            updates: Vec::new(),
            removals: plan::accounts_to_remove(desired)?,
        }),
        RequestType::Create | RequestType::Update => {
            let previous = request
                .old_resource_properties
                .as_ref()
                .map(|p| p.kms_key_arns.entries())
                .unwrap_or_default();
            plan::plan_updates(desired, previous)
        }
    }
}

/// Applies a [`ReconciliationPlan`] across accounts.
pub struct Orchestrator<'a> {
    ctx: &'a RunContext,
    registry: &'a dyn MembershipRegistry,
    broker: &'a dyn AccessBroker,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        ctx: &'a RunContext,
        registry: &'a dyn MembershipRegistry,
        broker: &'a dyn AccessBroker,
    ) -> Self {
        Self {
            ctx,
            registry,
            broker,
        }
    }

    /// Plan and apply `request`.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ReconcileError`]; per-account failures are in the report.
    pub async fn run(&self, request: &CustomResourceRequest) -> Result<RunReport, ReconcileError> {
        let plan = plan_request(request)?;
        info!(
            updates = plan.updates.len(),
            removals = plan.removals.len(),
            "reconciliation planned"
        );
        if plan.is_empty() {
            info!("nothing to reconcile");
        }
        self.apply(&plan).await
    }

    /// Process every target of `plan` in order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ReconcileError`], abandoning remaining targets.
    pub async fn apply(&self, plan: &ReconciliationPlan) -> Result<RunReport, ReconcileError> {
        let mut report = RunReport {
            target_count: plan.target_count(),
            ..RunReport::default()
        };

        for key in &plan.updates {
            let target = key.target();
            let result = self
                .update_target(key)
                .instrument(self.target_span(&target, "update"))
                .await;
            report.record(&target, result)?;
        }

        for target in &plan.removals {
            let result = self
                .remove_target(target)
                .instrument(self.target_span(target, "remove"))
                .await;
            report.record(target, result)?;
        }

        info!(
            targets = report.target_count,
            succeeded = report.success_count,
            failed = report.errors.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn update_target(&self, key: &KeyReference) -> Result<Option<OperationOutcome>, ReconcileError> {
        if !gate::is_member(self.registry, &key.account).await {
            return Ok(None);
        }

        let target = key.target();
        let account = self.broker.open(&target).await?;
        let topic_arn = self.ctx.topic_arn(&target);

        validate::check_key(account.as_ref(), &key.raw).await?;
        validate::check_topic(account.as_ref(), &topic_arn).await?;
        apply::set_key(account.as_ref(), &topic_arn, &key.raw, &self.ctx.retry).await?;

        Ok(Some(OperationOutcome {
            message: format!("{topic_arn}: encrypted with {}", key.raw),
            topic_arn,
        }))
    }

    async fn remove_target(&self, target: &AccountRegion) -> Result<Option<OperationOutcome>, ReconcileError> {
        if !gate::is_member(self.registry, &target.account).await {
            return Ok(None);
        }

        let account = self.broker.open(target).await?;
        let topic_arn = self.ctx.topic_arn(target);

        apply::clear_key(account.as_ref(), &topic_arn, &self.ctx.retry).await?;

        Ok(Some(OperationOutcome {
            message: format!("{topic_arn}: reverted to AWS managed key"),
            topic_arn,
        }))
    }

    fn target_span(&self, target: &AccountRegion, action: &'static str) -> tracing::Span {
        debug!(%target, action, "processing target");
        info_span!(
            parent: &self.ctx.span,
            "account",
            account = %target.account,
            region = %target.region,
            action
        )
    }
}
