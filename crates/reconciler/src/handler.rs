//! Lambda entry handler: event decoding, the `reconcile` span, and the callback.

use std::time::Duration;

use anyhow::{Context, Result};
use common::protocol::{
    CustomResourceRequest, CustomResourceResponse, RequestType, ResponseData, ResponseStatus,
};
use common::ReconcileError;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::{json, Value};
use tracing::{error, info, info_span, Instrument, Span};

use crate::aws::{AwsClients, StackSetRegistry, StsBroker};
use crate::callback;
use crate::config::Config;
use crate::context::RunContext;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::telemetry::TelemetryGuard;

const PHYSICAL_ID_PREFIX: &str = "sns-kms-";

/// Long-lived state shared by every invocation of a warm environment.
pub struct Handler {
    cfg: Config,
    aws: AwsClients,
    http: reqwest::Client,
    telemetry: TelemetryGuard,
}

impl Handler {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: Config, aws: AwsClients, telemetry: TelemetryGuard) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.callback_timeout_secs))
            .build()
            .context("failed to build callback HTTP client")?;
        Ok(Self {
            cfg,
            aws,
            http,
            telemetry,
        })
    }

    /// Process one custom resource event and flush telemetry before returning.
    pub async fn handle(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        let (payload, context) = event.into_parts();
        let result = self.dispatch(payload, &context.request_id).await;
        self.telemetry.flush();
        result
    }

    async fn dispatch(&self, payload: Value, invocation_id: &str) -> Result<Value, Error> {
        let request: CustomResourceRequest = match serde_json::from_value(payload.clone()) {
            Ok(request) => request,
            Err(e) => return self.reject(&payload, &e).await,
        };

        let span = info_span!(
            "reconcile",
            request_id = %request.request_id,
            request_type = ?request.request_type,
            invocation_id
        );
        let physical_id = physical_id(&request);

        let outcome = self
            .reconcile(&request, span.clone())
            .instrument(span.clone())
            .await;
        if let Err(e) = &outcome {
            span.in_scope(|| error!(error = %e, "reconciliation aborted"));
        }

        let response = callback::build_response(&request, &physical_id, &outcome);
        callback::send_response(&self.http, &request.response_url, &response)
            .instrument(span)
            .await?;

        Ok(json!({
            "Status": response.status,
            "PhysicalResourceId": physical_id,
        }))
    }

    async fn reconcile(&self, request: &CustomResourceRequest, span: Span) -> Result<RunReport, ReconcileError> {
        let identity = self.aws.caller_identity().await?;
        info!(account = %identity.account, partition = %identity.partition, "resolved caller");

        let ctx = RunContext::new(&self.cfg, identity.partition, identity.account, span);
        let registry = StackSetRegistry::new(self.aws.cloudformation.clone(), &self.cfg.stack_set_name);
        let broker = StsBroker::new(self.aws.config.clone(), self.aws.sts.clone(), &ctx);

        Orchestrator::new(&ctx, &registry, &broker).run(request).await
    }

    /// Answer an event that does not decode, if it can be answered at all.
    async fn reject(&self, payload: &Value, err: &serde_json::Error) -> Result<Value, Error> {
        let Some((url, response)) = unreadable_response(payload, err) else {
            error!(error = %err, "event has no ResponseURL; cannot answer CloudFormation");
            return Err(Error::from(format!("unreadable custom resource event: {err}")));
        };
        error!(error = %err, request_id = %response.request_id, "unreadable custom resource event");

        callback::send_response(&self.http, &url, &response).await?;
        Ok(json!({
            "Status": response.status,
            "PhysicalResourceId": response.physical_resource_id,
        }))
    }
}

/// Create mints a fresh id; Update and Delete keep the one CloudFormation holds.
fn physical_id(request: &CustomResourceRequest) -> String {
    match (&request.request_type, &request.physical_resource_id) {
        (RequestType::Create, _) | (_, None) => mint_physical_id(),
        (_, Some(existing)) => existing.clone(),
    }
}

fn mint_physical_id() -> String {
    format!("{PHYSICAL_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

/// FAILED response for an undecodable event, built from whatever fields it has.
fn unreadable_response(payload: &Value, err: &serde_json::Error) -> Option<(String, CustomResourceResponse)> {
    let field = |name: &str| payload.get(name).and_then(Value::as_str).map(str::to_owned);
    let url = field("ResponseURL")?;
    let error = format!("unreadable custom resource event: {err}");

    let response = CustomResourceResponse {
        status: ResponseStatus::Failed,
        reason: error.clone(),
        physical_resource_id: field("PhysicalResourceId").unwrap_or_else(mint_physical_id),
        stack_id: field("StackId").unwrap_or_default(),
        request_id: field("RequestId").unwrap_or_default(),
        logical_resource_id: field("LogicalResourceId").unwrap_or_default(),
        no_echo: false,
        data: ResponseData::Fatal { error },
    };
    Some((url, response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(request_type: &str, physical: Option<&str>) -> Value {
        let mut event = json!({
            "RequestType": request_type,
            "ResponseURL": "https://example.invalid/presigned",
            "StackId": "arn:aws:cloudformation:us-east-1:111111111111:stack/kms/abc",
            "RequestId": "req-1",
            "LogicalResourceId": "SnsKms",
            "ResourceProperties": {
                "KmsKeyArns": "arn:aws:kms:us-east-1:222222222222:key/a"
            }
        });
        if let Some(id) = physical {
            event["PhysicalResourceId"] = json!(id);
        }
        event
    }

    fn parse(value: Value) -> CustomResourceRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn create_mints_a_physical_id() {
        let id = physical_id(&parse(event("Create", None)));
        assert!(id.starts_with(PHYSICAL_ID_PREFIX));
        assert_eq!(id.len(), PHYSICAL_ID_PREFIX.len() + 36);
    }

    #[test]
    fn update_and_delete_echo_the_physical_id() {
        assert_eq!(physical_id(&parse(event("Update", Some("sns-kms-1")))), "sns-kms-1");
        assert_eq!(physical_id(&parse(event("Delete", Some("sns-kms-1")))), "sns-kms-1");
    }

    #[test]
    fn update_without_physical_id_mints_one() {
        assert!(physical_id(&parse(event("Update", None))).starts_with(PHYSICAL_ID_PREFIX));
    }

    fn decode_error(value: &Value) -> serde_json::Error {
        serde_json::from_value::<CustomResourceRequest>(value.clone()).unwrap_err()
    }

    #[test]
    fn unreadable_event_with_url_is_answered_failed() {
        let mut bad = event("Update", Some("sns-kms-1"));
        bad["RequestType"] = json!("Replace");
        let err = decode_error(&bad);

        let (url, response) = unreadable_response(&bad, &err).unwrap();
        assert_eq!(url, "https://example.invalid/presigned");
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.physical_resource_id, "sns-kms-1");
        assert_eq!(response.request_id, "req-1");
        assert!(matches!(response.data, ResponseData::Fatal { .. }));
    }

    #[test]
    fn event_without_url_cannot_be_answered() {
        let bad = json!({ "RequestType": "Create" });
        let err = decode_error(&bad);
        assert!(unreadable_response(&bad, &err).is_none());
    }
}
