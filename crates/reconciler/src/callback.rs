//! CloudFormation response document assembly and upload.

use anyhow::{bail, Context, Result};
use common::protocol::{CustomResourceRequest, CustomResourceResponse, ResponseData, ResponseStatus};
use common::ReconcileError;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use tracing::{info, instrument};

use crate::orchestrator::RunReport;

/// Upper bound on `Reason`. Per-target detail lives in `Data`, not here.
const MAX_REASON_LEN: usize = 1024;

/// Turn the outcome of a run into the response document for `request`.
pub fn build_response(
    request: &CustomResourceRequest,
    physical_id: &str,
    outcome: &Result<RunReport, ReconcileError>,
) -> CustomResourceResponse {
    match outcome {
        Ok(report) => {
            let reason = if report.target_count == 0 {
                "no targets to reconcile".to_owned()
            } else if report.errors.is_empty() {
                format!("reconciled {} of {} targets", report.success_count, report.target_count)
            } else {
                format!(
                    "reconciled {} of {} targets; {} failed (see Errors)",
                    report.success_count,
                    report.target_count,
                    report.errors.len()
                )
            };
            CustomResourceResponse::for_request(
                request,
                physical_id,
                report.status(),
                truncate(reason),
                ResponseData::Report {
                    success_count: report.success_count,
                    processed_topics: report.processed_topics.clone(),
                    errors: report.errors.clone(),
                },
            )
        }
        Err(e) => failed(request, physical_id, e.to_string()),
    }
}

/// A FAILED document carrying a single top-level error.
pub fn failed(request: &CustomResourceRequest, physical_id: &str, error: String) -> CustomResourceResponse {
    CustomResourceResponse::for_request(
        request,
        physical_id,
        ResponseStatus::Failed,
        truncate(error.clone()),
        ResponseData::Fatal { error },
    )
}

/// PUT `response` to the pre-signed `url`.
///
/// The pre-signed URL is signed without a content type, so the header is sent empty.
///
/// # Errors
///
/// Returns an error on transport failure or a non-2xx status.
#[instrument(skip_all, fields(status = ?response.status))]
pub async fn send_response(client: &reqwest::Client, url: &str, response: &CustomResourceResponse) -> Result<()> {
    let body = serde_json::to_vec(response).context("failed to serialise response document")?;

    let resp = client
        .put(url)
        .header(CONTENT_TYPE, HeaderValue::from_static(""))
        .body(body)
        .send()
        .await
        .context("failed to upload response document")?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("response upload rejected with {status}: {text}");
    }

    info!(http_status = status.as_u16(), "response document uploaded");
    Ok(())
}

fn truncate(mut reason: String) -> String {
    if reason.len() > MAX_REASON_LEN {
        let mut end = MAX_REASON_LEN - 3;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
        reason.push_str("...");
    }
    reason
}
