//! `topic-key-reconciler`: CloudFormation custom resource Lambda entry point.
//!
//! Startup sequence (once per cold start):
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Initialise management-account AWS SDK clients.
//! 4. Hand the [`Handler`] to the Lambda runtime loop.

mod access;
mod apply;
mod aws;
mod callback;
mod config;
mod context;
mod gate;
mod handler;
mod orchestrator;
mod plan;
mod telemetry;
mod validate;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing::info;

use config::Config;
use handler::Handler;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    let telemetry =
        telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        stack_set = %cfg.stack_set_name,
        topic = %cfg.topic_name,
        "topic-key-reconciler starting"
    );

    // -----------------------------------------------------------------------
    // 3. AWS clients
    // -----------------------------------------------------------------------
    let aws = aws::AwsClients::init().await;

    // -----------------------------------------------------------------------
    // 4. Runtime loop
    // -----------------------------------------------------------------------
    let handler = Arc::new(Handler::new(cfg, aws, telemetry)?);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move { handler.handle(event).await }
    }))
    .await
    .map_err(|e| anyhow!(e))
}
