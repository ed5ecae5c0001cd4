//! Structured logging, with optional OpenTelemetry span export.
//!
//! Logs are JSON lines on stdout, which Lambda ships to CloudWatch Logs.
//! When `OTEL_EXPORTER_OTLP_ENDPOINT` is set (e.g. the ADOT collector layer),
//! spans are also exported over OTLP/gRPC.
//!
//! # Telemetry invariants
//!
//! - **No credential material** (access keys, secrets, session tokens) may
//!   appear in any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when present.

pub mod init;

pub use init::{init_telemetry, TelemetryGuard};
