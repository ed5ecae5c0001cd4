//! Shared error taxonomy and custom resource protocol types for `topic-key-reconciler`.

pub mod error;
pub mod protocol;

pub use error::{CallError, ReconcileError, ValidationFailure};
