//! AWS-backed implementations of the reconciler's seams.
//!
//! - [`AwsClients`]: management-account STS and CloudFormation clients.
//! - [`StackSetRegistry`]: membership via StackSet instances.
//! - [`StsBroker`]: role exchange yielding per-account KMS and SNS clients.

pub mod broker;
pub mod clients;
pub mod errors;
pub mod registry;

pub use broker::StsBroker;
pub use clients::AwsClients;
pub use registry::StackSetRegistry;
