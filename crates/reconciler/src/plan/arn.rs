//! KMS key ARN parsing.

use common::ReconcileError;

/// Number of `:`-separated segments in a well-formed ARN.
const ARN_SEGMENTS: usize = 6;

/// Composite index for a target: one topic exists per (account, region).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountRegion {
    pub account: String,
    pub region: String,
}

impl AccountRegion {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

impl std::fmt::Display for AccountRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.region)
    }
}

/// A parsed key ARN.
///
/// `raw` is the trimmed input and is what gets written to the topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReference {
    pub partition: String,
    pub region: String,
    pub account: String,
    pub raw: String,
}

impl KeyReference {
    /// Parse `arn:<partition>:<service>:<region>:<account>:<resource>`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MalformedIdentifier`] if the trimmed input is
    /// empty or does not split into exactly six segments.
    pub fn parse(input: &str) -> Result<Self, ReconcileError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ReconcileError::MalformedIdentifier(input.to_owned()));
        }

        let segments: Vec<&str> = raw.split(':').collect();
        if segments.len() != ARN_SEGMENTS {
            return Err(ReconcileError::MalformedIdentifier(raw.to_owned()));
        }

        Ok(Self {
            partition: segments[1].to_owned(),
            region: segments[3].to_owned(),
            account: segments[4].to_owned(),
            raw: raw.to_owned(),
        })
    }

    pub fn target(&self) -> AccountRegion {
        AccountRegion::new(&self.account, &self.region)
    }
}
