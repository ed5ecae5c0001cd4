//! Reconciliation planning: which topics get a new key and which get cleared.
//!
//! # Module invariants
//!
//! - **Pure.** Nothing here performs I/O; a malformed identifier is reported
//!   before any AWS call is made.
//! - Updates and removals never share an [`AccountRegion`].
//! - Iteration order is first-insertion order of each target; a later entry
//!   for the same target replaces the key but keeps the position.

pub mod arn;

pub use arn::{AccountRegion, KeyReference};

use std::collections::{HashMap, HashSet};

use common::ReconcileError;

/// Targets derived from one change event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Topics to point at a customer-managed key.
    pub updates: Vec<KeyReference>,
    /// Topics to revert to the service-managed key.
    pub removals: Vec<AccountRegion>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.removals.is_empty()
    }

    pub fn target_count(&self) -> usize {
        self.updates.len() + self.removals.len()
    }
}

/// Every previously configured target, for tearing the whole resource down.
///
/// The first occurrence of a target decides its position.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedIdentifier`] for any non-blank entry
/// that is not a valid ARN.
pub fn accounts_to_remove<S: AsRef<str>>(
    previous: &[S],
) -> Result<Vec<AccountRegion>, ReconcileError> {
    Ok(index_by_target(previous)?
        .into_iter()
        .map(|k| k.target())
        .collect())
}

/// Diff the desired key list against the previously applied one.
///
/// # Errors
///
/// Returns [`ReconcileError::MalformedIdentifier`] for any non-blank entry in
/// either list that is not a valid ARN.
pub fn plan_updates<S: AsRef<str>, T: AsRef<str>>(
    desired: &[S],
    previous: &[T],
) -> Result<ReconciliationPlan, ReconcileError> {
    let updates = index_by_target(desired)?;
    let previous = index_by_target(previous)?;

    let desired: HashSet<AccountRegion> = updates.iter().map(KeyReference::target).collect();
    let removals = previous
        .into_iter()
        .map(|k| k.target())
        .filter(|target| !desired.contains(target))
        .collect();

    Ok(ReconciliationPlan { updates, removals })
}

/// Parse `ids` into one key per target, last value wins, first position kept.
fn index_by_target<S: AsRef<str>>(ids: &[S]) -> Result<Vec<KeyReference>, ReconcileError> {
    let mut ordered: Vec<KeyReference> = Vec::with_capacity(ids.len());
    let mut position: HashMap<AccountRegion, usize> = HashMap::new();

    for id in ids {
        let id = id.as_ref();
        if id.trim().is_empty() {
            continue;
        }
        let key = KeyReference::parse(id)?;
        match position.get(&key.target()) {
            Some(&i) => ordered[i] = key,
            None => {
                position.insert(key.target(), ordered.len());
                ordered.push(key);
            }
        }
    }

    Ok(ordered)
}
