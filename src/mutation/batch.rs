use serde::Serialize;

use crate::store::ItemOutcome;
use crate::types::Identity;

/// Overall shape of a batch's outcomes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Nothing was submitted.
    Empty,
    /// Every submitted item was applied.
    AllSucceeded,
    /// Some items were applied and some were not.
    Partial,
    /// No submitted item was applied.
    AllFailed,
}

/// Per-item results of one logical bulk mutation.
///
/// Holds one outcome per distinct identity submitted, in first-seen order.
/// Identities that were not submitted because the store did not hold them
/// (deletes only) are listed in `skipped`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BatchReport {
    /// Outcome of each submitted item.
    pub outcomes: Vec<ItemOutcome>,
    /// Identities not submitted because they were absent.
    pub skipped: Vec<Identity>,
}

impl BatchReport {
    /// Number of applied items.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Items that were not applied.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Classifies the outcomes.
    pub fn status(&self) -> BatchStatus {
        let ok = self.succeeded();
        match (self.outcomes.len(), ok) {
            (0, _) => BatchStatus::Empty,
            (total, ok) if ok == total => BatchStatus::AllSucceeded,
            (_, 0) => BatchStatus::AllFailed,
            _ => BatchStatus::Partial,
        }
    }

    /// Whether no submitted item failed.
    pub fn is_complete(&self) -> bool {
        matches!(self.status(), BatchStatus::Empty | BatchStatus::AllSucceeded)
    }

    pub(crate) fn extend(&mut self, other: BatchReport) {
        self.outcomes.extend(other.outcomes);
        self.skipped.extend(other.skipped);
    }
}
