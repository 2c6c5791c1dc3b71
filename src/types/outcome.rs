//! Per-task outcome variants.

use serde::{Deserialize, Serialize};

use super::ids::ChangeId;

/// How a single task's pipeline run concluded.
///
/// Every non-fatal way a task can leave the pipeline is an explicit variant
/// here; stages return outcomes instead of mutating shared flow-control
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// A precondition decided the task should not be merged. Not an error.
    Skipped { reason: String },

    /// The interchanges query found nothing to integrate.
    NoChanges,

    /// The change was submitted to the server.
    Submitted { change: ChangeId },

    /// Safe mode paused the pipeline after a successful resolve. The
    /// checkpoint is already advanced to the submit stage; an explicit
    /// resume continues from there.
    Paused { change: ChangeId },
}

impl TaskOutcome {
    /// Returns true if the task finished (reached its terminal stage).
    ///
    /// `Paused` is the one non-terminal outcome: the task's change is still
    /// pending and the campaign must not advance past it.
    pub fn is_complete(&self) -> bool {
        !matches!(self, TaskOutcome::Paused { .. })
    }
}
