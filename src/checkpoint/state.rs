//! The persisted campaign state.
//!
//! [`CampaignState`] is the single source of truth for resumability. It is
//! created fresh when a campaign starts, mutated after every stage
//! transition and every failure, and deleted once the last task reaches its
//! terminal stage — deleting it is the signal that the whole campaign
//! finished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChangeId, Stage, TaskIndex};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Durable record of campaign progress.
///
/// A crash between two saves loses at most one stage's worth of progress;
/// every stage is either naturally idempotent on re-entry or recoverable
/// via rollback of the active change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignState {
    /// Schema version for forward-compatible migrations.
    pub schema_version: u32,

    /// When this checkpoint was last written (ISO 8601).
    pub saved_at: DateTime<Utc>,

    /// Where the task-list definition was loaded from, for the operator's
    /// benefit when inspecting a checkpoint by hand.
    pub definition_source: String,

    /// Content hash of the task-list source at the time the run began.
    /// Indices and branch identities below are only meaningful relative to
    /// this exact definition revision.
    pub fingerprint: String,

    /// 1-based index of the next task to execute. Tasks before it are
    /// complete and only echoed on resume.
    pub resume_task: TaskIndex,

    /// The stage the current task is in (or will re-enter on resume).
    pub stage: Stage,

    /// The pending change owned by this run, or [`ChangeId::NONE`]. While
    /// non-zero, the engine must either complete the change or roll it back
    /// before doing anything else with the task.
    pub active_change: ChangeId,

    /// Append-only log of human-readable outcome lines, preserved verbatim
    /// across resumes so the final summary covers tasks run by earlier
    /// processes.
    pub report: Vec<String>,
}

impl CampaignState {
    /// Creates the state for a freshly started campaign.
    pub fn new(definition_source: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        CampaignState {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            definition_source: definition_source.into(),
            fingerprint: fingerprint.into(),
            resume_task: TaskIndex::FIRST,
            stage: Stage::Start,
            active_change: ChangeId::NONE,
            report: Vec::new(),
        }
    }

    /// Appends one outcome line to the report.
    pub fn push_report(&mut self, line: impl Into<String>) {
        self.report.push(line.into());
    }

    /// Checks the change-ownership invariant: a non-zero active change is
    /// only legal in the create-through-submit stage window.
    pub fn change_ownership_consistent(&self) -> bool {
        self.active_change.is_none() || self.stage.may_own_change()
    }

    /// Moves this state to the start of the next task.
    pub fn advance_to_next_task(&mut self) {
        self.resume_task = self.resume_task.next();
        self.stage = Stage::Start;
        self.active_change = ChangeId::NONE;
    }
}
