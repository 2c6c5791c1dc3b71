//! Pipeline stage identifiers.
//!
//! A task moves through a fixed, linear sequence of stages. The stage name
//! is persisted in the checkpoint, so a resumed process re-enters exactly
//! where the previous one stopped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the per-task integration pipeline.
///
/// Stages run strictly in declaration order. `Start` exists only so a
/// freshly-created checkpoint has a well-defined initial value; it advances
/// to `Description` with no side effect. `End` is terminal for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Description,
    Check,
    Update,
    Sync,
    CreateChange,
    Integrate,
    Resolve,
    Submit,
    End,
}

impl Stage {
    /// The stage that follows this one in the pipeline.
    ///
    /// `End` has no successor and returns itself.
    pub fn next(&self) -> Stage {
        match self {
            Stage::Start => Stage::Description,
            Stage::Description => Stage::Check,
            Stage::Check => Stage::Update,
            Stage::Update => Stage::Sync,
            Stage::Sync => Stage::CreateChange,
            Stage::CreateChange => Stage::Integrate,
            Stage::Integrate => Stage::Resolve,
            Stage::Resolve => Stage::Submit,
            Stage::Submit => Stage::End,
            Stage::End => Stage::End,
        }
    }

    /// Returns true if a pending change may be owned while in this stage.
    ///
    /// A non-zero active change id is only legal between change creation
    /// and submission (inclusive); earlier stages have created nothing on
    /// the server yet.
    pub fn may_own_change(&self) -> bool {
        matches!(
            self,
            Stage::CreateChange | Stage::Integrate | Stage::Resolve | Stage::Submit
        )
    }

    /// Returns true if this is the terminal stage for a task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::End)
    }

    /// Stable lowercase name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Description => "description",
            Stage::Check => "check",
            Stage::Update => "update",
            Stage::Sync => "sync",
            Stage::CreateChange => "create_change",
            Stage::Integrate => "integrate",
            Stage::Resolve => "resolve",
            Stage::Submit => "submit",
            Stage::End => "end",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
