//! Integration task model.
//!
//! An [`IntegrationTask`] describes one source-branch-to-target-branch merge
//! unit of a campaign. Tasks are produced by the task-list loader and are
//! immutable once loaded; the engine only ever reads them by index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A precondition evaluated before a task is allowed to integrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    /// Assert that `from` is fully merged into `to`. If a dry-run preview
    /// reports pending files, the whole task is skipped with a recorded
    /// reason; any other preview output is fatal.
    AlreadyIntegrated { from: String, to: String },

    /// Always skip the task. The message is recorded verbatim in the report
    /// so the audit trail explains why the task was never attempted.
    UnconditionalSkip { message: String },
}

/// One branch-merge unit in the campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationTask {
    /// Source branch path (integrate from here).
    pub source: String,

    /// Target branch path (integrate into here).
    pub target: String,

    /// Short human title used in report lines and change descriptions.
    pub title: String,

    /// The workspace client to reconfigure and operate in for this task.
    pub client: String,

    /// Preconditions, evaluated in order during the Check stage.
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl fmt::Display for IntegrationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.title, self.source, self.target)
    }
}
