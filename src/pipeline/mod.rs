//! The per-task pipeline state machine.
//!
//! A task advances through the fixed stage sequence
//! `Start -> Description -> Check -> Update -> Sync -> CreateChange ->
//! Integrate -> Resolve -> Submit -> End`, with the checkpoint saved after
//! every transition and every failure. A failed stage leaves the checkpoint
//! pointing at that same stage, so a later process re-enters exactly where
//! this one stopped.

pub mod rollback;
pub mod run;


pub use rollback::rollback_active_change;
pub use run::{TaskContext, run_task};

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::types::{Stage, TaskIndex};
use crate::vcs::VcsError;

/// Errors from driving a task through the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external action failed or returned unexpected output. The
    /// checkpoint was saved at the failed stage before this was raised.
    #[error("task {task}, stage {stage}: {source}")]
    Stage {
        task: TaskIndex,
        stage: Stage,
        #[source]
        source: VcsError,
    },

    /// The checkpoint could not be written or read.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Cleanup of a partially-created change itself failed. Manual
    /// intervention is required; the raw command output is attached so the
    /// operator can finish the cleanup by hand.
    #[error("rollback failed while trying to {step}: {source}")]
    Rollback {
        step: &'static str,
        #[source]
        source: VcsError,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
