//! Campaign driver: iterates the task list, invoking the pipeline per task.
//!
//! The driver owns the between-task bookkeeping: echoing tasks completed by
//! earlier processes, advancing the checkpoint when a task ends, stopping
//! the whole campaign on a safe-mode pause, and deleting the checkpoint
//! once the final task is done.

#[cfg(test)]
mod driver_tests;

use thiserror::Error;

use crate::checkpoint::{CampaignState, CheckpointError, CheckpointStore};
use crate::pipeline::{PipelineError, TaskContext, rollback_active_change, run_task};
use crate::tasklist::{TaskList, TaskListError};
use crate::types::{ChangeId, Stage, TaskIndex, TaskOutcome};
use crate::vcs::Vcs;

/// Errors from running or adjusting a campaign.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    TaskList(#[from] TaskListError),

    /// A jump target or checkpointed index does not exist in the task list.
    #[error("task index {index} is out of range; the task list has {total} tasks")]
    IndexOutOfRange { index: TaskIndex, total: usize },
}

/// Result type for campaign operations.
pub type Result<T> = std::result::Result<T, CampaignError>;

/// How a campaign invocation ended.
#[derive(Debug, PartialEq, Eq)]
pub enum CampaignStatus {
    /// Every task reached its terminal stage; the checkpoint was deleted.
    /// The rendered report is ready to print.
    Completed { report: String },

    /// Safe mode paused before submission. The checkpoint is kept with the
    /// stage advanced to submit; an explicit resume continues.
    Paused { change: ChangeId },
}

/// Operator adjustments applied before a resumed campaign proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeAdjustments {
    /// Restart the checkpointed task from its first stage, rolling back
    /// any active change first.
    pub restart_task: bool,

    /// Jump to an arbitrary task index, rolling back any active change
    /// first. Overrides `restart_task`.
    pub jump_to: Option<TaskIndex>,
}

/// Selects the checkpointed task's workspace client on the adapter.
///
/// Rollback issues its opened/revert/delete commands against whichever
/// client is currently selected, so before rolling back outside the
/// pipeline the selection must match the workspace the task opened its
/// change under. A checkpointed index that no longer exists in the
/// definition leaves the selection untouched.
pub fn select_task_client(state: &CampaignState, definition: &TaskList, vcs: &mut dyn Vcs) {
    match state
        .resume_task
        .as_offset()
        .and_then(|off| definition.tasks.get(off))
    {
        Some(task) => vcs.use_client(&task.client),
        None => tracing::warn!(
            task = %state.resume_task,
            "checkpointed task not found in the definition; client selection unchanged"
        ),
    }
}

/// Applies operator-requested restart/jump adjustments to a loaded state.
///
/// Both routes go through the rollback handler first, so a partially
/// created change is never orphaned by moving the resume point.
pub fn apply_adjustments(
    state: &mut CampaignState,
    adjustments: ResumeAdjustments,
    definition: &TaskList,
    vcs: &mut dyn Vcs,
    store: &CheckpointStore,
) -> Result<()> {
    let total_tasks = definition.tasks.len();
    if let Some(target) = adjustments.jump_to {
        if target.as_offset().is_none_or(|off| off >= total_tasks) {
            return Err(CampaignError::IndexOutOfRange {
                index: target,
                total: total_tasks,
            });
        }
        select_task_client(state, definition, vcs);
        rollback_active_change(state, vcs, store)?;
        tracing::info!(from = %state.resume_task, to = %target, "jumping to task");
        state.resume_task = target;
        state.stage = Stage::Start;
        store.save(state)?;
    } else if adjustments.restart_task {
        select_task_client(state, definition, vcs);
        rollback_active_change(state, vcs, store)?;
        tracing::info!(task = %state.resume_task, "restarting current task from the beginning");
        state.stage = Stage::Start;
        store.save(state)?;
    }
    Ok(())
}

/// Runs the campaign from the state's resume point to completion or pause.
pub fn run_campaign(
    state: &mut CampaignState,
    definition: &TaskList,
    safe_mode: bool,
    vcs: &mut dyn Vcs,
    store: &CheckpointStore,
) -> Result<CampaignStatus> {
    let total = definition.tasks.len();

    // Tasks before the resume point ran in an earlier process; their report
    // lines are already in the checkpoint.
    for done in 1..state.resume_task.0 {
        tracing::info!(task = done, "already completed in a previous run");
    }

    loop {
        let index = state.resume_task;
        let Some(offset) = index.as_offset() else {
            return Err(CampaignError::IndexOutOfRange {
                index,
                total,
            });
        };
        if offset >= total {
            break;
        }

        // A crash between a task finishing and the campaign advancing
        // leaves a terminal stage behind; the task's outcome is already
        // recorded, so just advance.
        if state.stage.is_terminal() {
            state.advance_to_next_task();
            store.save(state)?;
            continue;
        }

        let task = &definition.tasks[offset];
        tracing::info!(task = %index, title = %task.title, "starting task");

        let ctx = TaskContext {
            task,
            view: &definition.view,
            safe_mode,
        };
        let outcome = run_task(state, &ctx, vcs, store)?;

        match outcome {
            TaskOutcome::Paused { change } => {
                return Ok(CampaignStatus::Paused { change });
            }
            _ => {
                state.advance_to_next_task();
                store.save(state)?;
            }
        }
    }

    let report = render_report(state);
    store.delete()?;
    Ok(CampaignStatus::Completed { report })
}

/// Renders the accumulated report for printing.
pub fn render_report(state: &CampaignState) -> String {
    let mut out = String::from("Integration campaign report\n");
    out.push_str("===========================\n");
    if state.report.is_empty() {
        out.push_str("(no task produced output)\n");
    } else {
        for line in &state.report {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
