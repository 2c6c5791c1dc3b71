//! Stage execution for one task.
//!
//! [`run_task`] drives a single task from its checkpointed stage to `End`
//! (or to a pause or failure), saving the checkpoint after every
//! transition. Stages before change creation are naturally idempotent;
//! stages at or after it continue against the already-open change, which
//! each of integrate, resolve, and submit tolerates being re-issued.

use super::{PipelineError, Result};
use crate::checkpoint::{CampaignState, CheckpointStore};
use crate::types::{Check, ChangeId, IntegrationTask, Stage, TaskOutcome};
use crate::vcs::{Interchanges, Preview, Vcs, VcsError, description};

/// Everything a task run needs besides the mutable campaign state.
#[derive(Debug, Clone)]
pub struct TaskContext<'a> {
    /// The task being integrated.
    pub task: &'a IntegrationTask,

    /// Global view-enablement patterns applied during the Update stage.
    pub view: &'a [String],

    /// In safe mode the pipeline pauses after a successful resolve; the
    /// checkpoint is advanced to the submit stage and the process exits,
    /// leaving submission to an explicit operator resume.
    pub safe_mode: bool,
}

/// What a stage asks the state machine to do next.
enum StageStep {
    /// Move to the next stage in the sequence.
    Advance,

    /// A pending change was created; record it, then move on.
    Created(ChangeId),

    /// The task is done; jump to `End` with this outcome.
    Finish(TaskOutcome),
}

/// Runs one task from its current checkpointed stage to completion.
///
/// On a stage failure the checkpoint is saved with the stage unchanged and
/// the error is returned; nothing is retried within one process invocation.
pub fn run_task(
    state: &mut CampaignState,
    ctx: &TaskContext,
    vcs: &mut dyn Vcs,
    store: &CheckpointStore,
) -> Result<TaskOutcome> {
    debug_assert!(state.change_ownership_consistent());
    debug_assert!(!state.stage.is_terminal());

    vcs.use_client(&ctx.task.client);

    // Regenerated on demand rather than persisted: the description is a
    // pure function of external history, so a resumed process re-queries
    // instead of trusting state that was never checkpointed.
    let mut pending_description: Option<String> = None;

    loop {
        let stage = state.stage;
        tracing::info!(task = %state.resume_task, stage = %stage, "entering stage");

        let step = match execute_stage(stage, state, ctx, vcs, &mut pending_description) {
            Ok(step) => step,
            Err(source) => {
                // Resume re-enters this same stage.
                store.save(state)?;
                return Err(PipelineError::Stage {
                    task: state.resume_task,
                    stage,
                    source,
                });
            }
        };

        match step {
            StageStep::Advance => {
                state.stage = stage.next();
                store.save(state)?;

                if stage == Stage::Resolve && ctx.safe_mode {
                    let change = state.active_change;
                    tracing::info!(change = %change, "safe mode: pausing before submit");
                    return Ok(TaskOutcome::Paused { change });
                }
            }

            StageStep::Created(change) => {
                state.active_change = change;
                state.stage = stage.next();
                store.save(state)?;
            }

            StageStep::Finish(outcome) => {
                if let Some(line) = report_line(ctx.task, &outcome) {
                    state.push_report(line);
                }
                if matches!(outcome, TaskOutcome::Submitted { .. }) {
                    // The change is committed; this run no longer owns a
                    // pending change.
                    state.active_change = ChangeId::NONE;
                }
                state.stage = Stage::End;
                store.save(state)?;
                return Ok(outcome);
            }
        }
    }
}

fn execute_stage(
    stage: Stage,
    state: &CampaignState,
    ctx: &TaskContext,
    vcs: &mut dyn Vcs,
    pending_description: &mut Option<String>,
) -> std::result::Result<StageStep, VcsError> {
    match stage {
        // Exists only so a fresh checkpoint has a well-defined value.
        Stage::Start => Ok(StageStep::Advance),

        Stage::Description => match generate_description(ctx.task, vcs)? {
            Some(text) => {
                *pending_description = Some(text);
                Ok(StageStep::Advance)
            }
            None => Ok(StageStep::Finish(TaskOutcome::NoChanges)),
        },

        Stage::Check => run_checks(ctx.task, vcs),

        Stage::Update => {
            vcs.update_client_view(&ctx.task.client, ctx.view)?;
            Ok(StageStep::Advance)
        }

        Stage::Sync => {
            vcs.sync()?;
            Ok(StageStep::Advance)
        }

        Stage::CreateChange => {
            let text = match pending_description.take() {
                Some(text) => text,
                // Re-entry after a crash: the description was never
                // persisted, so rebuild it from the server's history.
                None => match generate_description(ctx.task, vcs)? {
                    Some(text) => text,
                    None => return Ok(StageStep::Finish(TaskOutcome::NoChanges)),
                },
            };
            let change = vcs.create_change(&text)?;
            Ok(StageStep::Created(change))
        }

        Stage::Integrate => {
            vcs.integrate(&ctx.task.source, &ctx.task.target, state.active_change)?;
            Ok(StageStep::Advance)
        }

        Stage::Resolve => {
            vcs.resolve(state.active_change)?;
            Ok(StageStep::Advance)
        }

        Stage::Submit => {
            vcs.submit(state.active_change)?;
            Ok(StageStep::Finish(TaskOutcome::Submitted {
                change: state.active_change,
            }))
        }

        Stage::End => unreachable!("terminal stage is never executed"),
    }
}

/// Queries not-yet-integrated changes and builds the change description.
///
/// Returns `None` when there is nothing to integrate. A scan-limited
/// listing degrades to a placeholder description instead of failing.
fn generate_description(
    task: &IntegrationTask,
    vcs: &mut dyn Vcs,
) -> std::result::Result<Option<String>, VcsError> {
    match vcs.interchanges(&task.source, &task.target)? {
        Interchanges::Nothing => Ok(None),
        Interchanges::ScanLimited => {
            tracing::warn!(task = %task, "scan limit reached; using placeholder description");
            Ok(Some(description::scan_limited_placeholder(task)))
        }
        Interchanges::Changes(lines) => Ok(Some(description::build(task, &lines))),
    }
}

/// Evaluates every precondition in order.
fn run_checks(
    task: &IntegrationTask,
    vcs: &mut dyn Vcs,
) -> std::result::Result<StageStep, VcsError> {
    for check in &task.checks {
        match check {
            Check::UnconditionalSkip { message } => {
                return Ok(StageStep::Finish(TaskOutcome::Skipped {
                    reason: message.clone(),
                }));
            }
            Check::AlreadyIntegrated { from, to } => match vcs.integrate_preview(from, to)? {
                Preview::AllIntegrated => {}
                Preview::Pending(files) => {
                    tracing::info!(
                        task = %task,
                        pending = files.len(),
                        "precondition failed, skipping task"
                    );
                    return Ok(StageStep::Finish(TaskOutcome::Skipped {
                        reason: format!("{from} not fully integrated into {to}"),
                    }));
                }
            },
        }
    }
    Ok(StageStep::Advance)
}

/// The report line recorded for a finished task, if any.
///
/// `Paused` records nothing; the submitted line is written by the resumed
/// process once submission actually happens.
fn report_line(task: &IntegrationTask, outcome: &TaskOutcome) -> Option<String> {
    match outcome {
        TaskOutcome::Skipped { reason } => Some(format!("Skipped: {} ({})", task.title, reason)),
        TaskOutcome::NoChanges => Some(format!("No changes to integrate: {}", task)),
        TaskOutcome::Submitted { change } => Some(format!(
            "Latest changes: {} (change {} submitted)",
            task.title, change
        )),
        TaskOutcome::Paused { .. } => None,
    }
}
