//! Rollback of a partially-created change.
//!
//! Invoked only on an explicit operator request: restarting the current
//! task from its beginning, or jumping the campaign to a different task
//! index. Never triggered automatically — blind re-entry of a stage versus
//! rollback after a partial integrate/resolve is the operator's call.

use super::{PipelineError, Result};
use crate::checkpoint::{CampaignState, CheckpointStore};
use crate::types::{ChangeId, Stage};
use crate::vcs::{Opened, Vcs, VcsError};

/// Discards the checkpointed active change, if any.
///
/// Reverts every file opened under the change (the benign "nothing opened"
/// condition skips the revert), deletes the now-empty change, and resets
/// the checkpoint to `Start` with no active change. Any failure along the
/// way is fatal and carries the raw command output so the operator can
/// finish the cleanup by hand.
///
/// A checkpoint with no active change is a no-op.
pub fn rollback_active_change(
    state: &mut CampaignState,
    vcs: &mut dyn Vcs,
    store: &CheckpointStore,
) -> Result<()> {
    if state.active_change.is_none() {
        return Ok(());
    }

    let change = state.active_change;
    tracing::warn!(change = %change, stage = %state.stage, "rolling back active change");

    match vcs
        .opened(change)
        .map_err(|source| rollback_error("list the opened files", source))?
    {
        Opened::Nothing => {
            tracing::info!(change = %change, "nothing opened, skipping revert");
        }
        Opened::Files(files) => {
            tracing::info!(change = %change, files = files.len(), "reverting opened files");
            vcs.revert(change)
                .map_err(|source| rollback_error("revert the opened files", source))?;
        }
    }

    vcs.delete_change(change)
        .map_err(|source| rollback_error("delete the pending change", source))?;

    state.active_change = ChangeId::NONE;
    state.stage = Stage::Start;
    store.save(state)?;

    tracing::info!(change = %change, "rollback complete");
    Ok(())
}

fn rollback_error(step: &'static str, source: VcsError) -> PipelineError {
    PipelineError::Rollback { step, source }
}
