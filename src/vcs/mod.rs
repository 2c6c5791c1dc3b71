//! Version-control adapter for the campaign engine.
//!
//! The engine treats the version-control system as an external collaborator
//! reachable only through synchronous commands. [`Vcs`] is the seam: the
//! pipeline and rollback logic are written against it, [`CliVcs`] shells
//! out to the real command-line front end, and tests drive the engine with
//! a scripted implementation.
//!
//! Nothing above this module parses command output; everything the engine
//! needs is expressed as the outcome enums below.

pub mod cli;
pub mod description;

pub use cli::CliVcs;

use thiserror::Error;

use crate::exec::{ExecError, ExecOutput};
use crate::types::ChangeId;

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The command could not be launched at all.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The command ran but its output was classified fatal. The captured
    /// output is preserved verbatim for the operator.
    #[error("command failed:\n{}", output.render())]
    Command { output: ExecOutput },

    /// The command appeared to succeed but its output could not be
    /// interpreted (e.g., no change number in a creation message).
    #[error("{detail}:\n{}", output.render())]
    Parse { detail: String, output: ExecOutput },
}

/// Result type for version-control operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// Outcome of querying the not-yet-integrated changes between two branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interchanges {
    /// One summary line per candidate change, in server order.
    Changes(Vec<String>),

    /// Nothing to integrate; the task is complete as-is.
    Nothing,

    /// The server refused to enumerate the full history (scan limit).
    /// Degraded but not fatal; the description falls back to a placeholder.
    ScanLimited,
}

/// Outcome of a dry-run integration preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// All revisions already integrated; the precondition holds.
    AllIntegrated,

    /// Files are still pending integration.
    Pending(Vec<String>),
}

/// Outcome of listing the files opened under a pending change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// One line per opened file.
    Files(Vec<String>),

    /// The change has nothing opened (benign).
    Nothing,
}

/// Synchronous operations the engine needs from the version-control system.
///
/// Implementations interpret only exit status, stdout substrings, and the
/// benign stderr patterns from [`crate::exec::patterns`]; all policy lives
/// in the pipeline.
pub trait Vcs {
    /// Selects the workspace client for subsequent commands.
    ///
    /// Called before any stage work, including on resume, and before
    /// rolling back a change outside the pipeline, so every command
    /// addresses the workspace the task's change was opened under.
    fn use_client(&mut self, client: &str);

    /// Lists the changes in `source` not yet integrated into `target`.
    fn interchanges(&mut self, source: &str, target: &str) -> VcsResult<Interchanges>;

    /// Dry-run integration preview of `from` into `to`; no server mutation.
    fn integrate_preview(&mut self, from: &str, to: &str) -> VcsResult<Preview>;

    /// Rewrites the client's view so only paths matching `enabled` are
    /// mapped in. Reconfigures workspace routing only; transfers no files.
    fn update_client_view(&mut self, client: &str, enabled: &[String]) -> VcsResult<()>;

    /// Brings the workspace up to date with the server for the active view.
    fn sync(&mut self) -> VcsResult<()>;

    /// Creates a new pending change pre-populated with `description` and
    /// returns its server-assigned number.
    fn create_change(&mut self, description: &str) -> VcsResult<ChangeId>;

    /// Stages the merge of `source` into `target` under `change`.
    fn integrate(&mut self, source: &str, target: &str, change: ChangeId) -> VcsResult<()>;

    /// Auto-resolves trivial differences within `change`.
    fn resolve(&mut self, change: ChangeId) -> VcsResult<()>;

    /// Commits `change` to the server permanently.
    fn submit(&mut self, change: ChangeId) -> VcsResult<()>;

    /// Lists the files opened under `change`.
    fn opened(&mut self, change: ChangeId) -> VcsResult<Opened>;

    /// Reverts every file opened under `change`.
    fn revert(&mut self, change: ChangeId) -> VcsResult<()>;

    /// Deletes the (empty) pending change `change`.
    fn delete_change(&mut self, change: ChangeId) -> VcsResult<()>;
}
