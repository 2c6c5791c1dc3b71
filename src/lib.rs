//! Resumable driver for multi-branch integration campaigns.
//!
//! Given an ordered list of branch-merge tasks, the engine advances each
//! task through a fixed pipeline (preconditions, description, workspace
//! update, sync, change creation, integration, resolve, submit),
//! checkpointing after every stage so a crash, pause, or operator
//! interrupt can always be resumed without corrupting the server state.

pub mod checkpoint;
pub mod driver;
pub mod exec;
pub mod pipeline;
pub mod tasklist;
pub mod types;
pub mod vcs;

#[cfg(test)]
pub mod test_utils;
