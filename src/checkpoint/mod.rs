//! Checkpoint persistence for the campaign engine.
//!
//! The checkpoint is the only artifact the engine persists. It is saved
//! atomically after every stage transition and every failure, validated
//! against the task-list fingerprint on resume, and deleted when the
//! campaign completes.

pub mod fsync;
pub mod state;
pub mod store;

pub use state::{CampaignState, SCHEMA_VERSION};
pub use store::{CheckpointError, CheckpointStore, fingerprint};
