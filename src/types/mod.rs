//! Core domain types for the integration-campaign engine.
//!
//! This module contains the fundamental types used throughout the
//! application, designed to encode invariants via the type system.

pub mod ids;
pub mod outcome;
pub mod stage;
pub mod task;

// Re-export commonly used types at the module level
pub use ids::{ChangeId, TaskIndex};
pub use outcome::TaskOutcome;
pub use stage::Stage;
pub use task::{Check, IntegrationTask};
