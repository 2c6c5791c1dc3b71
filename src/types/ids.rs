//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different numeric identifiers
//! (e.g., using a task index where a change number is expected) and make
//! the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pending change number on the version-control server.
///
/// `ChangeId::NONE` (zero) means "no pending change is owned by this run".
/// Real change numbers assigned by the server are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub u64);

impl ChangeId {
    /// The sentinel value for "no active change".
    pub const NONE: ChangeId = ChangeId(0);

    /// Returns true if this identifies an actual pending change.
    pub fn is_some(&self) -> bool {
        self.0 != 0
    }

    /// Returns true if this is the "no active change" sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChangeId {
    fn from(n: u64) -> Self {
        ChangeId(n)
    }
}

/// A 1-based position in the campaign's task list.
///
/// Index 1 is the first task. Tasks strictly before the checkpoint's resume
/// index are considered complete and are never re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskIndex(pub u32);

impl TaskIndex {
    /// The first task in a campaign.
    pub const FIRST: TaskIndex = TaskIndex(1);

    /// The next task after this one.
    pub fn next(&self) -> TaskIndex {
        TaskIndex(self.0 + 1)
    }

    /// Zero-based offset into the task list, if this is a valid index.
    pub fn as_offset(&self) -> Option<usize> {
        (self.0 >= 1).then(|| self.0 as usize - 1)
    }
}

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TaskIndex {
    fn from(n: u32) -> Self {
        TaskIndex(n)
    }
}
