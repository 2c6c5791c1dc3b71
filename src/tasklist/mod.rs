//! Task-list definition loading.
//!
//! The campaign definition is a JSON document: an ordered `tasks` array
//! plus the global `view` enablement patterns. The engine treats the parsed
//! sequence as immutable and keeps a content fingerprint of the raw bytes;
//! checkpointed task indices are only meaningful against that exact
//! revision.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint;
use crate::types::IntegrationTask;

/// Errors from loading a task-list definition.
#[derive(Debug, Error)]
pub enum TaskListError {
    /// The definition file could not be read.
    #[error("cannot read task list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The definition is not valid JSON for the expected shape.
    #[error("cannot parse task list {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The definition parsed but contains no tasks.
    #[error("task list {path} defines no tasks")]
    Empty { path: PathBuf },
}

/// The parsed campaign definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// View-enablement patterns applied to every task's client during the
    /// Update stage. Paths not matching any pattern are mapped out.
    #[serde(default)]
    pub view: Vec<String>,

    /// The ordered integration tasks.
    pub tasks: Vec<IntegrationTask>,
}

/// A definition together with where it came from and its fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedTaskList {
    pub list: TaskList,

    /// Display form of the definition path, stored in the checkpoint header.
    pub source: String,

    /// SHA-256 of the raw definition bytes.
    pub fingerprint: String,
}

/// Loads and fingerprints a task-list definition file.
pub fn load(path: &Path) -> Result<LoadedTaskList, TaskListError> {
    let bytes = std::fs::read(path).map_err(|source| TaskListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let list: TaskList = serde_json::from_slice(&bytes).map_err(|source| TaskListError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if list.tasks.is_empty() {
        return Err(TaskListError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(LoadedTaskList {
        list,
        source: path.display().to_string(),
        fingerprint: checkpoint::fingerprint(&bytes),
    })
}
