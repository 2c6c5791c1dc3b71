//! Durable checkpoint storage.
//!
//! # Atomic Writes
//!
//! Checkpoints are written atomically using a write-to-temp-then-rename
//! pattern:
//! 1. Write to `<path>.tmp`
//! 2. fsync the file
//! 3. Rename to `<path>`
//! 4. fsync the directory
//!
//! A process that crashed mid-write therefore leaves either the previous
//! checkpoint intact or the new one complete, never a partial file.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::fsync::{fsync_dir, fsync_file};
use super::state::{CampaignState, SCHEMA_VERSION};

/// Errors that can occur during checkpoint operations.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// No checkpoint exists where one is required (resume without start).
    #[error("no checkpoint found at {path}")]
    Missing { path: PathBuf },

    /// A checkpoint exists where none may (start without restart).
    #[error("a checkpoint already exists at {path}; resume it or force a restart")]
    AlreadyExists { path: PathBuf },

    /// The task-list definition changed since the checkpoint was written.
    /// Task indices and branch identities in the checkpoint are stale.
    #[error(
        "task-list fingerprint mismatch: checkpoint has {stored}, current definition is {current}"
    )]
    FingerprintMismatch { stored: String, current: String },
}

/// Result type for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Computes the deterministic content fingerprint of a task-list source.
///
/// Used both when creating a fresh checkpoint and when validating a
/// resumed one.
pub fn fingerprint(definition_source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(definition_source);
    hex::encode(hasher.finalize())
}

/// Handle to the checkpoint file location.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore { path: path.into() }
    }

    /// The checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a checkpoint file currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Saves the state atomically, updating its timestamp.
    pub fn save(&self, state: &mut CampaignState) -> Result<()> {
        state.saved_at = chrono::Utc::now();

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;

        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            fsync_file(&file)?;
        }

        std::fs::rename(&tmp_path, &self.path)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fsync_dir(parent)?;
        }

        tracing::debug!(
            path = %self.path.display(),
            task = %state.resume_task,
            stage = %state.stage,
            change = %state.active_change,
            "checkpoint saved"
        );
        Ok(())
    }

    /// Loads the checkpoint, failing if it is missing or unreadable.
    pub fn load(&self) -> Result<CampaignState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let state: CampaignState = serde_json::from_slice(&bytes)?;

        if state.schema_version != SCHEMA_VERSION {
            return Err(CheckpointError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                got: state.schema_version,
            });
        }

        Ok(state)
    }

    /// Loads the checkpoint and validates its fingerprint against the
    /// current definition's.
    ///
    /// A mismatch is a hard error unless `ignore_mismatch` is set, because
    /// task indices only have meaning relative to one exact definition
    /// revision.
    pub fn load_validated(
        &self,
        current_fingerprint: &str,
        ignore_mismatch: bool,
    ) -> Result<CampaignState> {
        let state = self.load()?;

        if state.fingerprint != current_fingerprint {
            if !ignore_mismatch {
                return Err(CheckpointError::FingerprintMismatch {
                    stored: state.fingerprint,
                    current: current_fingerprint.to_string(),
                });
            }
            tracing::warn!(
                stored = %state.fingerprint,
                current = %current_fingerprint,
                "fingerprint mismatch ignored at operator request"
            );
        }

        Ok(state)
    }

    /// Deletes the checkpoint. Called exactly once, when the campaign's
    /// last task has ended and the report has been printed.
    pub fn delete(&self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fsync_dir(parent)?;
        }
        tracing::info!(path = %self.path.display(), "checkpoint deleted, campaign complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeId, Stage, TaskIndex};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn arb_stage() -> impl Strategy<Value = Stage> {
        prop_oneof![
            Just(Stage::Start),
            Just(Stage::Description),
            Just(Stage::Check),
            Just(Stage::Update),
            Just(Stage::Sync),
            Just(Stage::CreateChange),
            Just(Stage::Integrate),
            Just(Stage::Resolve),
            Just(Stage::Submit),
            Just(Stage::End),
        ]
    }

    fn arb_state() -> impl Strategy<Value = CampaignState> {
        (
            "[a-z0-9/._-]{1,40}",
            "[0-9a-f]{64}",
            1u32..100,
            arb_stage(),
            0u64..100000,
            prop::collection::vec("[ -~]{0,80}", 0..8),
        )
            .prop_map(|(source, fp, task, stage, change, report)| {
                let mut state = CampaignState::new(source, fp);
                state.resume_task = TaskIndex(task);
                state.stage = stage;
                state.active_change = ChangeId(change);
                state.report = report;
                state
            })
    }

    proptest! {
        /// Atomic save and load roundtrip preserves all data.
        #[test]
        fn save_load_roundtrip(state in arb_state()) {
            let dir = tempdir().unwrap();
            let store = CheckpointStore::new(dir.path().join("campaign.json"));

            let mut saved = state.clone();
            store.save(&mut saved).unwrap();
            let loaded = store.load().unwrap();

            prop_assert_eq!(saved, loaded);
        }

        /// Temp file is cleaned up after successful save.
        #[test]
        fn temp_file_cleaned_up(state in arb_state()) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("campaign.json");
            let store = CheckpointStore::new(&path);

            let mut saved = state;
            store.save(&mut saved).unwrap();

            prop_assert!(path.exists());
            prop_assert!(!path.with_extension("json.tmp").exists());
        }
    }

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        let a = fingerprint(b"tasks v1");
        let b = fingerprint(b"tasks v1");
        let c = fingerprint(b"tasks v2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn load_missing_reports_missing() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("campaign.json"));
        assert!(matches!(
            store.load(),
            Err(CheckpointError::Missing { .. })
        ));
    }

    #[test]
    fn load_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(&path, "not valid json").unwrap();

        let store = CheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(CheckpointError::Json(_))));
    }

    #[test]
    fn load_wrong_schema_version_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("campaign.json");

        let mut state = CampaignState::new("tasks.json", "fp");
        state.schema_version = SCHEMA_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let store = CheckpointStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(CheckpointError::SchemaMismatch { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn fingerprint_mismatch_is_fatal_unless_overridden() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("campaign.json"));

        let mut state = CampaignState::new("tasks.json", "old-fp");
        store.save(&mut state).unwrap();

        assert!(matches!(
            store.load_validated("new-fp", false),
            Err(CheckpointError::FingerprintMismatch { .. })
        ));

        // Override proceeds with the stored stage/index.
        let loaded = store.load_validated("new-fp", true).unwrap();
        assert_eq!(loaded.fingerprint, "old-fp");
        assert_eq!(loaded.resume_task, TaskIndex::FIRST);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/dir/campaign.json"));

        let mut state = CampaignState::new("tasks.json", "fp");
        store.save(&mut state).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn delete_removes_the_file() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("campaign.json"));

        let mut state = CampaignState::new("tasks.json", "fp");
        store.save(&mut state).unwrap();
        assert!(store.exists());

        store.delete().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn save_overwrites_previous_checkpoint() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("campaign.json"));

        let mut state = CampaignState::new("tasks.json", "fp");
        store.save(&mut state).unwrap();

        state.resume_task = TaskIndex(5);
        state.push_report("Skipped: x (frozen)");
        store.save(&mut state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.resume_task, TaskIndex(5));
        assert_eq!(loaded.report.len(), 1);
    }
}
