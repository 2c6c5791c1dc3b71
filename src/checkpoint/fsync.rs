//! Low-level fsync operations for durability.
//!
//! The checkpoint is the only persisted artifact of a campaign, so both the
//! file and its directory entry must survive a power loss. On POSIX systems
//! a rename only becomes durable once the containing directory is synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory to disk, ensuring directory entries are durable.
///
/// Without this, a renamed checkpoint might revert to its old name after a
/// crash, or a deleted checkpoint might reappear and cause a stale resume.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
