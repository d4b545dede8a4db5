//! core::ops::lock
//!
//! Per-path reader/writer locks for repository working trees.
//!
//! # Architecture
//!
//! Every resolved repository path has one lock file under the configured
//! lock directory (see [`RepoPaths::lock_path`]). Read-only operations take
//! a shared lock, mutating operations take an exclusive one. Locks are OS
//! file locks via `fs2`, so they serialize both threads of one process and
//! separate processes sharing the same root.
//!
//! # Invariants
//!
//! - A lock is released when its guard drops, including on panic unwind
//! - Acquisition waits at most until the supplied [`Deadline`]
//! - Multi-path acquisition happens in sorted lock-file order, so two
//!   operations touching the same pair of paths cannot deadlock
//!
//! # Example
//!
//! ```
//! use appgit::core::ops::lock::{LockMode, LockSet};
//! use appgit::core::paths::RepoPaths;
//! use appgit::core::types::Deadline;
//! use std::time::Duration;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let paths = RepoPaths::new(temp.path(), "repo", temp.path().join(".locks"));
//! let repo = temp.path().join("org/app/repo");
//!
//! let deadline = Deadline::after(Duration::from_secs(1));
//! let guard = LockSet::acquire(&paths, &[(repo.clone(), LockMode::Exclusive)], deadline).unwrap();
//! assert_eq!(guard.len(), 1);
//! // released on drop
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::RepoPaths;
use crate::core::types::Deadline;

/// Interval between attempts while waiting for a contended lock.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock stayed contended until the deadline passed.
    #[error("timed out waiting for lock on {0}")]
    Timeout(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// Access requested on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held lock on one lock file.
///
/// Released on drop.
#[derive(Debug)]
pub struct PathLock {
    path: PathBuf,
    mode: LockMode,
    file: Option<File>,
}

impl PathLock {
    /// Acquire the lock at `lock_file`, waiting until `deadline` if contended.
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if the lock is still held elsewhere at the deadline
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(lock_file: &Path, mode: LockMode, deadline: Deadline) -> Result<Self, LockError> {
        loop {
            if let Some(lock) = Self::try_acquire(lock_file, mode)? {
                return Ok(lock);
            }
            if deadline.expired() {
                return Err(LockError::Timeout(lock_file.to_path_buf()));
            }
            thread::sleep(POLL_INTERVAL.min(deadline.remaining()));
        }
    }

    /// Try to acquire the lock once, returning `None` if contended.
    pub fn try_acquire(lock_file: &Path, mode: LockMode) -> Result<Option<Self>, LockError> {
        if let Some(dir) = lock_file.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_file)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", lock_file.display(), e))
            })?;

        let attempt = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };

        match attempt {
            Ok(()) => Ok(Some(Self {
                path: lock_file.to_path_buf(),
                mode,
                file: Some(file),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file).map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

/// Locks on several repository paths, acquired in a global order.
#[derive(Debug)]
pub struct LockSet {
    locks: Vec<PathLock>,
}

impl LockSet {
    /// Lock every requested repository path.
    ///
    /// Requests are mapped to lock files, deduplicated (the stronger mode
    /// wins), and acquired in sorted order. Locks already taken are released
    /// if a later one fails.
    pub fn acquire(
        paths: &RepoPaths,
        requests: &[(PathBuf, LockMode)],
        deadline: Deadline,
    ) -> Result<Self, LockError> {
        let mut wanted: Vec<(PathBuf, LockMode)> = requests
            .iter()
            .map(|(repo, mode)| (paths.lock_path(repo), *mode))
            .collect();
        wanted.sort();

        let mut merged: Vec<(PathBuf, LockMode)> = Vec::with_capacity(wanted.len());
        for (file, mode) in wanted {
            match merged.last_mut() {
                Some((last, last_mode)) if *last == file => *last_mode = (*last_mode).max(mode),
                _ => merged.push((file, mode)),
            }
        }

        let mut locks = Vec::with_capacity(merged.len());
        for (file, mode) in merged {
            tracing::trace!(lock = %file.display(), ?mode, "acquiring lock");
            locks.push(PathLock::acquire(&file, mode, deadline)?);
        }
        Ok(Self { locks })
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
