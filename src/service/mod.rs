//! service
//!
//! The operations callers run against application repositories.
//!
//! # Architecture
//!
//! [`RepoService`] is the only entry point. Each operation follows the same
//! lifecycle:
//!
//! ```text
//! Resolve path -> Lock -> Open/Create -> Operate -> Release
//! ```
//!
//! Paths come from [`RepoPaths`], locks from [`LockSet`], repository work
//! from [`Git`] and network work from [`crate::git::transport`]. Nothing is
//! cached between calls: a repository handle lives exactly as long as the
//! operation that opened it.
//!
//! # Invariants
//!
//! - Writers hold an exclusive lock on every path they mutate
//! - Readers hold a shared lock for the whole read
//! - Multi-path operations acquire all locks up front, in a global order
//! - Failed clones and branch creations remove what they created
//!
//! # Example
//!
//! ```no_run
//! use appgit::core::config::Config;
//! use appgit::core::types::RepoSuffix;
//! use appgit::service::RepoService;
//!
//! let service = RepoService::new(Config::load()?);
//! let suffix = RepoSuffix::new("org-1", "app-1")?;
//! let path = service.repo_path(&suffix, None)?;
//!
//! service.create_new_repository(&path)?;
//! std::fs::write(path.join("app.json"), "{}")?;
//! service.commit_application(&path, "initial", "Ada", "ada@example.com")?;
//!
//! for commit in service.get_commit_history(&suffix)? {
//!     println!("{} {}", commit.hash.short(7), commit.message);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod branches;
mod commit;
mod inspect;
mod lifecycle;
mod sync;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::ops::{LockMode, LockSet};
use crate::core::paths::RepoPaths;
use crate::core::types::{BranchName, Deadline, RepoSuffix};
use crate::git::{Git, GitError, SshTransport, Transport};

/// Repository operations for every application under one root.
///
/// Cheap to clone; clones share configuration and transport.
#[derive(Debug, Clone)]
pub struct RepoService {
    config: Arc<Config>,
    paths: RepoPaths,
    transport: Arc<dyn Transport>,
    deadline: Option<Deadline>,
}

impl RepoService {
    /// Service over `config`, reaching remotes with [`SshTransport`].
    pub fn new(config: Config) -> Self {
        let transport = Arc::new(SshTransport::from_config(&config));
        Self {
            paths: RepoPaths::from_config(&config),
            config: Arc::new(config),
            transport,
            deadline: None,
        }
    }

    /// Replace the transport used for clone, connect, push, pull and fetch.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// A service whose operations give up at `deadline`.
    ///
    /// Applies to lock waits and network transfers alike, replacing the
    /// configured timeouts.
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    /// Working tree path for `branch` of the application in `suffix`.
    ///
    /// With no explicit branch the suffix's own branch segment is used. The
    /// recorded default branch routes to the application's default path;
    /// every other branch routes to its nested directory.
    pub fn repo_path(
        &self,
        suffix: &RepoSuffix,
        branch: Option<&BranchName>,
    ) -> Result<PathBuf, GitError> {
        let default_path = self.paths.default_path(suffix);
        let Some(branch) = branch.or(suffix.branch()) else {
            return Ok(default_path);
        };

        if Git::exists_at(&default_path) {
            let default = {
                let _locks = self.lock_one(&default_path, LockMode::Shared)?;
                self.default_branch_of(&Git::open(&default_path)?)?
            };
            if default == *branch {
                return Ok(default_path);
            }
        }
        Ok(self.paths.resolve(suffix, Some(branch)))
    }

    /// The application's default branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if the application has no repository
    pub fn default_branch(&self, suffix: &RepoSuffix) -> Result<BranchName, GitError> {
        let path = self.paths.default_path(suffix);
        let _locks = self.lock_one(&path, LockMode::Shared)?;
        self.default_branch_of(&Git::open(&path)?)
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    fn lock_deadline(&self) -> Deadline {
        self.deadline
            .unwrap_or_else(|| Deadline::after(self.config.lock_timeout()))
    }

    fn network_deadline(&self) -> Deadline {
        self.deadline
            .unwrap_or_else(|| Deadline::after(self.config.network_timeout()))
    }

    fn lock(&self, requests: &[(PathBuf, LockMode)]) -> Result<LockSet, GitError> {
        tracing::debug!(count = requests.len(), "waiting for locks");
        Ok(LockSet::acquire(&self.paths, requests, self.lock_deadline())?)
    }

    fn lock_one(&self, path: &Path, mode: LockMode) -> Result<LockSet, GitError> {
        self.lock(&[(path.to_path_buf(), mode)])
    }

    /// The branch materialized at the default path.
    ///
    /// Falls back to HEAD's branch, then to the configured initial branch,
    /// for repositories created outside this service.
    fn default_branch_of(&self, git: &Git) -> Result<BranchName, GitError> {
        if let Some(branch) = git.recorded_default_branch()? {
            return Ok(branch);
        }
        Ok(git
            .head_branch()?
            .unwrap_or_else(|| self.config.initial_branch()))
    }

    fn open_default(&self, suffix: &RepoSuffix) -> Result<(PathBuf, Git), GitError> {
        let path = self.paths.default_path(suffix);
        let git = Git::open(&path)?;
        Ok((path, git))
    }
}

/// Remove `path` and then every parent that is left empty, stopping at
/// `stop` (exclusive).
///
/// Best effort: failures are logged, since this only runs while reporting
/// another error.
fn remove_created(path: &Path, stop: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            tracing::warn!(path = %path.display(), error = %e, "cleanup failed");
            return;
        }
    }

    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        // remove_dir only succeeds on empty directories
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

/// First ancestor of `path` (inclusive) that already exists.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
