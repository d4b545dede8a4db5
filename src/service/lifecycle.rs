//! service::lifecycle
//!
//! Creating repositories: init, clone, and connecting an existing
//! repository to a remote.

use std::fs;
use std::path::Path;

use super::{existing_ancestor, remove_created, RepoService};
use crate::auth::DeployKeyPair;
use crate::core::ops::LockMode;
use crate::core::paths::check_repo_path;
use crate::core::types::{BranchName, RepoSuffix};
use crate::git::transport::{self, RemoteSession};
use crate::git::{Git, GitError};

impl RepoService {
    /// Initialize a repository at `path` unless one is already there.
    ///
    /// Returns `true` when a repository was created and `false`, without
    /// touching anything, when `path` already holds one.
    ///
    /// # Errors
    ///
    /// - [`GitError::InvalidInput`] if `path` is relative or has `..` segments
    /// - [`GitError::Filesystem`] if the directory cannot be created
    pub fn create_new_repository(&self, path: &Path) -> Result<bool, GitError> {
        check_repo_path(path)?;
        let span = tracing::info_span!("create_repository", path = %path.display());
        let _enter = span.enter();
        let _locks = self.lock_one(path, LockMode::Exclusive)?;

        if Git::exists_at(path) {
            tracing::debug!("repository already exists");
            return Ok(false);
        }

        let branch = self.config.initial_branch();
        fs::create_dir_all(path).map_err(|e| GitError::filesystem(path, e))?;
        let git = Git::init(path, &branch)?;
        git.record_default_branch(&branch)?;

        tracing::info!(branch = %branch, "repository created");
        Ok(true)
    }

    /// Clone `remote_url` into the application's default path.
    ///
    /// Returns the default branch: the remote's, or the configured initial
    /// branch when the remote is empty. On failure every directory the clone
    /// created is removed.
    ///
    /// # Errors
    ///
    /// - [`GitError::UnsupportedRemoteScheme`] for non-ssh urls
    /// - [`GitError::Filesystem`] if the target exists and is not empty
    /// - [`GitError::Authentication`], [`GitError::InvalidRemote`],
    ///   [`GitError::Transport`] or [`GitError::Timeout`] from the transfer
    pub fn clone_application(
        &self,
        suffix: &RepoSuffix,
        remote_url: &str,
        keys: &DeployKeyPair,
    ) -> Result<BranchName, GitError> {
        let span = tracing::info_span!(
            "clone_application",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            key = %keys.fingerprint(),
        );
        let _enter = span.enter();

        let url = self.transport.parse_url(remote_url)?;
        let target = self.paths.default_path(suffix);
        let _locks = self.lock_one(&target, LockMode::Exclusive)?;

        let preexisting = target.exists();
        if preexisting && !is_empty_dir(&target)? {
            return Err(GitError::Filesystem {
                path: target,
                message: "target directory is not empty".to_string(),
            });
        }
        let stop = existing_ancestor(&target);

        let session = RemoteSession::new(
            self.transport.as_ref(),
            &url,
            Some(keys),
            self.network_deadline(),
        );
        let result = transport::clone_into(&session, &target, self.config.remote_name())
            .and_then(|git| self.settle_clone(&git));

        match result {
            Ok(branch) => {
                tracing::info!(branch = %branch, "application cloned");
                Ok(branch)
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "clone failed, removing target");
                if preexisting {
                    clear_dir(&target);
                } else {
                    remove_created(&target, &stop);
                }
                Err(e)
            }
        }
    }

    /// Record the default branch of a fresh clone.
    fn settle_clone(&self, git: &Git) -> Result<BranchName, GitError> {
        let branch = if git.is_unborn() && git.list_branches()?.is_empty() {
            let initial = self.config.initial_branch();
            git.set_head(&initial)?;
            initial
        } else {
            git.head_branch()?
                .ok_or_else(|| GitError::Internal("clone left a detached HEAD".to_string()))?
        };
        git.record_default_branch(&branch)?;
        Ok(branch)
    }

    /// Connect the repository at `path` to `remote_url`.
    ///
    /// The remote is contacted with the key pair first, without transferring
    /// history; the remote is only recorded once that succeeds. Returns the
    /// remote's default branch, or the local branch when the remote is
    /// empty. Connecting again to the same url is a no-op apart from the
    /// connection check.
    ///
    /// # Errors
    ///
    /// - [`GitError::AlreadyConnected`] if a different origin is configured
    /// - [`GitError::NotARepo`] if `path` holds no repository
    /// - the transport errors of [`RepoService::clone_application`]
    pub fn connect_application(
        &self,
        path: &Path,
        remote_url: &str,
        keys: &DeployKeyPair,
    ) -> Result<BranchName, GitError> {
        check_repo_path(path)?;
        let span = tracing::info_span!(
            "connect_application",
            path = %path.display(),
            key = %keys.fingerprint(),
        );
        let _enter = span.enter();

        let url = self.transport.parse_url(remote_url)?;
        let _locks = self.lock_one(path, LockMode::Exclusive)?;
        let git = Git::open(path)?;

        let remote_name = self.config.remote_name();
        let existing = git.remote_url(remote_name)?;
        if let Some(existing) = &existing {
            if existing != url.as_str() {
                return Err(GitError::AlreadyConnected {
                    existing: existing.clone(),
                });
            }
        }

        let session = RemoteSession::new(
            self.transport.as_ref(),
            &url,
            Some(keys),
            self.network_deadline(),
        );
        let advertised = transport::probe(&session, &git)?;

        if existing.is_none() {
            git.add_remote(remote_name, url.as_str())?;
        }
        let local = self.default_branch_of(&git)?;
        if git.recorded_default_branch()?.is_none() {
            git.record_default_branch(&local)?;
        }

        let branch = advertised.unwrap_or(local);
        tracing::info!(branch = %branch, "application connected");
        Ok(branch)
    }
}

fn is_empty_dir(path: &Path) -> Result<bool, GitError> {
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).map_err(|e| GitError::filesystem(path, e))?;
    Ok(entries.next().is_none())
}

/// Empty a directory that existed before the operation, keeping the directory.
fn clear_dir(path: &Path) {
    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        let result = if entry_path.is_dir() {
            fs::remove_dir_all(&entry_path)
        } else {
            fs::remove_file(&entry_path)
        };
        if let Err(e) = result {
            tracing::warn!(path = %entry_path.display(), error = %e, "cleanup failed");
        }
    }
}
