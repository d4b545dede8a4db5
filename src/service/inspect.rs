//! service::inspect
//!
//! Read-only views: working tree status and commit history.

use std::path::Path;

use super::RepoService;
use crate::core::ops::LockMode;
use crate::core::paths::check_repo_path;
use crate::core::types::{BranchName, RepoSuffix};
use crate::git::{CommitRecord, Git, GitError, StatusReport};

impl RepoService {
    /// Status of the working tree at `path` against the tip of `branch`.
    ///
    /// Untracked files are reported as added, index conflicts as conflicted.
    /// The index is never written.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if `branch` does not exist
    /// - [`GitError::NotARepo`] if `path` holds no repository
    pub fn get_status(&self, path: &Path, branch: &BranchName) -> Result<StatusReport, GitError> {
        check_repo_path(path)?;
        let span = tracing::info_span!("get_status", path = %path.display(), branch = %branch);
        let _enter = span.enter();

        let _locks = self.lock_one(path, LockMode::Shared)?;
        let report = Git::open(path)?.status_against(branch)?;
        tracing::debug!(changed = report.len(), "status computed");
        Ok(report)
    }

    /// Commits reachable from the suffix's branch, or the default branch,
    /// newest first.
    pub fn get_commit_history(&self, suffix: &RepoSuffix) -> Result<Vec<CommitRecord>, GitError> {
        let span = tracing::info_span!(
            "get_commit_history",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = suffix.branch().map(BranchName::as_str).unwrap_or("default"),
        );
        let _enter = span.enter();

        let path = self.repo_path(suffix, None)?;
        let _locks = self.lock_one(&path, LockMode::Shared)?;
        let git = Git::open(&path)?;
        let branch = match suffix.branch() {
            Some(branch) => branch.clone(),
            None => self.default_branch_of(&git)?,
        };
        git.history(&branch)
    }
}
