//! service::sync
//!
//! Moving commits between working trees and the remote: push, pull, fetch,
//! and local merges between branch directories.

use super::RepoService;
use crate::auth::DeployKeyPair;
use crate::core::ops::LockMode;
use crate::core::types::{BranchName, RemoteUrl, RepoSuffix};
use crate::git::transport::{self, RemoteSession};
use crate::git::{FetchSummary, Git, GitError, MergeOutcome, MergeStatus};

impl RepoService {
    /// Push `branch` from its working tree to the same branch on the remote.
    ///
    /// Never forced. Returns a one-line summary.
    ///
    /// # Errors
    ///
    /// - [`GitError::NonFastForward`] if the remote has diverged
    /// - [`GitError::BranchNotFound`] if the branch has no commits
    /// - [`GitError::AlreadyConnected`] if the repository's origin differs from `remote_url`
    pub fn push_application(
        &self,
        suffix: &RepoSuffix,
        remote_url: &str,
        keys: &DeployKeyPair,
        branch: &BranchName,
    ) -> Result<String, GitError> {
        let span = tracing::info_span!(
            "push_application",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = %branch,
            key = %keys.fingerprint(),
        );
        let _enter = span.enter();

        let url = self.transport.parse_url(remote_url)?;
        let path = self.repo_path(suffix, Some(branch))?;
        let _locks = self.lock_one(&path, LockMode::Exclusive)?;
        let git = Git::open(&path)?;
        self.ensure_remote(&git, &url)?;

        let session = RemoteSession::new(
            self.transport.as_ref(),
            &url,
            Some(keys),
            self.network_deadline(),
        );
        let pushed =
            transport::push_branch(&session, &git, self.config.remote_name(), branch)
                .inspect_err(|e| tracing::warn!(error = %e, kind = e.kind(), "push failed"))?;

        let message = format!(
            "pushed {} to {} at {}",
            branch,
            self.config.remote_name(),
            &pushed[..pushed.len().min(7)]
        );
        tracing::info!("{}", message);
        Ok(message)
    }

    /// Fetch `branch` and merge it into the working tree at its path.
    ///
    /// Fast-forwards when possible, otherwise merges with the configured
    /// merge identity. Returns a one-line summary.
    ///
    /// # Errors
    ///
    /// - [`GitError::DirtyWorkingTree`] if tracked files changed
    /// - [`GitError::MergeConflict`] if the merge left conflicts; the tree
    ///   stays conflicted for inspection
    /// - [`GitError::BranchNotFound`] if the remote has no such branch
    pub fn pull_application(
        &self,
        suffix: &RepoSuffix,
        remote_url: &str,
        branch: &BranchName,
        keys: &DeployKeyPair,
    ) -> Result<String, GitError> {
        let span = tracing::info_span!(
            "pull_application",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = %branch,
            key = %keys.fingerprint(),
        );
        let _enter = span.enter();

        let url = self.transport.parse_url(remote_url)?;
        let path = self.repo_path(suffix, Some(branch))?;
        let _locks = self.lock_one(&path, LockMode::Exclusive)?;
        let git = Git::open(&path)?;
        self.ensure_remote(&git, &url)?;
        git.ensure_clean()?;

        let remote_name = self.config.remote_name();
        let session = RemoteSession::new(
            self.transport.as_ref(),
            &url,
            Some(keys),
            self.network_deadline(),
        );
        let refspec = format!("+{}:{}", branch.ref_name(), branch.remote_ref_name(remote_name));
        transport::fetch(&session, &git, remote_name, &[refspec])?;

        let tip = git
            .remote_branch_tip(remote_name, branch)?
            .ok_or_else(|| GitError::BranchNotFound(branch.to_string()))?;
        let message = format!("Merge branch '{}' of {} into {}", branch, remote_name, branch);
        let outcome = git.merge_into_head(&tip, &message, self.config.merge_identity())?;

        let summary = match outcome.status {
            MergeStatus::Conflicted => {
                tracing::warn!(paths = outcome.conflicts.len(), "pull left conflicts");
                return Err(GitError::MergeConflict {
                    paths: outcome.conflicts,
                });
            }
            MergeStatus::AlreadyUpToDate => format!("{} is already up to date", branch),
            MergeStatus::FastForwarded => {
                format!("fast-forwarded {} to {}", branch, tip.short(7))
            }
            MergeStatus::Merged => format!(
                "merged {}/{} into {}",
                remote_name,
                branch,
                outcome
                    .commit
                    .as_ref()
                    .map(|c| c.short(7).to_string())
                    .unwrap_or_default()
            ),
        };
        tracing::info!(status = %outcome.status, "pulled");
        Ok(summary)
    }

    /// Update remote-tracking refs for `branch`, or for every branch.
    ///
    /// The working tree is not touched.
    pub fn fetch_application(
        &self,
        suffix: &RepoSuffix,
        remote_url: &str,
        branch: Option<&BranchName>,
        keys: &DeployKeyPair,
    ) -> Result<FetchSummary, GitError> {
        let span = tracing::info_span!(
            "fetch_application",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = branch.map(BranchName::as_str).unwrap_or("*"),
            key = %keys.fingerprint(),
        );
        let _enter = span.enter();

        let url = self.transport.parse_url(remote_url)?;
        let path = match branch {
            Some(branch) => {
                let path = self.repo_path(suffix, Some(branch))?;
                if Git::exists_at(&path) {
                    path
                } else {
                    self.paths.default_path(suffix)
                }
            }
            None => self.paths.default_path(suffix),
        };
        let _locks = self.lock_one(&path, LockMode::Exclusive)?;
        let git = Git::open(&path)?;
        self.ensure_remote(&git, &url)?;

        let remote_name = self.config.remote_name();
        let refspec = match branch {
            Some(branch) => format!("+{}:{}", branch.ref_name(), branch.remote_ref_name(remote_name)),
            None => format!("+refs/heads/*:refs/remotes/{}/*", remote_name),
        };
        let session = RemoteSession::new(
            self.transport.as_ref(),
            &url,
            Some(keys),
            self.network_deadline(),
        );
        let summary = transport::fetch(&session, &git, remote_name, &[refspec])?;

        tracing::info!(
            updated = summary.updated.len(),
            objects = summary.received_objects,
            "fetched"
        );
        Ok(summary)
    }

    /// Merge `source` into `destination`, both local branches of one
    /// application.
    ///
    /// Source commits are read from the source branch's directory when it
    /// exists, otherwise from the local ref. No network access.
    ///
    /// # Errors
    ///
    /// - [`GitError::InvalidInput`] if source and destination are the same,
    ///   or the destination tree is not on `destination`
    /// - [`GitError::BranchNotFound`] if the source branch does not exist
    /// - [`GitError::DirtyWorkingTree`] if the destination has tracked changes
    pub fn merge_branch(
        &self,
        suffix: &RepoSuffix,
        source: &BranchName,
        destination: &BranchName,
    ) -> Result<MergeOutcome, GitError> {
        let span = tracing::info_span!(
            "merge_branch",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            source = %source,
            destination = %destination,
        );
        let _enter = span.enter();

        if source == destination {
            return Err(GitError::InvalidInput(
                "cannot merge a branch into itself".to_string(),
            ));
        }

        let dest_path = self.repo_path(suffix, Some(destination))?;
        let source_path = self.repo_path(suffix, Some(source))?;
        let _locks = self.lock(&[
            (dest_path.clone(), LockMode::Exclusive),
            (source_path.clone(), LockMode::Shared),
        ])?;

        let git = Git::open(&dest_path)?;
        let current = git.head_branch()?;
        if current.as_ref() != Some(destination) {
            return Err(GitError::InvalidInput(format!(
                "working tree for '{}' is on '{}'",
                destination,
                current.map(String::from).unwrap_or_else(|| "a detached HEAD".into())
            )));
        }
        git.ensure_clean()?;

        let source_tip = if Git::exists_at(&source_path) {
            git.fetch_from_path(&source_path, source)?
        } else {
            git.branch_tip(source)?
                .ok_or_else(|| GitError::BranchNotFound(source.to_string()))?
        };

        let message = format!("Merge branch '{}' into {}", source, destination);
        let outcome = git.merge_into_head(&source_tip, &message, self.config.merge_identity())?;
        if outcome.status == MergeStatus::Conflicted {
            tracing::warn!(paths = outcome.conflicts.len(), "merge left conflicts");
        } else {
            tracing::info!(status = %outcome.status, "merged");
        }
        Ok(outcome)
    }

    /// Discard an unfinished merge in `branch`'s working tree.
    ///
    /// Returns `false` when no merge was in progress.
    pub fn abort_merge(&self, suffix: &RepoSuffix, branch: &BranchName) -> Result<bool, GitError> {
        let span = tracing::info_span!(
            "abort_merge",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = %branch,
        );
        let _enter = span.enter();

        let path = self.repo_path(suffix, Some(branch))?;
        let _locks = self.lock_one(&path, LockMode::Exclusive)?;
        let aborted = Git::open(&path)?.abort_merge()?;
        if aborted {
            tracing::info!("merge aborted");
        }
        Ok(aborted)
    }

    /// Make sure the working tree's origin is `url`, adding it if missing.
    fn ensure_remote(&self, git: &Git, url: &RemoteUrl) -> Result<(), GitError> {
        let name = self.config.remote_name();
        match git.remote_url(name)? {
            Some(existing) if existing == url.as_str() => Ok(()),
            Some(existing) => Err(GitError::AlreadyConnected { existing }),
            None => git.add_remote(name, url.as_str()),
        }
    }
}
