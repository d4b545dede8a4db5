//! service::commit
//!
//! Recording working tree changes as commits.

use std::path::Path;

use super::RepoService;
use crate::core::ops::LockMode;
use crate::core::paths::check_repo_path;
use crate::core::types::Oid;
use crate::git::{Git, GitError};

impl RepoService {
    /// Stage every change in the working tree at `path`, deletions included,
    /// and commit it with the given author as both author and committer.
    ///
    /// A repository in merge state gets a merge commit, which concludes the
    /// merge.
    ///
    /// # Errors
    ///
    /// - [`GitError::InvalidInput`] if the message, name or email is empty
    /// - [`GitError::NothingToCommit`] if nothing changed since HEAD
    pub fn commit_application(
        &self,
        path: &Path,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<Oid, GitError> {
        for (field, value) in [
            ("commit message", message),
            ("author name", author_name),
            ("author email", author_email),
        ] {
            if value.trim().is_empty() {
                return Err(GitError::InvalidInput(format!("{} cannot be empty", field)));
            }
        }
        check_repo_path(path)?;

        let span = tracing::info_span!("commit_application", path = %path.display());
        let _enter = span.enter();

        let _locks = self.lock_one(path, LockMode::Exclusive)?;
        let oid = Git::open(path)?.commit_all(message, author_name, author_email)?;
        tracing::info!(commit = %oid.short(7), "committed");
        Ok(oid)
    }
}
