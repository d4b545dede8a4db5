//! service::branches
//!
//! Branch lifecycle. Every non-default branch lives in its own working
//! tree nested under the default one: a copy of the default repository
//! with the branch checked out, hidden from the default tree through
//! `.git/info/exclude`.

use std::fs;
use std::path::Path;

use super::{existing_ancestor, remove_created, RepoService};
use crate::core::ops::LockMode;
use crate::core::types::{BranchName, RepoSuffix};
use crate::git::{Git, GitError};

impl RepoService {
    /// Create `branch` at the default branch tip and check it out in its own
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchAlreadyExists`] if the branch exists
    /// - [`GitError::BranchNotFound`] if the default branch has no commits
    /// - [`GitError::InvalidBranchName`] if the branch directory would collide
    ///   with an existing path
    pub fn create_and_checkout_to_branch(
        &self,
        suffix: &RepoSuffix,
        branch: &BranchName,
    ) -> Result<BranchName, GitError> {
        let span = tracing::info_span!(
            "create_branch",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = %branch,
        );
        let _enter = span.enter();

        let (default_path, git) = self.open_default(suffix)?;
        let target = self.paths.resolve(suffix, Some(branch));
        let _locks = self.lock(&[
            (default_path.clone(), LockMode::Exclusive),
            (target.clone(), LockMode::Exclusive),
        ])?;

        let default = self.default_branch_of(&git)?;
        if *branch == default {
            return Err(GitError::BranchAlreadyExists(branch.to_string()));
        }
        if git.branch_tip(branch)?.is_some() {
            return Err(GitError::BranchAlreadyExists(branch.to_string()));
        }
        if target.exists() {
            return Err(GitError::InvalidBranchName(format!(
                "'{}' collides with an existing path in the working tree",
                branch
            )));
        }

        let tip = git
            .branch_tip(&default)?
            .ok_or_else(|| GitError::BranchNotFound(default.to_string()))?;
        git.create_branch(branch, &tip)?;

        if let Err(e) = materialize(&git, &default_path, &target, branch) {
            if let Err(cleanup) = git.delete_branch(branch) {
                tracing::warn!(error = %cleanup, "could not delete branch after failure");
            }
            return Err(e);
        }

        tracing::info!(at = %tip.short(7), "branch created");
        Ok(branch.clone())
    }

    /// Make the working tree at `branch`'s path hold `branch`.
    ///
    /// A branch without a directory yet is materialized from the local
    /// branch or from `<remote>/<branch>`. Returns `false` when the tree was
    /// already on the branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if the branch exists neither locally nor remotely
    /// - [`GitError::DirtyWorkingTree`] if tracked files changed; nothing is touched
    pub fn checkout_to_branch(
        &self,
        suffix: &RepoSuffix,
        branch: &BranchName,
    ) -> Result<bool, GitError> {
        let span = tracing::info_span!(
            "checkout_branch",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
            branch = %branch,
        );
        let _enter = span.enter();

        let (default_path, default_git) = self.open_default(suffix)?;
        let target = self.repo_path(suffix, Some(branch))?;

        if Git::exists_at(&target) {
            let _locks = self.lock_one(&target, LockMode::Exclusive)?;
            let git = Git::open(&target)?;
            if git.head_branch()?.as_ref() == Some(branch) {
                return Ok(false);
            }
            git.ensure_clean()?;
            if git.branch_tip(branch)?.is_none() {
                git.create_tracking_branch(self.config.remote_name(), branch)?;
            }
            git.switch_branch(branch)?;
            tracing::info!("switched branch");
            return Ok(true);
        }

        let _locks = self.lock(&[
            (default_path.clone(), LockMode::Exclusive),
            (target.clone(), LockMode::Exclusive),
        ])?;
        if target.exists() {
            return Err(GitError::InvalidBranchName(format!(
                "'{}' collides with an existing path in the working tree",
                branch
            )));
        }

        let created_ref = if default_git.branch_tip(branch)?.is_some() {
            false
        } else {
            default_git
                .create_tracking_branch(self.config.remote_name(), branch)
                .map_err(|e| match e {
                    GitError::BranchNotFound(_) => GitError::BranchNotFound(branch.to_string()),
                    other => other,
                })?;
            true
        };

        if let Err(e) = materialize(&default_git, &default_path, &target, branch) {
            if created_ref {
                if let Err(cleanup) = default_git.delete_branch(branch) {
                    tracing::warn!(error = %cleanup, "could not delete branch after failure");
                }
            }
            return Err(e);
        }

        tracing::info!("branch directory materialized");
        Ok(true)
    }

    /// Local branches, default first, the rest in ref-name order.
    ///
    /// Empty when the repository has no commits yet.
    pub fn get_branches(&self, suffix: &RepoSuffix) -> Result<Vec<BranchName>, GitError> {
        let span = tracing::info_span!(
            "get_branches",
            tenant = %suffix.tenant(),
            app = %suffix.app(),
        );
        let _enter = span.enter();

        let default_path = self.paths.default_path(suffix);
        let _locks = self.lock_one(&default_path, LockMode::Shared)?;
        let git = Git::open(&default_path)?;

        let default = self.default_branch_of(&git)?;
        let mut branches = git.list_branches()?;
        if let Some(pos) = branches.iter().position(|b| *b == default) {
            let default = branches.remove(pos);
            branches.insert(0, default);
        }
        Ok(branches)
    }
}

/// Copy the default repository into `target`, check `branch` out there and
/// hide the directory from the default tree. Removes `target` on failure.
fn materialize(
    default_git: &Git,
    default_path: &Path,
    target: &Path,
    branch: &BranchName,
) -> Result<(), GitError> {
    let stop = existing_ancestor(target);
    let result = fs::create_dir_all(target)
        .map_err(|e| GitError::filesystem(target, e))
        .and_then(|_| default_git.exclude_dir(&branch.as_relative_path()))
        .and_then(|_| default_git.duplicate_into(target))
        .and_then(|copy| copy.force_checkout(branch));

    if let Err(e) = result {
        tracing::warn!(error = %e, kind = e.kind(), "materializing branch failed, cleaning up");
        remove_created(target, &stop);
        return Err(e);
    }
    tracing::debug!(
        path = %target.display(),
        under = %default_path.display(),
        "branch directory ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::{service, suffix};
    use super::*;
    use crate::core::ops::LockSet;
    use crate::core::types::Deadline;
    use std::time::Duration;
    use tempfile::TempDir;

    fn seeded(temp: &TempDir) -> (RepoService, std::path::PathBuf) {
        let service = service(temp);
        let path = service.repo_path(&suffix(), None).unwrap();
        service.create_new_repository(&path).unwrap();
        fs::write(path.join("app.json"), "{}").unwrap();
        service
            .commit_application(&path, "initial", "Ada", "ada@example.com")
            .unwrap();
        (service, path)
    }

    #[test]
    fn default_branch_is_read_under_the_default_lock() {
        let temp = TempDir::new().unwrap();
        let (service, default_path) = seeded(&temp);
        let master = BranchName::new("master").unwrap();

        let held = LockSet::acquire(
            service.paths(),
            &[(default_path.clone(), LockMode::Exclusive)],
            Deadline::after(Duration::from_secs(1)),
        )
        .unwrap();
        let waiting = service.with_deadline(Deadline::after(Duration::from_millis(300)));

        assert!(matches!(
            waiting.create_and_checkout_to_branch(&suffix(), &master),
            Err(GitError::Timeout(_))
        ));
        assert!(matches!(
            waiting.repo_path(&suffix(), Some(&master)),
            Err(GitError::Timeout(_))
        ));

        drop(held);
        assert!(matches!(
            service.create_and_checkout_to_branch(&suffix(), &master),
            Err(GitError::BranchAlreadyExists(_))
        ));
    }

    #[test]
    fn create_branch_materializes_directory() {
        let temp = TempDir::new().unwrap();
        let (service, default_path) = seeded(&temp);
        let dev = BranchName::new("dev").unwrap();

        service.create_and_checkout_to_branch(&suffix(), &dev).unwrap();

        let branch_path = default_path.join("dev");
        assert!(branch_path.join("app.json").exists());
        let git = Git::open(&branch_path).unwrap();
        assert_eq!(git.head_branch().unwrap(), Some(dev.clone()));

        let master = BranchName::new("master").unwrap();
        let status = service.get_status(&default_path, &master).unwrap();
        assert!(status.is_clean(), "branch dir leaked into default status: {status:?}");
    }

    #[test]
    fn create_branch_twice_fails() {
        let temp = TempDir::new().unwrap();
        let (service, _) = seeded(&temp);
        let dev = BranchName::new("dev").unwrap();
        service.create_and_checkout_to_branch(&suffix(), &dev).unwrap();
        assert!(matches!(
            service.create_and_checkout_to_branch(&suffix(), &dev),
            Err(GitError::BranchAlreadyExists(_))
        ));
    }

    #[test]
    fn create_branch_on_unborn_default_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let path = service.repo_path(&suffix(), None).unwrap();
        service.create_new_repository(&path).unwrap();
        let dev = BranchName::new("dev").unwrap();

        assert!(matches!(
            service.create_and_checkout_to_branch(&suffix(), &dev),
            Err(GitError::BranchNotFound(_))
        ));
        assert!(!path.join("dev").exists());
    }

    #[test]
    fn create_branch_colliding_with_file_fails() {
        let temp = TempDir::new().unwrap();
        let (service, default_path) = seeded(&temp);
        fs::create_dir_all(default_path.join("pages")).unwrap();
        let pages = BranchName::new("pages").unwrap();

        assert!(matches!(
            service.create_and_checkout_to_branch(&suffix(), &pages),
            Err(GitError::InvalidBranchName(_))
        ));
        let git = Git::open(&default_path).unwrap();
        assert!(git.branch_tip(&pages).unwrap().is_none());
    }

    #[test]
    fn branches_list_default_first() {
        let temp = TempDir::new().unwrap();
        let (service, _) = seeded(&temp);
        for name in ["zeta", "alpha"] {
            service
                .create_and_checkout_to_branch(&suffix(), &BranchName::new(name).unwrap())
                .unwrap();
        }

        let names: Vec<String> = service
            .get_branches(&suffix())
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["master", "alpha", "zeta"]);
    }

    #[test]
    fn branches_empty_before_first_commit() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let path = service.repo_path(&suffix(), None).unwrap();
        service.create_new_repository(&path).unwrap();
        assert!(service.get_branches(&suffix()).unwrap().is_empty());
    }

    #[test]
    fn checkout_materializes_local_branch() {
        let temp = TempDir::new().unwrap();
        let (service, default_path) = seeded(&temp);
        let git = Git::open(&default_path).unwrap();
        let tip = git.branch_tip(&BranchName::new("master").unwrap()).unwrap().unwrap();
        let feature = BranchName::new("feature/x").unwrap();
        git.create_branch(&feature, &tip).unwrap();

        assert!(service.checkout_to_branch(&suffix(), &feature).unwrap());
        assert!(default_path.join("feature/x/app.json").exists());
        assert!(!service.checkout_to_branch(&suffix(), &feature).unwrap());
    }

    #[test]
    fn checkout_unknown_branch_fails() {
        let temp = TempDir::new().unwrap();
        let (service, default_path) = seeded(&temp);
        let ghost = BranchName::new("ghost").unwrap();
        assert!(matches!(
            service.checkout_to_branch(&suffix(), &ghost),
            Err(GitError::BranchNotFound(_))
        ));
        assert!(!default_path.join("ghost").exists());
    }
}
