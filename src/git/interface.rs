//! git::interface
//!
//! Repository handle over git2.
//!
//! # Architecture
//!
//! [`Git`] wraps one opened `git2::Repository` for the duration of one
//! service operation. It exposes repository work in domain types
//! ([`BranchName`], [`Oid`], [`StatusReport`]) so nothing above this module
//! touches git2. Network work lives in [`super::transport`].
//!
//! # Example
//!
//! ```no_run
//! use appgit::core::types::BranchName;
//! use appgit::git::Git;
//! use std::path::Path;
//!
//! let master = BranchName::new("master")?;
//! let git = Git::init(Path::new("/data/org/app/repo"), &master)?;
//! std::fs::write("/data/org/app/repo/app.json", "{}").unwrap();
//! let oid = git.commit_all("initial", "Ada", "ada@example.com")?;
//! println!("committed {}", oid.short(7));
//! # Ok::<(), appgit::git::GitError>(())
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::error::GitError;
use super::report::{ChangeKind, CommitRecord, MergeOutcome, MergeStatus, StatusReport};
use crate::core::types::{BranchName, Oid};

/// Git config key holding the branch materialized at the application root.
const DEFAULT_BRANCH_KEY: &str = "appgit.defaultBranch";

/// Ref namespace for commits read from sibling branch directories.
const LOCAL_SOURCE_NAMESPACE: &str = "refs/appgit/sources";

/// An opened, non-bare repository.
pub struct Git {
    pub(super) repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

pub(super) fn oid_of(id: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(id.to_string()).map_err(GitError::from)
}

fn raw_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

impl Git {
    // =========================================================================
    // Opening and creation
    // =========================================================================

    /// Open the repository whose working tree is exactly `path`.
    ///
    /// Parent directories are not searched, so a branch directory that has
    /// not been materialized never resolves to the enclosing default tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` holds no repository
    /// - [`GitError::InvalidInput`] if the repository is bare
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::NotARepo {
                path: path.to_path_buf(),
            },
            _ => GitError::from_git2(e, &path.display().to_string()),
        })?;

        if repo.is_bare() {
            return Err(GitError::InvalidInput(format!(
                "{} is a bare repository",
                path.display()
            )));
        }
        Ok(Self { repo })
    }

    /// Whether a repository exists with its working tree at `path`.
    pub fn exists_at(path: &Path) -> bool {
        Self::open(path).is_ok()
    }

    /// Initialize a new repository, creating missing parent directories.
    pub fn init(path: &Path, initial_branch: &BranchName) -> Result<Self, GitError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(initial_branch.as_str())
            .mkpath(true)
            .no_reinit(true);

        let repo = git2::Repository::init_opts(path, &opts)
            .map_err(|e| GitError::from_git2(e, &path.display().to_string()))?;
        Ok(Self { repo })
    }

    /// Working tree root.
    pub fn workdir(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Copy this repository's `.git` into `workdir` and open the copy.
    ///
    /// The copy shares no files with the original; its working tree is empty
    /// until checked out. `info/exclude` starts empty in the copy, since the
    /// original's entries name directories relative to the original's root.
    pub fn duplicate_into(&self, workdir: &Path) -> Result<Git, GitError> {
        let git_dir = workdir.join(".git");
        copy_dir(self.repo.path(), &git_dir).map_err(|e| GitError::filesystem(workdir, e))?;

        let exclude = git_dir.join("info").join("exclude");
        if exclude.exists() {
            fs::write(&exclude, "").map_err(|e| GitError::filesystem(&exclude, e))?;
        }
        Git::open(workdir)
    }

    // =========================================================================
    // Default branch bookkeeping
    // =========================================================================

    /// Default branch recorded at clone, connect or init time.
    pub fn recorded_default_branch(&self) -> Result<Option<BranchName>, GitError> {
        let config = self
            .repo
            .config()
            .map_err(|e| GitError::from_git2(e, "config"))?;
        match config.get_string(DEFAULT_BRANCH_KEY) {
            Ok(value) => Ok(BranchName::new(value).ok()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, DEFAULT_BRANCH_KEY)),
        }
    }

    pub fn record_default_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut config = self
            .repo
            .config()
            .and_then(|c| c.open_level(git2::ConfigLevel::Local))
            .map_err(|e| GitError::from_git2(e, "config"))?;
        config
            .set_str(DEFAULT_BRANCH_KEY, branch.as_str())
            .map_err(|e| GitError::from_git2(e, DEFAULT_BRANCH_KEY))
    }

    // =========================================================================
    // HEAD and refs
    // =========================================================================

    /// Branch HEAD points at, even when that branch has no commits yet.
    ///
    /// Returns `None` for a detached HEAD.
    pub fn head_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = self
            .repo
            .find_reference("HEAD")
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .and_then(|name| BranchName::new(name).ok()))
    }

    /// Whether HEAD names a branch with no commits.
    pub fn is_unborn(&self) -> bool {
        matches!(
            self.repo.head(),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch || e.code() == git2::ErrorCode::NotFound
        )
    }

    /// Point HEAD at `branch` without touching the working tree.
    ///
    /// Used on repositories with no commits, where there is nothing to check out.
    pub fn set_head(&self, branch: &BranchName) -> Result<(), GitError> {
        self.repo
            .set_head(&branch.ref_name())
            .map_err(|e| GitError::from_git2(e, branch.as_str()))
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map(Some)
                .map_err(|e| GitError::from_git2(e, "HEAD")),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    fn ref_target(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, refname))?;
                oid_of(commit.id()).map(Some)
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Tip of a local branch.
    pub fn branch_tip(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.ref_target(&branch.ref_name())
    }

    /// Tip of a remote-tracking branch.
    pub fn remote_branch_tip(
        &self,
        remote: &str,
        branch: &BranchName,
    ) -> Result<Option<Oid>, GitError> {
        self.ref_target(&branch.remote_ref_name(remote))
    }

    /// Local branches in ref-name order.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::from_git2(e, "branches"))?;

        let mut names = Vec::new();
        for item in branches {
            let (branch, _) = item.map_err(|e| GitError::from_git2(e, "branches"))?;
            if let Some(name) = branch
                .name()
                .map_err(|e| GitError::from_git2(e, "branches"))?
            {
                if let Ok(name) = BranchName::new(name) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Tips of every remote-tracking branch under `remote`.
    pub fn remote_tracking_tips(
        &self,
        remote: &str,
    ) -> Result<Vec<(BranchName, Oid)>, GitError> {
        let prefix = format!("refs/remotes/{}/", remote);
        let refs = self
            .repo
            .references_glob(&format!("{}*", prefix))
            .map_err(|e| GitError::from_git2(e, &prefix))?;

        let mut tips = Vec::new();
        for reference in refs {
            let reference = reference.map_err(|e| GitError::from_git2(e, &prefix))?;
            let (Some(name), Some(target)) = (reference.name(), reference.target()) else {
                continue;
            };
            if let Some(Ok(branch)) = name.strip_prefix(&prefix).map(BranchName::new) {
                tips.push((branch, oid_of(target)?));
            }
        }
        tips.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tips)
    }

    /// Create `branch` at `at`.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchAlreadyExists`] if the branch exists
    pub fn create_branch(&self, branch: &BranchName, at: &Oid) -> Result<(), GitError> {
        let commit = self
            .repo
            .find_commit(raw_oid(at)?)
            .map_err(|e| GitError::from_git2(e, at.as_str()))?;
        self.repo
            .branch(branch.as_str(), &commit, false)
            .map_err(|e| match e.code() {
                git2::ErrorCode::Exists => GitError::BranchAlreadyExists(branch.to_string()),
                _ => GitError::from_git2(e, branch.as_str()),
            })?;
        Ok(())
    }

    /// Create a local branch from `<remote>/<branch>` and track it.
    pub fn create_tracking_branch(&self, remote: &str, branch: &BranchName) -> Result<Oid, GitError> {
        let tip = self
            .remote_branch_tip(remote, branch)?
            .ok_or_else(|| GitError::BranchNotFound(branch.to_string()))?;
        self.create_branch(branch, &tip)?;

        let mut local = self
            .repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, branch.as_str()))?;
        if let Err(e) = local.set_upstream(Some(&format!("{}/{}", remote, branch))) {
            // Needs a configured remote; anonymous remotes leave no upstream.
            tracing::debug!(branch = %branch, error = %e.message(), "upstream not set");
        }
        Ok(tip)
    }

    pub fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut local = self
            .repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, branch.as_str()))?;
        local
            .delete()
            .map_err(|e| GitError::from_git2(e, branch.as_str()))
    }

    /// Record `oid` as the remote-tracking tip of `branch`.
    pub fn set_remote_tracking(
        &self,
        remote: &str,
        branch: &BranchName,
        oid: &Oid,
    ) -> Result<(), GitError> {
        self.repo
            .reference(
                &branch.remote_ref_name(remote),
                raw_oid(oid)?,
                true,
                "appgit: update remote-tracking ref",
            )
            .map_err(|e| GitError::from_git2(e, branch.as_str()))?;
        Ok(())
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    /// URL of the named remote, if configured.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e)
                if e.code() == git2::ErrorCode::NotFound
                    || e.code() == git2::ErrorCode::InvalidSpec =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo
            .remote(name, url)
            .map_err(|e| GitError::from_git2(e, name))?;
        Ok(())
    }

    /// Fetch `branch` from the repository whose working tree is `source`.
    ///
    /// Local object transfer only; returns the fetched tip.
    pub fn fetch_from_path(&self, source: &Path, branch: &BranchName) -> Result<Oid, GitError> {
        let url = source.to_string_lossy();
        let target = format!("{}/{}", LOCAL_SOURCE_NAMESPACE, branch);
        let refspec = format!("+{}:{}", branch.ref_name(), target);

        let mut remote = self
            .repo
            .remote_anonymous(&url)
            .map_err(|e| GitError::from_git2(e, &url))?;
        remote
            .fetch(&[refspec.as_str()], None, Some("appgit: local fetch"))
            .map_err(|e| GitError::from_git2(e, &url))?;

        self.ref_target(&target)?
            .ok_or_else(|| GitError::BranchNotFound(branch.to_string()))
    }

    // =========================================================================
    // Working tree
    // =========================================================================

    /// Paths of tracked files with uncommitted changes.
    ///
    /// Untracked and ignored files are not reported.
    pub fn tracked_changes(&self) -> Result<Vec<String>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        Ok(statuses
            .iter()
            .filter(|entry| entry.status() != git2::Status::CURRENT)
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect())
    }

    /// Fail with [`GitError::DirtyWorkingTree`] if tracked files changed.
    pub fn ensure_clean(&self) -> Result<(), GitError> {
        let changes = self.tracked_changes()?;
        if changes.is_empty() {
            Ok(())
        } else {
            Err(GitError::DirtyWorkingTree {
                details: changes.join(", "),
            })
        }
    }

    /// Point HEAD at `branch` and force the working tree to match it.
    ///
    /// Only for freshly materialized directories with nothing to preserve.
    pub fn force_checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        self.set_head(branch)?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_head(Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "checkout"))
    }

    /// Switch to an existing local branch without overwriting local changes.
    pub fn switch_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let tip = self
            .branch_tip(branch)?
            .ok_or_else(|| GitError::BranchNotFound(branch.to_string()))?;
        let commit = self
            .repo
            .find_commit(raw_oid(&tip)?)
            .map_err(|e| GitError::from_git2(e, branch.as_str()))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "checkout"))?;
        self.set_head(branch)
    }

    /// Add `/relative/` to `.git/info/exclude` unless already present.
    pub fn exclude_dir(&self, relative: &Path) -> Result<(), GitError> {
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let pattern = format!("/{}/", parts.join("/"));

        let info = self.repo.path().join("info");
        fs::create_dir_all(&info).map_err(|e| GitError::filesystem(&info, e))?;
        let exclude = info.join("exclude");

        let existing = match fs::read_to_string(&exclude) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(GitError::filesystem(&exclude, e)),
        };
        if existing.lines().any(|line| line.trim() == pattern) {
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&exclude)
            .map_err(|e| GitError::filesystem(&exclude, e))?;
        let separator = if existing.is_empty() || existing.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        write!(file, "{}{}\n", separator, pattern).map_err(|e| GitError::filesystem(&exclude, e))
    }

    // =========================================================================
    // Status and history
    // =========================================================================

    /// Status of the working tree against the tip of `branch`.
    ///
    /// Untracked files count as added. An unborn `branch` that HEAD points
    /// at compares against the empty tree. The index is read, never written.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] if `branch` has no tip and is not HEAD's unborn branch
    pub fn status_against(&self, branch: &BranchName) -> Result<StatusReport, GitError> {
        let tree = match self.branch_tip(branch)? {
            Some(tip) => Some(
                self.repo
                    .find_commit(raw_oid(&tip)?)
                    .and_then(|c| c.tree())
                    .map_err(|e| GitError::from_git2(e, branch.as_str()))?,
            ),
            None if self.is_unborn_head(branch)? => None,
            None => return Err(GitError::BranchNotFound(branch.to_string())),
        };

        let mut opts = git2::DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_typechange(true);

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(tree.as_ref(), Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut report = StatusReport::default();
        for delta in diff.deltas() {
            let kind = match delta.status() {
                git2::Delta::Added | git2::Delta::Untracked | git2::Delta::Copied => {
                    ChangeKind::Added
                }
                git2::Delta::Deleted => ChangeKind::Removed,
                git2::Delta::Modified | git2::Delta::Renamed | git2::Delta::Typechange => {
                    ChangeKind::Modified
                }
                git2::Delta::Conflicted => ChangeKind::Conflicted,
                _ => continue,
            };
            let path = delta.new_file().path().or_else(|| delta.old_file().path());
            if let Some(path) = path {
                report.insert(path.to_string_lossy(), kind);
            }
        }

        for path in self.conflicted_paths()? {
            report.insert(path, ChangeKind::Conflicted);
        }
        Ok(report)
    }

    fn is_unborn_head(&self, branch: &BranchName) -> Result<bool, GitError> {
        Ok(self.is_unborn() && self.head_branch()?.as_ref() == Some(branch))
    }

    fn conflicted_paths(&self) -> Result<Vec<String>, GitError> {
        let index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for conflict in index
            .conflicts()
            .map_err(|e| GitError::from_git2(e, "index"))?
        {
            let conflict = conflict.map_err(|e| GitError::from_git2(e, "index"))?;
            if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Commits reachable from the tip of `branch`, newest first.
    ///
    /// Empty when `branch` is HEAD's unborn branch.
    pub fn history(&self, branch: &BranchName) -> Result<Vec<CommitRecord>, GitError> {
        let tip = match self.branch_tip(branch)? {
            Some(tip) => tip,
            None if self.is_unborn_head(branch)? => return Ok(Vec::new()),
            None => return Err(GitError::BranchNotFound(branch.to_string())),
        };

        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        walk.push(raw_oid(&tip)?)
            .and_then(|_| walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME))
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;

        let mut records = Vec::new();
        for id in walk {
            let id = id.map_err(|e| GitError::from_git2(e, "revwalk"))?;
            let commit = self
                .repo
                .find_commit(id)
                .map_err(|e| GitError::from_git2(e, "revwalk"))?;
            records.push(commit_record(&commit)?);
        }
        Ok(records)
    }

    // =========================================================================
    // Commits and merges
    // =========================================================================

    /// Stage every change, deletions included, and commit it.
    ///
    /// In merge state the commit gets `MERGE_HEAD` as extra parent and the
    /// merge state is cleared.
    ///
    /// # Errors
    ///
    /// - [`GitError::NothingToCommit`] if the staged tree equals HEAD outside a merge
    pub fn commit_all(
        &self,
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<Oid, GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .and_then(|_| index.update_all(["*"].iter(), None))
            .and_then(|_| index.write())
            .map_err(|e| GitError::from_git2(e, "stage"))?;

        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "write tree"))?;

        let head = self.head_commit()?;
        let merge_heads = self.merge_heads()?;
        if merge_heads.is_empty() {
            let unchanged = match &head {
                Some(commit) => commit.tree_id() == tree_id,
                None => index.is_empty(),
            };
            if unchanged {
                return Err(GitError::NothingToCommit);
            }
        }

        let signature = git2::Signature::now(author_name, author_email)
            .map_err(|e| GitError::InvalidInput(e.message().to_string()))?;
        let id = self.write_commit(&signature, message, tree_id, head, &merge_heads)?;

        if !merge_heads.is_empty() {
            self.repo
                .cleanup_state()
                .map_err(|e| GitError::from_git2(e, "cleanup merge state"))?;
        }
        oid_of(id)
    }

    fn merge_heads(&self) -> Result<Vec<git2::Oid>, GitError> {
        if self.repo.state() != git2::RepositoryState::Merge {
            return Ok(Vec::new());
        }
        // mergehead_foreach needs a mutable repository; the file is one oid per line
        let path = self.repo.path().join("MERGE_HEAD");
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GitError::filesystem(&path, e)),
        };
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| git2::Oid::from_str(line).map_err(|e| GitError::from_git2(e, "MERGE_HEAD")))
            .collect()
    }

    fn write_commit(
        &self,
        signature: &git2::Signature<'_>,
        message: &str,
        tree_id: git2::Oid,
        head: Option<git2::Commit<'_>>,
        extra_parents: &[git2::Oid],
    ) -> Result<git2::Oid, GitError> {
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "tree"))?;

        let mut parents: Vec<git2::Commit<'_>> = head.into_iter().collect();
        for id in extra_parents {
            parents.push(
                self.repo
                    .find_commit(*id)
                    .map_err(|e| GitError::from_git2(e, "merge parent"))?,
            );
        }
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        self.repo
            .commit(
                Some("HEAD"),
                signature,
                signature,
                message,
                &tree,
                &parent_refs,
            )
            .map_err(|e| GitError::from_git2(e, "commit"))
    }

    /// Merge commit `source` into the checked-out branch.
    ///
    /// Fast-forwards when possible, otherwise runs a three-way merge and
    /// commits the result as `identity`. Conflicts are left in the working
    /// tree and index with merge state recorded; nothing is auto-resolved.
    pub fn merge_into_head(
        &self,
        source: &Oid,
        message: &str,
        identity: (&str, &str),
    ) -> Result<MergeOutcome, GitError> {
        let annotated = self
            .repo
            .find_annotated_commit(raw_oid(source)?)
            .map_err(|e| GitError::from_git2(e, source.as_str()))?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&annotated])
            .map_err(|e| GitError::from_git2(e, "merge analysis"))?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::up_to_date());
        }
        if analysis.is_unborn() || analysis.is_fast_forward() {
            self.fast_forward(source)?;
            return Ok(MergeOutcome::moved(MergeStatus::FastForwarded, source.clone()));
        }

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe().allow_conflicts(true).conflict_style_merge(true);
        self.repo
            .merge(&[&annotated], None, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "merge"))?;

        let conflicts = self.conflicted_paths()?;
        if !conflicts.is_empty() {
            return Ok(MergeOutcome::conflicted(conflicts));
        }

        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        let signature = git2::Signature::now(identity.0, identity.1)
            .map_err(|e| GitError::InvalidInput(e.message().to_string()))?;
        let head = self.head_commit()?;
        let id = self.write_commit(&signature, message, tree_id, head, &[annotated.id()])?;

        self.repo
            .cleanup_state()
            .map_err(|e| GitError::from_git2(e, "cleanup merge state"))?;
        Ok(MergeOutcome::moved(MergeStatus::Merged, oid_of(id)?))
    }

    fn fast_forward(&self, target: &Oid) -> Result<(), GitError> {
        let branch = self.head_branch()?.ok_or_else(|| {
            GitError::InvalidInput("cannot fast-forward a detached HEAD".to_string())
        })?;
        let commit = self
            .repo
            .find_commit(raw_oid(target)?)
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "checkout"))?;
        self.repo
            .reference(&branch.ref_name(), commit.id(), true, "appgit: fast-forward")
            .map_err(|e| GitError::from_git2(e, branch.as_str()))?;
        Ok(())
    }

    /// Discard an unfinished merge, restoring the working tree to HEAD.
    ///
    /// Returns `false` when no merge was in progress.
    pub fn abort_merge(&self) -> Result<bool, GitError> {
        let merging = self.repo.state() == git2::RepositoryState::Merge;
        if !merging && self.conflicted_paths()?.is_empty() {
            return Ok(false);
        }

        let head = self
            .head_commit()?
            .ok_or_else(|| GitError::InvalidInput("no commit to reset to".to_string()))?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(head.as_object(), git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, "reset"))?;
        self.repo
            .cleanup_state()
            .map_err(|e| GitError::from_git2(e, "cleanup merge state"))?;
        Ok(true)
    }
}

fn commit_record(commit: &git2::Commit<'_>) -> Result<CommitRecord, GitError> {
    let author = commit.author();
    let timestamp: DateTime<Utc> =
        DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
    Ok(CommitRecord {
        hash: oid_of(commit.id())?,
        author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
        author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        timestamp,
    })
}

/// Recursively copy a directory, skipping stale lock files and symlinks.
fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target: PathBuf = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            if entry.file_name().to_string_lossy().ends_with(".lock") {
                continue;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn master() -> BranchName {
        BranchName::new("master").unwrap()
    }

    fn init_repo() -> (TempDir, Git) {
        let temp = TempDir::new().unwrap();
        let git = Git::init(&temp.path().join("repo"), &master()).unwrap();
        (temp, git)
    }

    fn write(git: &Git, name: &str, content: &str) {
        let path = git.workdir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn open_does_not_search_parents() {
        let (_temp, git) = init_repo();
        let nested = git.workdir().join("dev");
        fs::create_dir_all(&nested).unwrap();
        assert!(matches!(Git::open(&nested), Err(GitError::NotARepo { .. })));
    }

    #[test]
    fn unborn_head_is_reported() {
        let (_temp, git) = init_repo();
        assert!(git.is_unborn());
        assert_eq!(git.head_branch().unwrap(), Some(master()));
        assert!(git.list_branches().unwrap().is_empty());
        assert!(git.history(&master()).unwrap().is_empty());
    }

    #[test]
    fn default_branch_roundtrip() {
        let (_temp, git) = init_repo();
        assert_eq!(git.recorded_default_branch().unwrap(), None);
        git.record_default_branch(&master()).unwrap();
        assert_eq!(git.recorded_default_branch().unwrap(), Some(master()));
    }

    #[test]
    fn commit_and_history() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "{}");
        let first = git.commit_all("first", "Ada", "ada@example.com").unwrap();
        write(&git, "b.json", "{}");
        let second = git.commit_all("second", "Ada", "ada@example.com").unwrap();

        let history = git.history(&master()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].hash, second);
        assert_eq!(history[1].hash, first);
        assert_eq!(history[0].message, "second");
        assert_eq!(history[0].author_email, "ada@example.com");
    }

    #[test]
    fn nothing_to_commit() {
        let (_temp, git) = init_repo();
        assert!(matches!(
            git.commit_all("empty", "Ada", "ada@example.com"),
            Err(GitError::NothingToCommit)
        ));

        write(&git, "a.json", "{}");
        git.commit_all("first", "Ada", "ada@example.com").unwrap();
        assert!(matches!(
            git.commit_all("again", "Ada", "ada@example.com"),
            Err(GitError::NothingToCommit)
        ));
    }

    #[test]
    fn commit_stages_deletions() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "{}");
        write(&git, "b.json", "{}");
        git.commit_all("first", "Ada", "ada@example.com").unwrap();

        fs::remove_file(git.workdir().join("a.json")).unwrap();
        git.commit_all("remove a", "Ada", "ada@example.com").unwrap();
        assert!(git.status_against(&master()).unwrap().is_clean());
    }

    #[test]
    fn status_kinds() {
        let (_temp, git) = init_repo();
        write(&git, "keep.json", "1");
        write(&git, "gone.json", "1");
        git.commit_all("base", "Ada", "ada@example.com").unwrap();

        write(&git, "keep.json", "2");
        fs::remove_file(git.workdir().join("gone.json")).unwrap();
        write(&git, "pages/new.json", "1");

        let report = git.status_against(&master()).unwrap();
        assert_eq!(report.get("keep.json"), Some(ChangeKind::Modified));
        assert_eq!(report.get("gone.json"), Some(ChangeKind::Removed));
        assert_eq!(report.get("pages/new.json"), Some(ChangeKind::Added));
    }

    #[test]
    fn status_on_unknown_branch() {
        let (_temp, git) = init_repo();
        let other = BranchName::new("nope").unwrap();
        assert!(matches!(
            git.status_against(&other),
            Err(GitError::BranchNotFound(_))
        ));
    }

    #[test]
    fn excluded_dirs_are_invisible() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "{}");
        git.commit_all("base", "Ada", "ada@example.com").unwrap();

        git.exclude_dir(Path::new("feature/x")).unwrap();
        git.exclude_dir(Path::new("feature/x")).unwrap();
        write(&git, "feature/x/file.json", "{}");

        assert!(git.status_against(&master()).unwrap().is_clean());
        let exclude = fs::read_to_string(git.git_dir().join("info/exclude")).unwrap();
        assert_eq!(exclude.matches("/feature/x/").count(), 1);
    }

    #[test]
    fn duplicate_checks_out_branch() {
        let (temp, git) = init_repo();
        write(&git, "a.json", "{}");
        let tip = git.commit_all("base", "Ada", "ada@example.com").unwrap();
        let dev = BranchName::new("dev").unwrap();
        git.create_branch(&dev, &tip).unwrap();

        let copy = git.duplicate_into(&temp.path().join("copy")).unwrap();
        copy.force_checkout(&dev).unwrap();
        assert_eq!(copy.head_branch().unwrap(), Some(dev.clone()));
        assert!(copy.workdir().join("a.json").exists());
        assert!(copy.status_against(&dev).unwrap().is_clean());
    }

    #[test]
    fn duplicate_starts_with_empty_excludes() {
        let (temp, git) = init_repo();
        write(&git, "a.json", "{}");
        git.commit_all("base", "Ada", "ada@example.com").unwrap();
        git.exclude_dir(Path::new("dev")).unwrap();

        let copy = git.duplicate_into(&temp.path().join("dev")).unwrap();
        copy.force_checkout(&master()).unwrap();
        write(&copy, "dev/page.json", "{}");

        let status = copy.status_against(&master()).unwrap();
        assert_eq!(status.get("dev/page.json"), Some(ChangeKind::Added));
    }

    #[test]
    fn create_existing_branch_fails() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "{}");
        let tip = git.commit_all("base", "Ada", "ada@example.com").unwrap();
        assert!(matches!(
            git.create_branch(&master(), &tip),
            Err(GitError::BranchAlreadyExists(_))
        ));
    }

    #[test]
    fn fast_forward_merge() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "1");
        let base = git.commit_all("base", "Ada", "ada@example.com").unwrap();
        let dev = BranchName::new("dev").unwrap();
        git.create_branch(&dev, &base).unwrap();

        git.switch_branch(&dev).unwrap();
        write(&git, "a.json", "2");
        let ahead = git.commit_all("ahead", "Ada", "ada@example.com").unwrap();
        git.switch_branch(&master()).unwrap();

        let outcome = git.merge_into_head(&ahead, "merge dev", ("bot", "bot@x")).unwrap();
        assert_eq!(outcome.status, MergeStatus::FastForwarded);
        assert_eq!(git.branch_tip(&master()).unwrap(), Some(ahead.clone()));
        assert_eq!(fs::read_to_string(git.workdir().join("a.json")).unwrap(), "2");

        let again = git.merge_into_head(&ahead, "merge dev", ("bot", "bot@x")).unwrap();
        assert_eq!(again.status, MergeStatus::AlreadyUpToDate);
    }

    #[test]
    fn conflicting_merge_then_abort() {
        let (_temp, git) = init_repo();
        write(&git, "f", "base\n");
        let base = git.commit_all("base", "Ada", "ada@example.com").unwrap();
        let dev = BranchName::new("dev").unwrap();
        git.create_branch(&dev, &base).unwrap();

        write(&git, "f", "ours\n");
        git.commit_all("ours", "Ada", "ada@example.com").unwrap();

        git.switch_branch(&dev).unwrap();
        write(&git, "f", "theirs\n");
        let theirs = git.commit_all("theirs", "Ada", "ada@example.com").unwrap();
        git.switch_branch(&master()).unwrap();

        let outcome = git.merge_into_head(&theirs, "merge dev", ("bot", "bot@x")).unwrap();
        assert_eq!(outcome.status, MergeStatus::Conflicted);
        assert_eq!(outcome.conflicts, vec!["f".to_string()]);
        assert_eq!(
            git.status_against(&master()).unwrap().get("f"),
            Some(ChangeKind::Conflicted)
        );

        assert!(git.abort_merge().unwrap());
        assert!(git.status_against(&master()).unwrap().is_clean());
        assert!(!git.abort_merge().unwrap());
    }

    #[test]
    fn resolving_conflict_records_merge_parent() {
        let (_temp, git) = init_repo();
        write(&git, "f", "base\n");
        let base = git.commit_all("base", "Ada", "ada@example.com").unwrap();
        let dev = BranchName::new("dev").unwrap();
        git.create_branch(&dev, &base).unwrap();
        write(&git, "f", "ours\n");
        git.commit_all("ours", "Ada", "ada@example.com").unwrap();
        git.switch_branch(&dev).unwrap();
        write(&git, "f", "theirs\n");
        let theirs = git.commit_all("theirs", "Ada", "ada@example.com").unwrap();
        git.switch_branch(&master()).unwrap();
        git.merge_into_head(&theirs, "merge dev", ("bot", "bot@x")).unwrap();

        write(&git, "f", "resolved\n");
        let merge = git.commit_all("resolve", "Ada", "ada@example.com").unwrap();

        let commit = git.repo.find_commit(raw_oid(&merge).unwrap()).unwrap();
        assert_eq!(commit.parent_count(), 2);
        assert_eq!(git.repo.state(), git2::RepositoryState::Clean);
    }

    #[test]
    fn dirty_tracked_file_detected() {
        let (_temp, git) = init_repo();
        write(&git, "a.json", "1");
        git.commit_all("base", "Ada", "ada@example.com").unwrap();
        write(&git, "untracked.json", "1");
        assert!(git.ensure_clean().is_ok());

        write(&git, "a.json", "2");
        assert!(matches!(
            git.ensure_clean(),
            Err(GitError::DirtyWorkingTree { .. })
        ));
    }
}
