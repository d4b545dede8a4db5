//! core::paths
//!
//! Centralized path routing for application repositories.
//!
//! # Layout
//!
//! Every application owns one directory tree under the configured root:
//!
//! - `<root>/<tenant>/<app>/<repo_dir>` - default branch working tree
//! - `<root>/<tenant>/<app>/<repo_dir>/<branch>` - one directory per other branch
//! - `<lock_dir>/<sha256(path)>.lock` - lock file for a resolved path
//!
//! **Hard rule:** no code may build repository paths by hand. All paths go
//! through [`RepoPaths`], so identical suffixes always land on identical
//! directories and lock files never live inside a working tree.
//!
//! # Example
//!
//! ```
//! use appgit::core::paths::RepoPaths;
//! use appgit::core::types::{BranchName, RepoSuffix};
//! use std::path::PathBuf;
//!
//! let paths = RepoPaths::new("/data", "repo", "/data/.locks");
//! let suffix = RepoSuffix::new("org", "app").unwrap();
//!
//! assert_eq!(paths.resolve(&suffix, None), PathBuf::from("/data/org/app/repo"));
//!
//! let dev = BranchName::new("dev").unwrap();
//! assert_eq!(
//!     paths.resolve(&suffix, Some(&dev)),
//!     PathBuf::from("/data/org/app/repo/dev")
//! );
//! ```

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::config::Config;
use crate::core::types::{BranchName, RepoSuffix, TypeError};

/// Centralized path routing for repositories and their locks.
///
/// # Invariants
///
/// - `resolve` is pure: no I/O, same inputs give the same path
/// - Distinct (tenant, app) pairs never share a directory, since both ids
///   are single validated path components
/// - Branch names are validated `BranchName`s, so they cannot escape the
///   application directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    root: PathBuf,
    repo_dir_name: String,
    lock_dir: PathBuf,
}

impl RepoPaths {
    pub fn new(
        root: impl Into<PathBuf>,
        repo_dir_name: impl Into<String>,
        lock_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            repo_dir_name: repo_dir_name.into(),
            lock_dir: lock_dir.into(),
        }
    }

    /// Build the path routing from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.root(), config.repo_dir_name(), config.lock_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Directory holding everything that belongs to one application.
    pub fn app_dir(&self, suffix: &RepoSuffix) -> PathBuf {
        self.root
            .join(suffix.tenant().as_str())
            .join(suffix.app().as_str())
    }

    /// Path of the default branch working tree.
    pub fn default_path(&self, suffix: &RepoSuffix) -> PathBuf {
        self.app_dir(suffix).join(&self.repo_dir_name)
    }

    /// Resolve the working tree path for a suffix.
    ///
    /// An explicit `branch` overrides the suffix's own branch segment. With
    /// neither, the default branch path is returned. Callers decide whether a
    /// branch is the default one; this function only routes.
    pub fn resolve(&self, suffix: &RepoSuffix, branch: Option<&BranchName>) -> PathBuf {
        let default = self.default_path(suffix);
        match branch.or(suffix.branch()) {
            Some(branch) => default.join(branch.as_relative_path()),
            None => default,
        }
    }

    /// Lock file guarding a resolved path.
    ///
    /// The file name is the SHA-256 of the path, so paths of any length map
    /// to a flat directory of fixed-size names. The path is hashed in
    /// component form: `repo`, `repo/` and `repo//` share one lock.
    pub fn lock_path(&self, path: &Path) -> PathBuf {
        let normalized: PathBuf = path.components().collect();
        let mut hasher = Sha256::new();
        hasher.update(normalized.to_string_lossy().as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.lock_dir.join(format!("{}.lock", digest))
    }
}

/// Check that a caller-supplied repository path is absolute and free of
/// `.`/`..` segments.
///
/// # Example
///
/// ```
/// use appgit::core::paths::check_repo_path;
/// use std::path::Path;
///
/// assert!(check_repo_path(Path::new("/data/org/app/repo")).is_ok());
/// assert!(check_repo_path(Path::new("relative/repo")).is_err());
/// assert!(check_repo_path(Path::new("/data/../etc")).is_err());
/// ```
pub fn check_repo_path(path: &Path) -> Result<(), TypeError> {
    if !path.is_absolute() {
        return Err(TypeError::InvalidPath(format!(
            "{} is not absolute",
            path.display()
        )));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return Err(TypeError::InvalidPath(format!(
            "{} contains relative segments",
            path.display()
        )));
    }
    Ok(())
}
