//! git::error
//!
//! The error taxonomy shared by every repository operation.
//!
//! Raw `git2::Error`, `io::Error` and lower-layer errors are classified
//! here, once, so callers match on kinds instead of parsing messages.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::config::ConfigError;
use crate::core::ops::LockError;
use crate::core::types::TypeError;

/// Errors from repository operations.
///
/// No variant ever carries key material.
#[derive(Debug, Error)]
pub enum GitError {
    /// A caller-supplied value is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Branch name violates ref-name rules or collides with the layout.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    /// No repository at the path.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// A directory or file could not be created, read, or removed.
    #[error("filesystem error at {path}: {message}")]
    Filesystem { path: PathBuf, message: String },

    /// The remote refused the deploy key, or the host could not be trusted.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed or unreachable remote.
    #[error("invalid remote: {0}")]
    InvalidRemote(String),

    /// Remote url with a scheme other than ssh.
    #[error("unsupported remote scheme: {0}")]
    UnsupportedRemoteScheme(String),

    /// Network or protocol failure after the remote was reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// Deadline passed while waiting for a lock or the network.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The remote has commits the local branch lacks.
    #[error("push rejected for '{branch}': remote has diverged (non-fast-forward)")]
    NonFastForward { branch: String },

    /// Merge left conflicts in the working tree.
    #[error("merge conflict in {} path(s): {}", paths.len(), paths.join(", "))]
    MergeConflict { paths: Vec<String> },

    #[error("branch '{0}' already exists")]
    BranchAlreadyExists(String),

    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    /// Tracked files have uncommitted changes.
    #[error("working tree has uncommitted changes: {details}")]
    DirtyWorkingTree { details: String },

    /// A different origin is already configured.
    #[error("repository is already connected to {existing}")]
    AlreadyConnected { existing: String },

    #[error("nothing to commit")]
    NothingToCommit,

    /// libgit2 failure that fits no other kind.
    #[error("git error: {0}")]
    Internal(String),
}

impl GitError {
    /// Whether retrying the same call may succeed.
    ///
    /// # Example
    ///
    /// ```
    /// use appgit::git::GitError;
    ///
    /// assert!(GitError::Transport("connection reset".into()).is_retryable());
    /// assert!(!GitError::NothingToCommit.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::Transport(_) | GitError::Timeout(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GitError::InvalidInput(_) => "INVALID_INPUT",
            GitError::InvalidBranchName(_) => "INVALID_BRANCH_NAME",
            GitError::NotARepo { .. } => "NOT_A_REPO",
            GitError::Filesystem { .. } => "FILESYSTEM",
            GitError::Authentication(_) => "AUTHENTICATION",
            GitError::InvalidRemote(_) => "INVALID_REMOTE",
            GitError::UnsupportedRemoteScheme(_) => "UNSUPPORTED_REMOTE_SCHEME",
            GitError::Transport(_) => "TRANSPORT",
            GitError::Timeout(_) => "TIMEOUT",
            GitError::NonFastForward { .. } => "NON_FAST_FORWARD",
            GitError::MergeConflict { .. } => "MERGE_CONFLICT",
            GitError::BranchAlreadyExists(_) => "BRANCH_ALREADY_EXISTS",
            GitError::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            GitError::DirtyWorkingTree { .. } => "DIRTY_WORKING_TREE",
            GitError::AlreadyConnected { .. } => "ALREADY_CONNECTED",
            GitError::NothingToCommit => "NOTHING_TO_COMMIT",
            GitError::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn filesystem(path: &Path, err: impl std::fmt::Display) -> Self {
        GitError::Filesystem {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Classify a git2 error, with `context` naming what was being done.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let message = format!("{}: {}", context, err.message());
        match err.code() {
            ErrorCode::Auth => return GitError::Authentication(message),
            ErrorCode::Certificate => {
                return GitError::Authentication(format!("{}: host key not trusted", context))
            }
            ErrorCode::NotFastForward => {
                return GitError::NonFastForward {
                    branch: context.to_string(),
                }
            }
            ErrorCode::Conflict | ErrorCode::MergeConflict | ErrorCode::Uncommitted => {
                return GitError::DirtyWorkingTree { details: message }
            }
            ErrorCode::UnbornBranch => return GitError::BranchNotFound(context.to_string()),
            ErrorCode::InvalidSpec => return GitError::InvalidInput(message),
            ErrorCode::User => return GitError::Transport(format!("{}: cancelled", context)),
            _ => {}
        }

        match err.class() {
            ErrorClass::Net | ErrorClass::Ssh | ErrorClass::Http | ErrorClass::Ssl => {
                classify_network(err.class(), &message)
            }
            ErrorClass::Os | ErrorClass::Filesystem => GitError::Filesystem {
                path: PathBuf::from(context),
                message: err.message().to_string(),
            },
            ErrorClass::Repository if err.code() == ErrorCode::NotFound => GitError::NotARepo {
                path: PathBuf::from(context),
            },
            _ => GitError::Internal(message),
        }
    }
}

/// Split network failures into unreachable remotes, rejected keys and
/// everything else.
fn classify_network(class: git2::ErrorClass, message: &str) -> GitError {
    let lower = message.to_ascii_lowercase();

    const AUTH_MARKERS: [&str; 4] = [
        "authentication",
        "publickey",
        "permission denied",
        "username/publickey",
    ];
    const UNREACHABLE_MARKERS: [&str; 8] = [
        "failed to resolve",
        "could not resolve",
        "name or service not known",
        "connection refused",
        "no route to host",
        "repository not found",
        "does not appear to be a git repository",
        "could not find repository",
    ];

    if class == git2::ErrorClass::Ssh && AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        GitError::Authentication(message.to_string())
    } else if UNREACHABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        GitError::InvalidRemote(message.to_string())
    } else if lower.contains("timed out") {
        GitError::Timeout(message.to_string())
    } else {
        GitError::Transport(message.to_string())
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidBranchName(msg) => GitError::InvalidBranchName(msg),
            TypeError::UnsupportedScheme(scheme) => GitError::UnsupportedRemoteScheme(format!(
                "'{}' remotes are not supported, use an ssh url",
                scheme
            )),
            TypeError::InvalidRemoteUrl(msg) => GitError::InvalidRemote(msg),
            other => GitError::InvalidInput(other.to_string()),
        }
    }
}

impl From<LockError> for GitError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout(path) => {
                GitError::Timeout(format!("waiting for lock {}", path.display()))
            }
            other => GitError::Filesystem {
                path: PathBuf::new(),
                message: other.to_string(),
            },
        }
    }
}

impl From<AuthError> for GitError {
    fn from(err: AuthError) -> Self {
        GitError::InvalidInput(err.to_string())
    }
}

impl From<ConfigError> for GitError {
    fn from(err: ConfigError) -> Self {
        GitError::InvalidInput(err.to_string())
    }
}
