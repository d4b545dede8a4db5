//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Repository reads, writes and
//! network transfers flow through [`Git`] and the functions in
//! [`transport`]. No other module imports `git2`; the service layer works
//! in [`BranchName`](crate::core::types::BranchName),
//! [`Oid`](crate::core::types::Oid) and the report types here.
//!
//! We use the `git2` crate exclusively, with its vendored libgit2 and SSH
//! support. There is no shelling out to a git binary.
//!
//! # Responsibilities
//!
//! - Opening and initializing working trees
//! - Branch refs, checkout and the default-branch record
//! - Status, history, commits and merges
//! - Clone, probe, fetch and push through a [`Transport`]
//! - Classifying every libgit2 failure into [`GitError`]
//!
//! # Invariants
//!
//! - Pushes are never forced
//! - Merges never auto-resolve conflicts
//! - Errors never carry key material
//!
//! # Example
//!
//! ```no_run
//! use appgit::core::types::BranchName;
//! use appgit::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/data/org/app/repo"))?;
//! let branch = git.head_branch()?.unwrap_or(BranchName::new("master")?);
//! let status = git.status_against(&branch)?;
//! println!("{} changed path(s)", status.len());
//! # Ok::<(), appgit::git::GitError>(())
//! ```

mod error;
mod interface;
mod report;
pub mod transport;

pub use error::GitError;
pub use interface::Git;
pub use report::{ChangeKind, CommitRecord, FetchSummary, MergeOutcome, MergeStatus, StatusReport};
pub use transport::{RemoteSession, SshTransport, Transport};
