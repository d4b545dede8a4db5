//! git::report
//!
//! Plain data returned by repository reads and merges.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{BranchName, Oid};

/// How one path differs from the branch tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Conflicted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
            ChangeKind::Conflicted => "conflicted",
        };
        write!(f, "{}", s)
    }
}

/// Working tree status relative to a branch tip.
///
/// Each path appears once. A conflict overrides any other kind recorded for
/// the same path.
///
/// # Example
///
/// ```
/// use appgit::git::{ChangeKind, StatusReport};
///
/// let mut report = StatusReport::default();
/// assert!(report.is_clean());
///
/// report.insert("pages/home.json", ChangeKind::Modified);
/// report.insert("pages/home.json", ChangeKind::Conflicted);
/// assert_eq!(report.get("pages/home.json"), Some(ChangeKind::Conflicted));
/// assert_eq!(report.conflicted(), vec!["pages/home.json"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    entries: BTreeMap<String, ChangeKind>,
}

impl StatusReport {
    pub fn insert(&mut self, path: impl Into<String>, kind: ChangeKind) {
        let path = path.into();
        match self.entries.get(&path) {
            Some(ChangeKind::Conflicted) => {}
            _ => {
                self.entries.insert(path, kind);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<ChangeKind> {
        self.entries.get(path).copied()
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        self.entries.iter().map(|(p, k)| (p.as_str(), *k))
    }

    /// Paths with the given kind, in path order.
    pub fn paths(&self, kind: ChangeKind) -> Vec<&str> {
        self.iter()
            .filter(|(_, k)| *k == kind)
            .map(|(p, _)| p)
            .collect()
    }

    pub fn added(&self) -> Vec<&str> {
        self.paths(ChangeKind::Added)
    }

    pub fn modified(&self) -> Vec<&str> {
        self.paths(ChangeKind::Modified)
    }

    pub fn removed(&self) -> Vec<&str> {
        self.paths(ChangeKind::Removed)
    }

    pub fn conflicted(&self) -> Vec<&str> {
        self.paths(ChangeKind::Conflicted)
    }
}

/// Serialized grouped by kind, the shape API consumers read.
impl Serialize for StatusReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Grouped<'a> {
            added: Vec<&'a str>,
            modified: Vec<&'a str>,
            removed: Vec<&'a str>,
            conflicting: Vec<&'a str>,
            is_clean: bool,
        }

        Grouped {
            added: self.added(),
            modified: self.modified(),
            removed: self.removed(),
            conflicting: self.conflicted(),
            is_clean: self.is_clean(),
        }
        .serialize(serializer)
    }
}

/// One commit in a branch history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub hash: Oid,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Result kind of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStatus {
    AlreadyUpToDate,
    FastForwarded,
    Merged,
    Conflicted,
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MergeStatus::AlreadyUpToDate => "ALREADY_UP_TO_DATE",
            MergeStatus::FastForwarded => "FAST_FORWARDED",
            MergeStatus::Merged => "MERGED",
            MergeStatus::Conflicted => "CONFLICTED",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of merging one commit into a working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub status: MergeStatus,
    /// Paths left conflicted, empty unless `status` is `Conflicted`.
    pub conflicts: Vec<String>,
    /// New tip of the destination branch, if it moved.
    pub commit: Option<Oid>,
}

impl MergeOutcome {
    pub(crate) fn up_to_date() -> Self {
        Self {
            status: MergeStatus::AlreadyUpToDate,
            conflicts: Vec::new(),
            commit: None,
        }
    }

    pub(crate) fn moved(status: MergeStatus, commit: Oid) -> Self {
        Self {
            status,
            conflicts: Vec::new(),
            commit: Some(commit),
        }
    }

    pub(crate) fn conflicted(paths: Vec<String>) -> Self {
        Self {
            status: MergeStatus::Conflicted,
            conflicts: paths,
            commit: None,
        }
    }
}

/// Remote-tracking refs changed by a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    /// Branches whose tracking ref was created or moved.
    pub updated: Vec<BranchName>,
    pub received_objects: usize,
}
