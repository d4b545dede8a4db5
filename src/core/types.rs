//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`TenantId`] / [`AppId`] - Single path components naming an owner and an application
//! - [`RepoSuffix`] - Tenant-scoped address of one application repository
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RemoteUrl`] - Validated SSH remote
//! - [`Deadline`] - Point in time after which an operation gives up
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so path derivation never sees a traversal
//! segment and transport code never sees a non-SSH remote.
//!
//! # Examples
//!
//! ```
//! use appgit::core::types::{BranchName, RemoteUrl, RepoSuffix};
//!
//! let suffix = RepoSuffix::new("org-1", "app-7").unwrap();
//! let branch = BranchName::new("feature/login").unwrap();
//! let remote = RemoteUrl::parse("git@github.com:acme/app.git").unwrap();
//!
//! assert_eq!(suffix.tenant().as_str(), "org-1");
//! assert_eq!(branch.as_str(), "feature/login");
//! assert_eq!(remote.host(), "github.com");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(RepoSuffix::new("..", "app").is_err());
//! assert!(RemoteUrl::parse("https://github.com/acme/app.git").is_err());
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid repository path: {0}")]
    InvalidPath(String),

    #[error("invalid remote url: {0}")]
    InvalidRemoteUrl(String),

    #[error("unsupported remote scheme '{0}': only ssh remotes are accepted")]
    UnsupportedScheme(String),
}

/// Validate a single path component used as a tenant or application id.
fn validate_component(kind: &str, value: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::InvalidId(format!("{kind} cannot be empty")));
    }
    if value == "." || value == ".." {
        return Err(TypeError::InvalidId(format!(
            "{kind} cannot be a relative path segment"
        )));
    }
    if value.contains(['/', '\\']) {
        return Err(TypeError::InvalidId(format!(
            "{kind} cannot contain path separators"
        )));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(TypeError::InvalidId(format!(
            "{kind} cannot contain control characters"
        )));
    }
    Ok(())
}

/// Identifier of the tenant (organization/workspace) owning applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        validate_component("tenant id", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one application within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        validate_component("application id", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant-scoped address of an application repository.
///
/// The optional branch segment selects a branch directory; without it the
/// suffix addresses the default branch at the application root.
///
/// # Example
///
/// ```
/// use appgit::core::types::{BranchName, RepoSuffix};
///
/// let suffix = RepoSuffix::new("org", "app").unwrap();
/// assert!(suffix.branch().is_none());
///
/// let on_branch = suffix.with_branch(BranchName::new("dev").unwrap());
/// assert_eq!(on_branch.branch().unwrap().as_str(), "dev");
/// assert_eq!(on_branch.tenant(), suffix.tenant());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSuffix {
    tenant: TenantId,
    app: AppId,
    branch: Option<BranchName>,
}

impl RepoSuffix {
    /// Create a suffix for the default branch of an application.
    pub fn new(tenant: impl Into<String>, app: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self {
            tenant: TenantId::new(tenant)?,
            app: AppId::new(app)?,
            branch: None,
        })
    }

    /// Same application, addressing `branch`.
    pub fn with_branch(&self, branch: BranchName) -> Self {
        Self {
            tenant: self.tenant.clone(),
            app: self.app.clone(),
            branch: Some(branch),
        }
    }

    /// Same application, addressing the default branch.
    pub fn without_branch(&self) -> Self {
        Self {
            tenant: self.tenant.clone(),
            app: self.app.clone(),
            branch: None,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn app(&self) -> &AppId {
        &self.app
    }

    pub fn branch(&self) -> Option<&BranchName> {
        self.branch.as_ref()
    }
}

impl std::fmt::Display for RepoSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}/{}@{}", self.tenant, self.app, branch),
            None => write!(f, "{}/{}", self.tenant, self.app),
        }
    }
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// Because a branch name also names a directory, these rules are what keeps
/// branch paths inside the application directory.
///
/// # Example
///
/// ```
/// use appgit::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }

        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }

        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if name.starts_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be an absolute path".into(),
            ));
        }

        if name.ends_with(".lock") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '.lock'".into(),
            ));
        }
        if name.ends_with('/') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot end with '/'".into(),
            ));
        }

        if name.contains("..") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '..'".into(),
            ));
        }
        if name.contains("@{") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '@{'".into(),
            ));
        }
        if name.contains("//") {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain '//'".into(),
            ));
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{c}'"
                )));
            }
        }

        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain control characters".into(),
            ));
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot start with '.'".into(),
                ));
            }
            if component.ends_with(".lock") {
                return Err(TypeError::InvalidBranchName(
                    "path component cannot end with '.lock'".into(),
                ));
            }
        }

        Ok(())
    }

    /// Wrap a name known to be valid at compile time.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::validate(name).is_ok());
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full ref name, `refs/heads/<name>`.
    pub fn ref_name(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// The remote-tracking ref for this branch under `remote`.
    pub fn remote_ref_name(&self, remote: &str) -> String {
        format!("refs/remotes/{}/{}", remote, self.0)
    }

    /// The branch name as a relative directory path.
    pub fn as_relative_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use appgit::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a remote is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteScheme {
    /// `ssh://[user@]host[:port]/path`
    Ssh,
    /// `[user@]host:path`
    Scp,
    /// A repository on the local filesystem. Never produced by [`RemoteUrl::parse`].
    Local,
}

/// A validated remote URL.
///
/// [`RemoteUrl::parse`] accepts only SSH remotes, in URL form or scp form.
/// Anything carrying another scheme, and plain filesystem paths, are
/// rejected with [`TypeError::UnsupportedScheme`].
///
/// # Example
///
/// ```
/// use appgit::core::types::{RemoteScheme, RemoteUrl};
///
/// let url = RemoteUrl::parse("ssh://deploy@git.example.com:2222/team/app.git").unwrap();
/// assert_eq!(url.scheme(), RemoteScheme::Ssh);
/// assert_eq!(url.username(), Some("deploy"));
/// assert_eq!(url.host(), "git.example.com");
///
/// let scp = RemoteUrl::parse("git@github.com:acme/app.git").unwrap();
/// assert_eq!(scp.scheme(), RemoteScheme::Scp);
/// assert_eq!(scp.username(), Some("git"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    raw: String,
    scheme: RemoteScheme,
    username: Option<String>,
    host: String,
}

impl RemoteUrl {
    /// Parse and validate an SSH remote URL.
    pub fn parse(url: &str) -> Result<Self, TypeError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TypeError::InvalidRemoteUrl("remote url cannot be empty".into()));
        }
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidRemoteUrl(
                "remote url cannot contain whitespace".into(),
            ));
        }

        if let Some((scheme, rest)) = url.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "ssh" | "git+ssh" | "ssh+git" => Self::parse_ssh_form(url, rest),
                other => Err(TypeError::UnsupportedScheme(other.to_string())),
            };
        }

        Self::parse_scp_form(url)
    }

    /// A remote that is a repository on the local filesystem.
    ///
    /// Only transports that explicitly allow local remotes accept these.
    pub fn local(path: &Path) -> Self {
        Self {
            raw: path.to_string_lossy().into_owned(),
            scheme: RemoteScheme::Local,
            username: None,
            host: String::new(),
        }
    }

    fn parse_ssh_form(raw: &str, rest: &str) -> Result<Self, TypeError> {
        let (authority, path) = rest.split_once('/').ok_or_else(|| {
            TypeError::InvalidRemoteUrl("ssh url is missing a repository path".into())
        })?;
        if path.is_empty() {
            return Err(TypeError::InvalidRemoteUrl(
                "ssh url is missing a repository path".into(),
            ));
        }

        let (username, host_port) = split_user(authority)?;
        let host = match host_port.rsplit_once(':') {
            Some((host, port)) if !host.starts_with('[') || host.ends_with(']') => {
                if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                    return Err(TypeError::InvalidRemoteUrl(format!("invalid port '{port}'")));
                }
                host
            }
            _ => host_port,
        };
        if host.is_empty() {
            return Err(TypeError::InvalidRemoteUrl("ssh url is missing a host".into()));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: RemoteScheme::Ssh,
            username,
            host: host.to_string(),
        })
    }

    fn parse_scp_form(raw: &str) -> Result<Self, TypeError> {
        // scp syntax requires the colon to appear before any slash
        let colon = raw.find(':');
        let slash = raw.find('/');
        let colon = match (colon, slash) {
            (Some(c), Some(s)) if c < s => c,
            (Some(c), None) => c,
            _ => return Err(TypeError::UnsupportedScheme("file".into())),
        };

        let (authority, path) = (&raw[..colon], &raw[colon + 1..]);
        if path.is_empty() {
            return Err(TypeError::InvalidRemoteUrl(
                "remote is missing a repository path".into(),
            ));
        }

        let (username, host) = split_user(authority)?;
        if host.is_empty() {
            return Err(TypeError::InvalidRemoteUrl("remote is missing a host".into()));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: RemoteScheme::Scp,
            username,
            host: host.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> RemoteScheme {
        self.scheme
    }

    pub fn is_ssh(&self) -> bool {
        matches!(self.scheme, RemoteScheme::Ssh | RemoteScheme::Scp)
    }

    /// User embedded in the URL, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split `user@host` into its parts.
fn split_user(authority: &str) -> Result<(Option<String>, &str), TypeError> {
    match authority.rsplit_once('@') {
        Some((user, host)) => {
            if user.is_empty() {
                return Err(TypeError::InvalidRemoteUrl("empty ssh username".into()));
            }
            if user.contains(':') {
                return Err(TypeError::InvalidRemoteUrl(
                    "password authentication is not supported".into(),
                ));
            }
            Ok((Some(user.to_string()), host))
        }
        None => Ok((None, authority)),
    }
}

/// A point in time after which an operation gives up.
///
/// # Example
///
/// ```
/// use appgit::core::types::Deadline;
/// use std::time::Duration;
///
/// let deadline = Deadline::after(Duration::from_secs(60));
/// assert!(!deadline.expired());
/// assert!(deadline.remaining() > Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// A deadline `duration` from now.
    ///
    /// Durations too large for the platform clock are capped at roughly a
    /// century, which no operation outlives.
    pub fn after(duration: Duration) -> Self {
        const CENTURY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);
        let now = Instant::now();
        let at = now
            .checked_add(duration)
            .or_else(|| now.checked_add(duration.min(CENTURY)))
            .unwrap_or(now);
        Self(at)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ids {
        use super::*;

        #[test]
        fn valid_ids() {
            assert!(TenantId::new("org-1").is_ok());
            assert!(AppId::new("64f0c2a9e1").is_ok());
            assert!(AppId::new("app.with.dots").is_ok());
        }

        #[test]
        fn traversal_rejected() {
            assert!(TenantId::new("..").is_err());
            assert!(TenantId::new(".").is_err());
            assert!(AppId::new("a/b").is_err());
            assert!(AppId::new("a\\b").is_err());
            assert!(AppId::new("/abs").is_err());
        }

        #[test]
        fn empty_and_control_rejected() {
            assert!(TenantId::new("").is_err());
            assert!(AppId::new("app\0").is_err());
            assert!(AppId::new("app\n").is_err());
        }

        #[test]
        fn suffix_display() {
            let suffix = RepoSuffix::new("org", "app").unwrap();
            assert_eq!(suffix.to_string(), "org/app");
            let branch = suffix.with_branch(BranchName::new("dev").unwrap());
            assert_eq!(branch.to_string(), "org/app@dev");
            assert_eq!(branch.without_branch(), suffix);
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn traversal_rejected() {
            assert!(BranchName::new("..").is_err());
            assert!(BranchName::new("a/../b").is_err());
            assert!(BranchName::new("/etc/passwd").is_err());
            assert!(BranchName::new("a/./b").is_err());
            assert!(BranchName::new("a\\b").is_err());
        }

        #[test]
        fn git_rules_enforced() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new("foo/bar.lock").is_err());
            assert!(BranchName::new("branch/").is_err());
            assert!(BranchName::new("foo@{bar").is_err());
            assert!(BranchName::new("foo//bar").is_err());
            assert!(BranchName::new("has~tilde").is_err());
            assert!(BranchName::new("has:colon").is_err());
            assert!(BranchName::new("has\ttab").is_err());
        }

        #[test]
        fn ref_names() {
            let name = BranchName::new("feature/x").unwrap();
            assert_eq!(name.ref_name(), "refs/heads/feature/x");
            assert_eq!(name.remote_ref_name("origin"), "refs/remotes/origin/feature/x");
            assert_eq!(name.as_relative_path(), PathBuf::from("feature").join("x"));
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("feature/test").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            let parsed: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(name, parsed);
            assert!(serde_json::from_str::<BranchName>("\"bad..name\"").is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn normalizes_case() {
            let oid = Oid::new("ABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
            assert_eq!(oid.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
        }

        #[test]
        fn rejects_bad_length_and_chars() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
            assert!(Oid::new("a".repeat(64)).is_ok());
        }

        #[test]
        fn short_clamps() {
            let oid = Oid::new("a".repeat(40)).unwrap();
            assert_eq!(oid.short(100).len(), 40);
        }
    }

    mod remote_url {
        use super::*;

        #[test]
        fn ssh_url_form() {
            let url = RemoteUrl::parse("ssh://git@example.com/team/app.git").unwrap();
            assert_eq!(url.scheme(), RemoteScheme::Ssh);
            assert_eq!(url.username(), Some("git"));
            assert_eq!(url.host(), "example.com");
            assert!(url.is_ssh());
        }

        #[test]
        fn ssh_url_with_port() {
            let url = RemoteUrl::parse("ssh://example.com:2222/app.git").unwrap();
            assert_eq!(url.host(), "example.com");
            assert_eq!(url.username(), None);
        }

        #[test]
        fn scp_form() {
            let url = RemoteUrl::parse("git@gitlab.com:group/sub/app.git").unwrap();
            assert_eq!(url.scheme(), RemoteScheme::Scp);
            assert_eq!(url.host(), "gitlab.com");
            assert_eq!(url.as_str(), "git@gitlab.com:group/sub/app.git");
        }

        #[test]
        fn non_ssh_schemes_unsupported() {
            assert_eq!(
                RemoteUrl::parse("https://github.com/a/b.git"),
                Err(TypeError::UnsupportedScheme("https".into()))
            );
            assert!(matches!(
                RemoteUrl::parse("git://example.com/a.git"),
                Err(TypeError::UnsupportedScheme(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("file:///srv/a.git"),
                Err(TypeError::UnsupportedScheme(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("/srv/git/a.git"),
                Err(TypeError::UnsupportedScheme(_))
            ));
        }

        #[test]
        fn malformed_rejected() {
            assert!(matches!(RemoteUrl::parse(""), Err(TypeError::InvalidRemoteUrl(_))));
            assert!(matches!(
                RemoteUrl::parse("ssh://example.com"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("ssh://example.com:abc/x.git"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("git@:repo.git"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("git@host:"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("ssh://user:pw@host/x.git"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
            assert!(matches!(
                RemoteUrl::parse("git@host:has space.git"),
                Err(TypeError::InvalidRemoteUrl(_))
            ));
        }

        #[test]
        fn local_is_not_ssh() {
            let url = RemoteUrl::local(Path::new("/srv/a.git"));
            assert_eq!(url.scheme(), RemoteScheme::Local);
            assert!(!url.is_ssh());
        }
    }

    mod deadline {
        use super::*;

        #[test]
        fn past_deadline_is_expired() {
            let deadline = Deadline::at(Instant::now());
            std::thread::sleep(Duration::from_millis(1));
            assert!(deadline.expired());
            assert_eq!(deadline.remaining(), Duration::ZERO);
        }

        #[test]
        fn ordering_follows_instants() {
            let early = Deadline::after(Duration::from_secs(1));
            let late = Deadline::after(Duration::from_secs(10));
            assert!(early < late);
        }

        #[test]
        fn huge_duration_does_not_overflow() {
            let deadline = Deadline::after(Duration::from_secs(u64::MAX));
            assert!(!deadline.expired());
            assert!(deadline.remaining() > Duration::from_secs(365 * 24 * 60 * 60));
        }
    }
}
