//! git::transport
//!
//! Network operations against an application's remote.
//!
//! # Design
//!
//! [`Transport`] is the seam between repository work and the outside world:
//! it decides which remote urls are acceptable and how credentials are
//! produced. [`SshTransport`] is the production implementation; it accepts
//! ssh remotes only and authenticates with the per-call deploy key, read
//! from memory and never written to disk.
//!
//! A [`RemoteSession`] binds one transport, url, key pair and deadline for a
//! single network call. Every libgit2 progress callback checks the deadline
//! and cancels the transfer once it has passed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;

use super::error::GitError;
use super::interface::Git;
use super::report::FetchSummary;
use crate::auth::DeployKeyPair;
use crate::core::config::Config;
use crate::core::types::{BranchName, Deadline, RemoteUrl};

/// Policy for reaching remotes.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Validate a caller-supplied remote url.
    ///
    /// # Errors
    ///
    /// - [`GitError::UnsupportedRemoteScheme`] for schemes this transport refuses
    /// - [`GitError::InvalidRemote`] for malformed urls
    fn parse_url(&self, url: &str) -> Result<RemoteUrl, GitError>;

    /// Produce credentials when libgit2 asks for them.
    fn credentials(
        &self,
        url: &RemoteUrl,
        keys: Option<&DeployKeyPair>,
        username_from_url: Option<&str>,
        allowed: git2::CredentialType,
    ) -> Result<git2::Cred, git2::Error>;

    /// Whether hosts missing from known_hosts are accepted.
    fn accept_unknown_hosts(&self) -> bool {
        false
    }
}

/// SSH-only transport authenticating with deploy keys.
#[derive(Debug, Clone)]
pub struct SshTransport {
    username: String,
    trust_unknown_hosts: bool,
}

impl SshTransport {
    pub fn new(username: impl Into<String>, trust_unknown_hosts: bool) -> Self {
        Self {
            username: username.into(),
            trust_unknown_hosts,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ssh_username(), config.trust_unknown_hosts())
    }
}

impl Transport for SshTransport {
    fn parse_url(&self, url: &str) -> Result<RemoteUrl, GitError> {
        Ok(RemoteUrl::parse(url)?)
    }

    fn credentials(
        &self,
        url: &RemoteUrl,
        keys: Option<&DeployKeyPair>,
        username_from_url: Option<&str>,
        allowed: git2::CredentialType,
    ) -> Result<git2::Cred, git2::Error> {
        let user = username_from_url
            .or(url.username())
            .unwrap_or(self.username.as_str());

        if allowed.contains(git2::CredentialType::USERNAME) {
            return git2::Cred::username(user);
        }

        if allowed.intersects(git2::CredentialType::SSH_KEY | git2::CredentialType::SSH_MEMORY) {
            let keys = keys.ok_or_else(|| {
                git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Ssh,
                    "remote requires a deploy key but none was supplied",
                )
            })?;
            return git2::Cred::ssh_key_from_memory(
                user,
                keys.public_key(),
                keys.private_key(),
                None,
            );
        }

        Err(git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Ssh,
            "remote asked for an unsupported credential type",
        ))
    }

    fn accept_unknown_hosts(&self) -> bool {
        self.trust_unknown_hosts
    }
}

/// One network call's worth of remote context.
#[derive(Clone, Copy)]
pub struct RemoteSession<'a> {
    pub transport: &'a dyn Transport,
    pub url: &'a RemoteUrl,
    pub keys: Option<&'a DeployKeyPair>,
    pub deadline: Deadline,
}

impl fmt::Debug for RemoteSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("url", &self.url.as_str())
            .field("key", &self.keys.map(DeployKeyPair::fingerprint))
            .finish()
    }
}

impl<'a> RemoteSession<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        url: &'a RemoteUrl,
        keys: Option<&'a DeployKeyPair>,
        deadline: Deadline,
    ) -> Self {
        Self {
            transport,
            url,
            keys,
            deadline,
        }
    }

    /// Callbacks enforcing the deadline, with one key attempt per call.
    fn callbacks<'cb>(&self) -> git2::RemoteCallbacks<'cb>
    where
        'a: 'cb,
    {
        let session = *self;
        let attempts = Cell::new(0u32);

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed| {
            if session.deadline.expired() {
                return Err(git2::Error::new(
                    git2::ErrorCode::User,
                    git2::ErrorClass::Callback,
                    "deadline expired",
                ));
            }
            let key_request = allowed
                .intersects(git2::CredentialType::SSH_KEY | git2::CredentialType::SSH_MEMORY);
            if key_request {
                attempts.set(attempts.get() + 1);
                if attempts.get() > 1 {
                    return Err(git2::Error::new(
                        git2::ErrorCode::Auth,
                        git2::ErrorClass::Ssh,
                        "deploy key was rejected by the remote",
                    ));
                }
            }
            session
                .transport
                .credentials(session.url, session.keys, username_from_url, allowed)
        });

        let deadline = self.deadline;
        callbacks.transfer_progress(move |_| !deadline.expired());
        callbacks.sideband_progress(move |_| !deadline.expired());

        let accept_unknown = self.transport.accept_unknown_hosts();
        callbacks.certificate_check(move |_cert, host| {
            if accept_unknown {
                tracing::debug!(host, "accepting host key without verification");
                Ok(git2::CertificateCheckStatus::CertificateOk)
            } else {
                Ok(git2::CertificateCheckStatus::CertificatePassthrough)
            }
        });
        callbacks
    }

    fn fetch_options<'cb>(&self) -> git2::FetchOptions<'cb>
    where
        'a: 'cb,
    {
        let mut opts = git2::FetchOptions::new();
        opts.remote_callbacks(self.callbacks());
        opts
    }

    fn check_deadline(&self, context: &str) -> Result<(), GitError> {
        if self.deadline.expired() {
            Err(GitError::Timeout(context.to_string()))
        } else {
            Ok(())
        }
    }

    /// Classify a network error, reporting cancellations past the deadline
    /// as timeouts.
    fn classify(&self, err: git2::Error, context: &str) -> GitError {
        if self.deadline.expired() {
            GitError::Timeout(format!("{}: deadline exceeded", context))
        } else {
            GitError::from_git2(err, context)
        }
    }
}

/// Clone the session's remote into `path` with its default branch checked out.
///
/// An empty remote yields a repository with an unborn HEAD.
pub fn clone_into(
    session: &RemoteSession<'_>,
    path: &Path,
    remote_name: &str,
) -> Result<Git, GitError> {
    session.check_deadline("clone")?;

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(session.fetch_options());
    let remote_name = remote_name.to_string();
    builder.remote_create(move |repo, _name, url| repo.remote(&remote_name, url));

    let repo = builder
        .clone(session.url.as_str(), path)
        .map_err(|e| session.classify(e, "clone"))?;
    Ok(Git { repo })
}

/// Ask the remote for its default branch without fetching objects.
///
/// Returns `None` for a remote that advertises no HEAD, which is how an
/// empty remote answers.
pub fn probe(session: &RemoteSession<'_>, git: &Git) -> Result<Option<BranchName>, GitError> {
    session.check_deadline("probe remote")?;

    let mut remote = git
        .repo
        .remote_anonymous(session.url.as_str())
        .map_err(|e| GitError::from_git2(e, "probe remote"))?;
    let connection = remote
        .connect_auth(git2::Direction::Fetch, Some(session.callbacks()), None)
        .map_err(|e| session.classify(e, "probe remote"))?;

    // list() is not usable here: an empty remote hands back a null ref array
    let head = match connection.default_branch() {
        Ok(buf) => buf,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(session.classify(e, "probe remote")),
    };
    Ok(head
        .as_str()
        .and_then(|name| name.strip_prefix("refs/heads/"))
        .and_then(|name| BranchName::new(name).ok()))
}

/// Fetch `refspecs` from the named remote.
///
/// Reports which remote-tracking branches were created or moved.
pub fn fetch(
    session: &RemoteSession<'_>,
    git: &Git,
    remote_name: &str,
    refspecs: &[String],
) -> Result<FetchSummary, GitError> {
    session.check_deadline("fetch")?;

    let before = git.remote_tracking_tips(remote_name)?;
    let mut remote = git
        .repo
        .find_remote(remote_name)
        .map_err(|_| GitError::InvalidRemote(format!("no remote named '{}'", remote_name)))?;

    let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
    let mut opts = session.fetch_options();
    remote
        .fetch(&specs, Some(&mut opts), Some("appgit: fetch"))
        .map_err(|e| session.classify(e, "fetch"))?;
    let received_objects = remote.stats().received_objects();

    let after = git.remote_tracking_tips(remote_name)?;
    let updated = after
        .into_iter()
        .filter(|(branch, oid)| !before.iter().any(|(b, o)| b == branch && o == oid))
        .map(|(branch, _)| branch)
        .collect();

    Ok(FetchSummary {
        updated,
        received_objects,
    })
}

/// Push the local tip of `branch` to the same name on the remote.
///
/// Never forced. On success the remote-tracking ref is moved to the pushed
/// tip and the pushed oid is returned.
///
/// # Errors
///
/// - [`GitError::NonFastForward`] if the remote has commits the local branch lacks
/// - [`GitError::BranchNotFound`] if the branch has no local commits
pub fn push_branch(
    session: &RemoteSession<'_>,
    git: &Git,
    remote_name: &str,
    branch: &BranchName,
) -> Result<String, GitError> {
    session.check_deadline("push")?;

    let tip = git
        .branch_tip(branch)?
        .ok_or_else(|| GitError::BranchNotFound(branch.to_string()))?;
    let mut remote = git
        .repo
        .find_remote(remote_name)
        .map_err(|_| GitError::InvalidRemote(format!("no remote named '{}'", remote_name)))?;

    let rejection: RefCell<Option<String>> = RefCell::new(None);
    let accepted = Cell::new(false);
    let result = {
        let mut callbacks = session.callbacks();
        callbacks.push_update_reference(|_refname, status| {
            match status {
                Some(message) => *rejection.borrow_mut() = Some(message.to_string()),
                None => accepted.set(true),
            }
            Ok(())
        });
        let mut opts = git2::PushOptions::new();
        opts.remote_callbacks(callbacks);

        let refspec = format!("{0}:{0}", branch.ref_name());
        remote.push(&[refspec.as_str()], Some(&mut opts))
    };

    if let Err(e) = result {
        let mut err = session.classify(e, branch.as_str());
        if accepted.get() {
            err = GitError::Transport(format!(
                "{}; the push may already be visible on the remote",
                err
            ));
        }
        return Err(err);
    }

    if let Some(message) = rejection.into_inner() {
        let lower = message.to_ascii_lowercase();
        return Err(
            if ["non-fast-forward", "fetch first", "stale"]
                .iter()
                .any(|m| lower.contains(m))
            {
                GitError::NonFastForward {
                    branch: branch.to_string(),
                }
            } else {
                GitError::Transport(format!("remote rejected {}: {}", branch, message))
            },
        );
    }

    git.set_remote_tracking(remote_name, branch, &tip)?;
    Ok(tip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_transport_rejects_other_schemes() {
        let transport = SshTransport::new("git", false);
        assert!(matches!(
            transport.parse_url("https://example.com/a.git"),
            Err(GitError::UnsupportedRemoteScheme(_))
        ));
        assert!(matches!(
            transport.parse_url("/srv/git/a.git"),
            Err(GitError::UnsupportedRemoteScheme(_))
        ));
        assert!(transport.parse_url("git@example.com:team/a.git").is_ok());
    }

    #[test]
    fn username_credential_prefers_url_user() {
        let transport = SshTransport::new("git", false);
        let url = RemoteUrl::parse("ssh://deploy@example.com/a.git").unwrap();
        let cred = transport
            .credentials(&url, None, None, git2::CredentialType::USERNAME)
            .unwrap();
        assert!(cred.has_username());
    }

    #[test]
    fn key_request_without_keys_is_auth_error() {
        let transport = SshTransport::new("git", false);
        let url = RemoteUrl::parse("git@example.com:a.git").unwrap();
        let Err(err) =
            transport.credentials(&url, None, Some("git"), git2::CredentialType::SSH_KEY)
        else {
            panic!("expected an auth error");
        };
        assert_eq!(err.code(), git2::ErrorCode::Auth);
        assert!(matches!(
            GitError::from_git2(err, "clone"),
            GitError::Authentication(_)
        ));
    }

    #[test]
    fn unknown_host_policy_follows_config() {
        assert!(!SshTransport::new("git", false).accept_unknown_hosts());
        assert!(SshTransport::new("git", true).accept_unknown_hosts());
    }

    #[test]
    fn session_debug_hides_keys() {
        let transport = SshTransport::new("git", false);
        let url = RemoteUrl::parse("git@example.com:a.git").unwrap();
        let session = RemoteSession::new(
            &transport,
            &url,
            None,
            Deadline::after(std::time::Duration::from_secs(5)),
        );
        let debug = format!("{:?}", session);
        assert!(debug.contains("git@example.com:a.git"));
        assert!(!debug.contains("PRIVATE"));
    }
}
