//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order (first existing file wins):
//! 1. `$APPGIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/appgit/config.toml`
//! 3. `~/.appgit/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad file fails at
//! load time rather than in the middle of a repository operation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Service configuration as stored on disk.
///
/// # Example
///
/// ```toml
/// root = "/var/lib/appgit"
/// repo_dir_name = "repo"
/// initial_branch = "master"
/// remote_name = "origin"
///
/// [timeouts]
/// lock_secs = 30
/// network_secs = 120
///
/// [ssh]
/// username = "git"
/// trust_unknown_hosts = false
///
/// [merge]
/// author_name = "appgit"
/// author_email = "appgit@localhost"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Root of the repository tree
    pub root: Option<PathBuf>,

    /// Name of the repository directory inside each application directory
    pub repo_dir_name: Option<String>,

    /// Branch created by `create_new_repository` and assumed for empty remotes
    pub initial_branch: Option<String>,

    /// Name given to the connected remote
    pub remote_name: Option<String>,

    /// Directory for path lock files (default: `<root>/.locks`)
    pub lock_dir: Option<PathBuf>,

    /// Lock and network timeouts
    pub timeouts: Option<TimeoutsConfig>,

    /// SSH transport settings
    pub ssh: Option<SshConfig>,

    /// Identity used for merge commits
    pub merge: Option<MergeConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.root {
            if !root.is_absolute() {
                return Err(ConfigError::InvalidValue(format!(
                    "root must be an absolute path, got '{}'",
                    root.display()
                )));
            }
        }

        if let Some(name) = &self.repo_dir_name {
            if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue(format!(
                    "repo_dir_name must be a single directory name, got '{}'",
                    name
                )));
            }
        }

        if let Some(branch) = &self.initial_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid initial branch name: {}", e))
            })?;
        }

        if let Some(remote) = &self.remote_name {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote_name cannot be empty".to_string(),
                ));
            }
        }

        if let Some(timeouts) = &self.timeouts {
            timeouts.validate()?;
        }
        if let Some(ssh) = &self.ssh {
            ssh.validate()?;
        }
        if let Some(merge) = &self.merge {
            merge.validate()?;
        }

        Ok(())
    }
}

/// Timeouts applied when the caller supplies no deadline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Longest wait for a path lock
    pub lock_secs: Option<u64>,

    /// Longest duration of one network operation
    pub network_secs: Option<u64>,
}

impl TimeoutsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_secs == Some(0) || self.network_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// SSH transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SshConfig {
    /// Username used when the remote url carries none
    pub username: Option<String>,

    /// Accept host keys missing from known_hosts
    pub trust_unknown_hosts: Option<bool>,
}

impl SshConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(username) = &self.username {
            if username.is_empty() || username.contains(['@', ':']) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid ssh username '{}'",
                    username
                )));
            }
        }
        Ok(())
    }
}

/// Identity recorded on merge commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl MergeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.author_name.as_deref() == Some("") || self.author_email.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue(
                "merge identity cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn relative_root_rejected() {
        let config = FileConfig {
            root: Some(PathBuf::from("relative/root")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn repo_dir_name_must_be_one_component() {
        for bad in ["", "..", "a/b", "a\\b"] {
            let config = FileConfig {
                repo_dir_name: Some(bad.to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn invalid_initial_branch() {
        let config = FileConfig {
            initial_branch: Some("invalid..name".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = FileConfig {
            timeouts: Some(TimeoutsConfig {
                lock_secs: Some(0),
                network_secs: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_ssh_username_rejected() {
        let config = FileConfig {
            ssh: Some(SshConfig {
                username: Some("git@host".to_string()),
                trust_unknown_hosts: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = FileConfig {
            root: Some(PathBuf::from("/srv/appgit")),
            repo_dir_name: Some("repo".to_string()),
            initial_branch: Some("main".to_string()),
            remote_name: Some("origin".to_string()),
            lock_dir: None,
            timeouts: Some(TimeoutsConfig {
                lock_secs: Some(5),
                network_secs: Some(60),
            }),
            ssh: Some(SshConfig {
                username: Some("git".to_string()),
                trust_unknown_hosts: Some(true),
            }),
            merge: Some(MergeConfig {
                author_name: Some("bot".to_string()),
                author_email: Some("bot@example.com".to_string()),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
            root = "/srv"
            unknown_field = true
        "#;

        let result: Result<FileConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
