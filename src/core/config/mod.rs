//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. The first config file found (see [`schema`])
//! 3. Explicit overrides (`with_root`, CLI flags)
//!
//! Missing config files are not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use appgit::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Repositories live under {}", config.root().display());
//! println!("Remote: {}", config.remote_name());
//! ```

pub mod schema;

pub use schema::{FileConfig, MergeConfig, SshConfig, TimeoutsConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchName;

/// Default name of the repository directory inside an application directory.
pub const DEFAULT_REPO_DIR_NAME: &str = "repo";

/// Branch used for freshly initialized repositories.
pub const DEFAULT_INITIAL_BRANCH: &str = "master";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Effective configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub file: FileConfig,
    /// Path of the file the values came from
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_first(&Self::candidate_paths())
    }

    /// Load configuration from an explicit file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Load the first existing file among `candidates`, or defaults.
    fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Config file locations in search order.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("APPGIT_CONFIG") {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("appgit/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".appgit/config.toml"));
        }
        paths
    }

    /// Override the repository root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file.root = Some(root.into());
        self
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Root of the repository tree.
    ///
    /// Defaults to `<data dir>/appgit`.
    pub fn root(&self) -> PathBuf {
        self.file.root.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("appgit"))
                .unwrap_or_else(|| std::env::temp_dir().join("appgit"))
        })
    }

    pub fn repo_dir_name(&self) -> &str {
        self.file
            .repo_dir_name
            .as_deref()
            .unwrap_or(DEFAULT_REPO_DIR_NAME)
    }

    /// Directory for lock files. Defaults to `<root>/.locks`.
    pub fn lock_dir(&self) -> PathBuf {
        self.file
            .lock_dir
            .clone()
            .unwrap_or_else(|| self.root().join(".locks"))
    }

    pub fn initial_branch(&self) -> BranchName {
        self.file
            .initial_branch
            .as_deref()
            .and_then(|b| BranchName::new(b).ok())
            .unwrap_or_else(|| BranchName::from_static(DEFAULT_INITIAL_BRANCH))
    }

    /// Defaults to "origin".
    pub fn remote_name(&self) -> &str {
        self.file.remote_name.as_deref().unwrap_or("origin")
    }

    /// Defaults to 30 seconds.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(
            self.file
                .timeouts
                .as_ref()
                .and_then(|t| t.lock_secs)
                .unwrap_or(30),
        )
    }

    /// Defaults to 120 seconds.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(
            self.file
                .timeouts
                .as_ref()
                .and_then(|t| t.network_secs)
                .unwrap_or(120),
        )
    }

    /// Defaults to "git".
    pub fn ssh_username(&self) -> &str {
        self.file
            .ssh
            .as_ref()
            .and_then(|s| s.username.as_deref())
            .unwrap_or("git")
    }

    /// Defaults to `false`.
    pub fn trust_unknown_hosts(&self) -> bool {
        self.file
            .ssh
            .as_ref()
            .and_then(|s| s.trust_unknown_hosts)
            .unwrap_or(false)
    }

    /// Name and email recorded on merge commits.
    pub fn merge_identity(&self) -> (&str, &str) {
        let merge = self.file.merge.as_ref();
        (
            merge
                .and_then(|m| m.author_name.as_deref())
                .unwrap_or("appgit"),
            merge
                .and_then(|m| m.author_email.as_deref())
                .unwrap_or("appgit@localhost"),
        )
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_nothing_found() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_first(&[temp.path().join("missing.toml")]).unwrap();

        assert!(config.loaded_from().is_none());
        assert_eq!(config.repo_dir_name(), "repo");
        assert_eq!(config.remote_name(), "origin");
        assert_eq!(config.initial_branch().as_str(), "master");
        assert_eq!(config.lock_timeout(), Duration::from_secs(30));
        assert_eq!(config.network_timeout(), Duration::from_secs(120));
        assert_eq!(config.ssh_username(), "git");
        assert!(!config.trust_unknown_hosts());
        assert_eq!(config.merge_identity(), ("appgit", "appgit@localhost"));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.toml");
        let second = temp.path().join("second.toml");
        fs::write(&second, "remote_name = \"upstream\"").unwrap();

        let config = Config::load_first(&[first, second.clone()]).unwrap();
        assert_eq!(config.remote_name(), "upstream");
        assert_eq!(config.loaded_from(), Some(second.as_path()));
    }

    #[test]
    fn from_path_applies_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            root = "/srv/appgit"
            initial_branch = "main"

            [timeouts]
            lock_secs = 3

            [merge]
            author_name = "merge-bot"
            "#,
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.root(), PathBuf::from("/srv/appgit"));
        assert_eq!(config.lock_dir(), PathBuf::from("/srv/appgit/.locks"));
        assert_eq!(config.initial_branch().as_str(), "main");
        assert_eq!(config.lock_timeout(), Duration::from_secs(3));
        assert_eq!(config.merge_identity(), ("merge-bot", "appgit@localhost"));
    }

    #[test]
    fn invalid_values_rejected_at_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "initial_branch = \"invalid..name\"").unwrap();

        assert!(matches!(
            Config::from_path(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unparseable_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "root = [").unwrap();

        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn with_root_overrides_file() {
        let config = Config::default().with_root("/tmp/override");
        assert_eq!(config.root(), PathBuf::from("/tmp/override"));
        assert_eq!(config.lock_dir(), PathBuf::from("/tmp/override/.locks"));
    }
}
