//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--root <path>`: Repository root, overriding the config file
//! - `--config <path>`: Config file to load instead of the standard locations
//! - `--debug`: Enable debug logging
//! - `--json`: Machine-readable output
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// appgit - Git version control for multi-tenant application workspaces
#[derive(Parser, Debug)]
#[command(name = "appgit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository root (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Load configuration from this file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Give up on locks and network transfers after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// The application a command acts on.
#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// Tenant (organization) id
    #[arg(long)]
    pub tenant: String,

    /// Application id
    #[arg(long)]
    pub app: String,
}

/// Deploy key files. The public key is optional.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Private deploy key file
    #[arg(long, value_name = "FILE")]
    pub private_key: PathBuf,

    /// Public deploy key file
    #[arg(long, value_name = "FILE")]
    pub public_key: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    // ========== Repository lifecycle ==========
    /// Create an empty repository for an application
    #[command(
        name = "init",
        after_help = "\
EXAMPLES:
    appgit init --tenant org-1 --app app-1"
    )]
    Init {
        #[command(flatten)]
        app: AppArgs,
    },

    /// Clone an application's remote into its default path
    #[command(
        name = "clone",
        after_help = "\
EXAMPLES:
    appgit clone --tenant org-1 --app app-1 \\
        --url git@github.com:acme/app.git --private-key ./deploy_key"
    )]
    Clone {
        #[command(flatten)]
        app: AppArgs,

        /// SSH remote url
        #[arg(long)]
        url: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Connect an existing application repository to a remote
    Connect {
        #[command(flatten)]
        app: AppArgs,

        /// SSH remote url
        #[arg(long)]
        url: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    // ========== Branches ==========
    /// Create, check out, or list branches
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    // ========== Synchronization ==========
    /// Push a branch to the remote
    Push {
        #[command(flatten)]
        app: AppArgs,

        /// Branch to push
        #[arg(long)]
        branch: String,

        /// SSH remote url
        #[arg(long)]
        url: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Fetch a branch from the remote and merge it
    Pull {
        #[command(flatten)]
        app: AppArgs,

        /// Branch to pull
        #[arg(long)]
        branch: String,

        /// SSH remote url
        #[arg(long)]
        url: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Update remote-tracking branches without touching the working tree
    Fetch {
        #[command(flatten)]
        app: AppArgs,

        /// Only this branch (default: all branches)
        #[arg(long)]
        branch: Option<String>,

        /// SSH remote url
        #[arg(long)]
        url: String,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Merge one local branch into another
    Merge {
        #[command(flatten)]
        app: AppArgs,

        /// Branch to merge from
        #[arg(long)]
        source: String,

        /// Branch to merge into
        #[arg(long)]
        destination: String,
    },

    /// Discard an unfinished merge
    AbortMerge {
        #[command(flatten)]
        app: AppArgs,

        /// Branch whose merge to abort
        #[arg(long)]
        branch: String,
    },

    // ========== Inspection ==========
    /// Show changed files against a branch tip
    Status {
        #[command(flatten)]
        app: AppArgs,

        /// Branch to compare against (default: the default branch)
        #[arg(long)]
        branch: Option<String>,
    },

    /// Show commit history, newest first
    Log {
        #[command(flatten)]
        app: AppArgs,

        /// Branch (default: the default branch)
        #[arg(long)]
        branch: Option<String>,

        /// Show at most this many commits
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    // ========== Commits ==========
    /// Commit every change in a branch's working tree
    Commit {
        #[command(flatten)]
        app: AppArgs,

        /// Branch whose working tree to commit (default: the default branch)
        #[arg(long)]
        branch: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Author name
        #[arg(long)]
        author_name: String,

        /// Author email
        #[arg(long)]
        author_email: String,
    },
}

/// Branch subcommands.
#[derive(Subcommand, Debug)]
pub enum BranchAction {
    /// Create a branch from the default branch and check it out in its own directory
    Create {
        #[command(flatten)]
        app: AppArgs,

        /// New branch name
        name: String,
    },

    /// Check out a branch, materializing its directory if needed
    Checkout {
        #[command(flatten)]
        app: AppArgs,

        /// Branch name
        name: String,
    },

    /// List local branches, default first
    List {
        #[command(flatten)]
        app: AppArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "appgit", "status", "--tenant", "t", "--app", "a", "--json", "--root", "/data",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.root, Some(PathBuf::from("/data")));
        assert!(matches!(cli.command, Command::Status { branch: None, .. }));
    }

    #[test]
    fn clone_requires_private_key() {
        let result = Cli::try_parse_from([
            "appgit", "clone", "--tenant", "t", "--app", "a", "--url", "git@h:r.git",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn branch_create_takes_positional_name() {
        let cli = Cli::try_parse_from([
            "appgit", "branch", "create", "--tenant", "t", "--app", "a", "feature/x",
        ])
        .unwrap();
        match cli.command {
            Command::Branch {
                action: BranchAction::Create { name, .. },
            } => assert_eq!(name, "feature/x"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
