//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments into domain types
//! 2. Calls the [`RepoService`](crate::service::RepoService)
//! 3. Formats and displays output
//!
//! Handlers do NOT touch repositories directly.

mod branch;
mod commit;
mod inspect;
mod repo;
mod sync;

pub use branch::{branch_checkout, branch_create, branch_list};
pub use commit::commit;
pub use inspect::{log, status};
pub use repo::{clone, connect, init};
pub use sync::{abort_merge, fetch, merge, pull, push};

use anyhow::{Context as _, Result};

use super::args::{AppArgs, BranchAction, Command, KeyArgs};
use super::Context;
use crate::auth::DeployKeyPair;
use crate::core::types::{BranchName, RepoSuffix};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Repository lifecycle
        Command::Init { app } => repo::init(ctx, &app),
        Command::Clone { app, url, keys } => repo::clone(ctx, &app, &url, &keys),
        Command::Connect { app, url, keys } => repo::connect(ctx, &app, &url, &keys),

        // Branches
        Command::Branch { action } => match action {
            BranchAction::Create { app, name } => branch::branch_create(ctx, &app, &name),
            BranchAction::Checkout { app, name } => branch::branch_checkout(ctx, &app, &name),
            BranchAction::List { app } => branch::branch_list(ctx, &app),
        },

        // Synchronization
        Command::Push {
            app,
            branch,
            url,
            keys,
        } => sync::push(ctx, &app, &branch, &url, &keys),
        Command::Pull {
            app,
            branch,
            url,
            keys,
        } => sync::pull(ctx, &app, &branch, &url, &keys),
        Command::Fetch {
            app,
            branch,
            url,
            keys,
        } => sync::fetch(ctx, &app, branch.as_deref(), &url, &keys),
        Command::Merge {
            app,
            source,
            destination,
        } => sync::merge(ctx, &app, &source, &destination),
        Command::AbortMerge { app, branch } => sync::abort_merge(ctx, &app, &branch),

        // Inspection
        Command::Status { app, branch } => inspect::status(ctx, &app, branch.as_deref()),
        Command::Log { app, branch, limit } => inspect::log(ctx, &app, branch.as_deref(), limit),

        // Commits
        Command::Commit {
            app,
            branch,
            message,
            author_name,
            author_email,
        } => commit::commit(
            ctx,
            &app,
            branch.as_deref(),
            &message,
            &author_name,
            &author_email,
        ),
    }
}

// =============================================================================
// Argument conversion
// =============================================================================

fn suffix(app: &AppArgs) -> Result<RepoSuffix> {
    RepoSuffix::new(app.tenant.as_str(), app.app.as_str()).context("invalid application")
}

fn branch_name(name: &str) -> Result<BranchName> {
    BranchName::new(name).with_context(|| format!("invalid branch name '{}'", name))
}

fn optional_branch(name: Option<&str>) -> Result<Option<BranchName>> {
    name.map(branch_name).transpose()
}

/// Read the deploy key files. Errors name the file, never its contents.
fn load_keys(keys: &KeyArgs) -> Result<DeployKeyPair> {
    match &keys.public_key {
        Some(public) => Ok(DeployKeyPair::from_files(public, &keys.private_key)?),
        None => {
            let mut private = std::fs::read_to_string(&keys.private_key).with_context(|| {
                format!("failed to read private key {}", keys.private_key.display())
            })?;
            let pair = DeployKeyPair::new("", private.as_str());
            zeroize::Zeroize::zeroize(&mut private);
            Ok(pair?)
        }
    }
}
