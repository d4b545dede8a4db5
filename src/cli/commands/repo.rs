//! init, clone and connect commands

use anyhow::Result;
use serde_json::json;

use super::{load_keys, suffix};
use crate::cli::args::{AppArgs, KeyArgs};
use crate::cli::output;
use crate::cli::Context;

/// Create an empty repository at the application's default path.
pub fn init(ctx: &Context, app: &AppArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let path = ctx.service.repo_path(&suffix, None)?;
    let created = ctx.service.create_new_repository(&path)?;

    if ctx.json {
        return output::json(&json!({ "path": path, "created": created }));
    }
    if created {
        output::print(format!("Initialized repository at {}", path.display()), ctx.verbosity);
    } else {
        output::print(format!("Repository already exists at {}", path.display()), ctx.verbosity);
    }
    Ok(())
}

/// Clone the remote into the application's default path.
pub fn clone(ctx: &Context, app: &AppArgs, url: &str, keys: &KeyArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let keys = load_keys(keys)?;
    let branch = ctx.service.clone_application(&suffix, url, &keys)?;

    if ctx.json {
        return output::json(&json!({ "defaultBranch": branch }));
    }
    output::print(format!("Cloned {} (default branch: {})", url, branch), ctx.verbosity);
    Ok(())
}

/// Connect the application's repository to a remote.
pub fn connect(ctx: &Context, app: &AppArgs, url: &str, keys: &KeyArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let keys = load_keys(keys)?;
    let path = ctx.service.repo_path(&suffix, None)?;
    let branch = ctx.service.connect_application(&path, url, &keys)?;

    if ctx.json {
        return output::json(&json!({ "defaultBranch": branch }));
    }
    output::print(format!("Connected to {} (default branch: {})", url, branch), ctx.verbosity);
    Ok(())
}
