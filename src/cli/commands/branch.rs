//! branch create, checkout and list commands

use anyhow::Result;
use serde_json::json;

use super::{branch_name, suffix};
use crate::cli::args::AppArgs;
use crate::cli::output;
use crate::cli::Context;

pub fn branch_create(ctx: &Context, app: &AppArgs, name: &str) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = branch_name(name)?;
    ctx.service.create_and_checkout_to_branch(&suffix, &branch)?;
    let path = ctx.service.repo_path(&suffix, Some(&branch))?;

    if ctx.json {
        return output::json(&json!({ "branch": branch, "path": path }));
    }
    output::print(
        format!("Created branch {} at {}", branch, path.display()),
        ctx.verbosity,
    );
    Ok(())
}

pub fn branch_checkout(ctx: &Context, app: &AppArgs, name: &str) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = branch_name(name)?;
    let switched = ctx.service.checkout_to_branch(&suffix, &branch)?;

    if ctx.json {
        return output::json(&json!({ "branch": branch, "switched": switched }));
    }
    if switched {
        output::print(format!("Switched to {}", branch), ctx.verbosity);
    } else {
        output::print(format!("Already on {}", branch), ctx.verbosity);
    }
    Ok(())
}

pub fn branch_list(ctx: &Context, app: &AppArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let branches = ctx.service.get_branches(&suffix)?;

    if ctx.json {
        return output::json(&branches);
    }
    if !branches.is_empty() {
        println!("{}", output::format_list(&branches, ""));
    }
    Ok(())
}
