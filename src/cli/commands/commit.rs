//! commit command

use anyhow::Result;
use serde_json::json;

use super::{optional_branch, suffix};
use crate::cli::args::AppArgs;
use crate::cli::output;
use crate::cli::Context;

pub fn commit(
    ctx: &Context,
    app: &AppArgs,
    branch: Option<&str>,
    message: &str,
    author_name: &str,
    author_email: &str,
) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = optional_branch(branch)?;
    let path = ctx.service.repo_path(&suffix, branch.as_ref())?;
    let oid = ctx
        .service
        .commit_application(&path, message, author_name, author_email)?;

    if ctx.json {
        return output::json(&json!({ "commit": oid }));
    }
    output::print(format!("Committed {}", oid.short(7)), ctx.verbosity);
    Ok(())
}
