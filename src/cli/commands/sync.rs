//! push, pull, fetch, merge and abort-merge commands

use anyhow::{bail, Result};
use serde_json::json;

use super::{branch_name, load_keys, optional_branch, suffix};
use crate::cli::args::{AppArgs, KeyArgs};
use crate::cli::output;
use crate::cli::Context;
use crate::git::MergeStatus;

pub fn push(ctx: &Context, app: &AppArgs, branch: &str, url: &str, keys: &KeyArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = branch_name(branch)?;
    let keys = load_keys(keys)?;
    let message = ctx.service.push_application(&suffix, url, &keys, &branch)?;

    if ctx.json {
        return output::json(&json!({ "message": message }));
    }
    output::print(message, ctx.verbosity);
    Ok(())
}

pub fn pull(ctx: &Context, app: &AppArgs, branch: &str, url: &str, keys: &KeyArgs) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = branch_name(branch)?;
    let keys = load_keys(keys)?;
    let message = ctx.service.pull_application(&suffix, url, &branch, &keys)?;

    if ctx.json {
        return output::json(&json!({ "message": message }));
    }
    output::print(message, ctx.verbosity);
    Ok(())
}

pub fn fetch(
    ctx: &Context,
    app: &AppArgs,
    branch: Option<&str>,
    url: &str,
    keys: &KeyArgs,
) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = optional_branch(branch)?;
    let keys = load_keys(keys)?;
    let summary = ctx
        .service
        .fetch_application(&suffix, url, branch.as_ref(), &keys)?;

    if ctx.json {
        return output::json(&summary);
    }
    if summary.updated.is_empty() {
        output::print("Everything up to date", ctx.verbosity);
    } else {
        output::print(
            format!("Updated:\n{}", output::format_list(&summary.updated, "  ")),
            ctx.verbosity,
        );
    }
    Ok(())
}

pub fn merge(ctx: &Context, app: &AppArgs, source: &str, destination: &str) -> Result<()> {
    let suffix = suffix(app)?;
    let source = branch_name(source)?;
    let destination = branch_name(destination)?;
    let outcome = ctx.service.merge_branch(&suffix, &source, &destination)?;

    if ctx.json {
        output::json(&outcome)?;
    } else {
        output::print(outcome.status, ctx.verbosity);
        if !outcome.conflicts.is_empty() {
            output::print(
                format!("Conflicts:\n{}", output::format_list(&outcome.conflicts, "  ")),
                ctx.verbosity,
            );
        }
    }

    if outcome.status == MergeStatus::Conflicted {
        bail!(
            "merge of {} into {} left {} conflicted path(s)",
            source,
            destination,
            outcome.conflicts.len()
        );
    }
    Ok(())
}

pub fn abort_merge(ctx: &Context, app: &AppArgs, branch: &str) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = branch_name(branch)?;
    let aborted = ctx.service.abort_merge(&suffix, &branch)?;

    if ctx.json {
        return output::json(&json!({ "aborted": aborted }));
    }
    if aborted {
        output::print("Merge aborted", ctx.verbosity);
    } else {
        output::print("No merge in progress", ctx.verbosity);
    }
    Ok(())
}
