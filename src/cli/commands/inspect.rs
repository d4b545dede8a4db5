//! status and log commands

use anyhow::Result;

use super::{optional_branch, suffix};
use crate::cli::args::AppArgs;
use crate::cli::output;
use crate::cli::Context;

pub fn status(ctx: &Context, app: &AppArgs, branch: Option<&str>) -> Result<()> {
    let suffix = suffix(app)?;
    let branch = optional_branch(branch)?;
    let path = ctx.service.repo_path(&suffix, branch.as_ref())?;
    let branch = match branch {
        Some(branch) => branch,
        None => ctx.service.default_branch(&suffix)?,
    };
    let report = ctx.service.get_status(&path, &branch)?;

    if ctx.json {
        return output::json(&report);
    }
    if report.is_clean() {
        output::print(format!("On {}: clean", branch), ctx.verbosity);
        return Ok(());
    }
    output::print(format!("On {}:", branch), ctx.verbosity);
    for (path, kind) in report.iter() {
        println!("  {:<10} {}", kind, path);
    }
    Ok(())
}

pub fn log(ctx: &Context, app: &AppArgs, branch: Option<&str>, limit: Option<usize>) -> Result<()> {
    let mut suffix = suffix(app)?;
    if let Some(branch) = optional_branch(branch)? {
        suffix = suffix.with_branch(branch);
    }
    let mut history = ctx.service.get_commit_history(&suffix)?;
    if let Some(limit) = limit {
        history.truncate(limit);
    }

    if ctx.json {
        return output::json(&history);
    }
    for commit in &history {
        println!(
            "{} {} <{}> {}",
            commit.hash.short(7),
            commit.author_name,
            commit.author_email,
            commit.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!("    {}", commit.message.lines().next().unwrap_or_default());
    }
    Ok(())
}
