use std::process::ExitCode;

use appgit::cli::{self, output};
use appgit::git::GitError;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<GitError>() {
                Some(git_err) => output::error(format!("[{}] {:#}", git_err.kind(), err)),
                None => output::error(format!("{:#}", err)),
            }
            ExitCode::FAILURE
        }
    }
}
