//! Built-in commands
//!
//! Commands compiled into the binary. A dispatched package can hand its
//! request back to the CLI (`scaffolder worker <request-file>`), which runs
//! the matching built-in through [`CommandRunner`].

pub mod init;

pub use init::InitCommand;

use crate::config::Config;
use crate::dispatch::ExecutionRequest;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::runner::{Command, CommandRunner};
use crate::ui::UiContext;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Names of the built-in commands
pub const BUILTIN_COMMANDS: &[&str] = &["init"];

/// Instantiate a built-in command working in `cwd`
pub fn builtin(
    name: &str,
    config: &Config,
    ctx: UiContext,
    cwd: PathBuf,
) -> ScaffoldResult<Box<dyn Command>> {
    match name {
        "init" => Ok(Box::new(InitCommand::new(config, ctx, cwd))),
        other => Err(ScaffoldError::UnknownCommand {
            name: other.to_string(),
            available: BUILTIN_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }),
    }
}

/// Execute the request stored at `request_path`
pub async fn run_worker(request_path: &Path, config: &Config, ctx: UiContext) -> ScaffoldResult<()> {
    let request = ExecutionRequest::from_file(request_path)?;
    debug!(
        "Worker request: {} (CLI {}) with {} argument(s)",
        request.command,
        request.cli_version,
        request.args.len()
    );

    let cwd = std::env::current_dir()
        .map_err(|e| ScaffoldError::io("getting current directory", e))?;
    let mut command = builtin(&request.command, config, ctx, cwd)?;

    CommandRunner::from_request(&request)?
        .run(command.as_mut())
        .await
}
