//! Scaffolder - project scaffolding CLI
//!
//! CLI entry point that dispatches to subcommands.

use clap::{CommandFactory, Parser};
use console::style;
use scaffolder::cli::{Cli, Commands};
use scaffolder::commands::run_worker;
use scaffolder::config::{CliOverrides, ConfigManager, Environment};
use scaffolder::dispatch::{available_commands, Dispatcher, PINNED_VERSION};
use scaffolder::error::{ScaffoldError, ScaffoldResult};
use scaffolder::ui::{self, UiContext};
use std::error::Error as _;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            let mut source = e.source();
            while let Some(cause) = source {
                debug!("Caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ScaffoldResult<ExitCode> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new()?;
    let env = Environment::capture(Some(config_manager.home()));

    // Initialize logging: info by default, debug with --debug or LOG_LEVEL=verbose
    let filter = if cli.debug || env.verbose() {
        EnvFilter::new("scaffolder=debug")
    } else {
        EnvFilter::new("scaffolder=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    for warning in env.warnings() {
        warn!("{}", warning);
    }

    let config = config_manager.load(
        &env,
        &CliOverrides {
            debug: cli.debug,
            target_path: cli.target_path.clone(),
        },
    )?;

    debug!("scaffolder {}", PINNED_VERSION);
    check_root();
    ui::init_theme();

    match cli.command {
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| ScaffoldError::io("printing help", e))?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Init(args)) => {
            let code = Dispatcher::from_config(&config)
                .dispatch("init", args.positional(), args.options())
                .await?;
            Ok(exit_code(code))
        }
        Some(Commands::Worker(args)) => {
            run_worker(&args.request, &config, UiContext::detect()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::External(args)) => Err(ScaffoldError::UnknownCommand {
            name: args.first().cloned().unwrap_or_default(),
            available: available_commands(),
        }),
    }
}

/// Map a child exit code onto this process's exit code
fn exit_code(code: i32) -> ExitCode {
    match code {
        0 => ExitCode::SUCCESS,
        code => ExitCode::from(u8::try_from(code).unwrap_or(1)),
    }
}

/// Warn when running as root: cache directories created now would not be
/// writable by the normal user later
#[cfg(unix)]
fn check_root() {
    // SAFETY: geteuid has no preconditions and cannot fail
    if unsafe { libc::geteuid() } == 0 {
        warn!("Running as root; files under the CLI home will be owned by root");
    }
}

#[cfg(not(unix))]
fn check_root() {}
