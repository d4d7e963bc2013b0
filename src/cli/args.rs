//! CLI argument definitions using clap derive

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Scaffolder - project scaffolding from versioned templates
///
/// Commands are delivered as registry packages pinned to this release and
/// cached under ~/.scaffolder.
#[derive(Parser, Debug)]
#[command(name = "scaffolder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Run the command package from a local directory instead of the cache
    #[arg(long = "target-path", visible_alias = "targetPath", global = true, value_name = "PATH")]
    pub target_path: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project from a template
    Init(InitArgs),

    /// Run a built-in command from a request file
    #[command(hide = true)]
    Worker(WorkerArgs),

    /// Anything else is reported as an unknown command
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the project to create
    #[arg(value_name = "PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Continue even if the current directory is not empty
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    /// Positional arguments forwarded to the command package
    pub fn positional(&self) -> Vec<String> {
        self.project_name.iter().cloned().collect()
    }

    /// Options forwarded to the command package
    pub fn options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("force".to_string(), Value::Bool(self.force));
        options
    }
}

/// Arguments for the worker command
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Path of the JSON request written by the dispatcher
    #[arg(value_name = "REQUEST_FILE")]
    pub request: PathBuf,
}
