//! Command dispatch to versioned packages
//!
//! A command name maps to a package pinned at the CLI's own version. The
//! package is brought into the cache (installed when missing, moved to the
//! latest compatible release otherwise), then its entry point runs in a
//! child process that receives an [`ExecutionRequest`] through a temporary
//! JSON file.

use crate::config::Config;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::package::{Installer, Package, PackageSpec, TarballInstaller};
use crate::paths::format_path;
use crate::registry::{HttpRegistry, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Built-in command table: command name to package name
const COMMANDS: &[(&str, &str)] = &[("init", "@scaffolder/init")];

/// Version every dispatched package is pinned to
pub const PINNED_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable carrying the request file path to the child
pub const EXEC_REQUEST_ENV: &str = "CLI_EXEC_REQUEST";

/// Loads a JavaScript entry and calls its export with `[...args, options]`.
/// Receives the entry path and the request file path as trailing argv.
/// Must stay on one line: `cmd.exe` ends a command line at a line feed.
const NODE_BOOTSTRAP: &str = concat!(
    "const [entry, requestFile] = process.argv.slice(-2); ",
    "const request = JSON.parse(require('fs').readFileSync(requestFile, 'utf8')); ",
    "const load = entry.endsWith('.mjs') ",
    "? import(require('url').pathToFileURL(entry).href).then((m) => m.default) ",
    ": Promise.resolve().then(() => require(entry)); ",
    "load.then((main) => main.call(null, [...request.args, request.options]))",
    ".catch((err) => { console.error(err instanceof Error ? err.message : err); process.exitCode = 1; });",
);

/// Verbosity handed down to dispatched children
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Local package directory handed down to dispatched children
pub const TARGET_PATH_ENV: &str = "CLI_TARGET_PATH";

/// Names of the commands that can be dispatched
pub fn available_commands() -> Vec<String> {
    COMMANDS.iter().map(|(name, _)| name.to_string()).collect()
}

/// Dispatch progress, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Resolving,
    CacheChecking,
    Installing,
    Updating,
    Skipped,
    EntryResolving,
    Spawning,
    Completed,
    Failed,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolving => "resolving",
            Self::CacheChecking => "checking cache",
            Self::Installing => "installing",
            Self::Updating => "updating",
            Self::Skipped => "skipped (local package)",
            Self::EntryResolving => "resolving entry",
            Self::Spawning => "spawning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Payload handed to a dispatched entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub command: String,
    pub args: Vec<String>,
    pub options: Map<String, Value>,
    pub cli_version: String,
}

impl ExecutionRequest {
    /// Build a request. Internal option keys (`_`-prefixed and `parent`)
    /// are dropped.
    pub fn new(command: impl Into<String>, args: Vec<String>, options: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            args,
            options: filter_options(options),
            cli_version: PINNED_VERSION.to_string(),
        }
    }

    /// Argument vector as the entry point sees it: positional arguments
    /// followed by the options object
    pub fn argv(&self) -> Vec<Value> {
        self.args
            .iter()
            .cloned()
            .map(Value::String)
            .chain(std::iter::once(Value::Object(self.options.clone())))
            .collect()
    }

    /// Read a request written by [`ExecutionRequest::write_temp`]
    pub fn from_file(path: &Path) -> ScaffoldResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScaffoldError::io(format!("reading request {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the request to a temporary file, removed when dropped
    pub fn write_temp(&self) -> ScaffoldResult<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("scaffolder-request-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| ScaffoldError::io("creating request file", e))?;
        serde_json::to_writer(file.as_file_mut(), self)?;
        file.as_file_mut()
            .flush()
            .map_err(|e| ScaffoldError::io("writing request file", e))?;
        Ok(file)
    }
}

/// Drop option keys that belong to the argument parser rather than the command
pub fn filter_options(options: Map<String, Value>) -> Map<String, Value> {
    options
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_') && key != "parent")
        .collect()
}

/// Program and arguments for a child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    /// Run `program` with `args`; on Windows through `cmd /c`
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        if cfg!(windows) {
            let mut wrapped = vec!["/c".to_string(), program];
            wrapped.extend(args);
            Self::direct("cmd", wrapped)
        } else {
            Self::direct(program, args)
        }
    }

    /// Run `program` with `args` as is, on every platform
    pub fn direct(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// Plan how to run `entry` with the request at `request`.
    ///
    /// `node` is a real executable and skips the `cmd /c` wrapper.
    pub fn plan(entry: &Path, request: &Path) -> Self {
        let entry = format_path(entry);
        let request = format_path(request);

        if is_javascript(&entry) {
            Self::direct(
                "node",
                vec![
                    "-e".to_string(),
                    NODE_BOOTSTRAP.to_string(),
                    "--".to_string(),
                    entry,
                    request,
                ],
            )
        } else {
            Self::new(entry, vec![request])
        }
    }

    /// Run the child in `dir` instead of the current directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an extra environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run with inherited stdio, returning the exit code.
    ///
    /// `request` is exported to the child as `CLI_EXEC_REQUEST`.
    pub async fn run(&self, request: Option<&Path>) -> ScaffoldResult<i32> {
        debug!("Executing: {}", self);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(request) = request {
            command.env(EXEC_REQUEST_ENV, request);
        }
        if let Some(ref dir) = self.current_dir {
            command.current_dir(dir);
        }
        command.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let status = command
            .status()
            .await
            .map_err(|e| ScaffoldError::spawn(self.to_string(), e))?;

        Ok(status.code().unwrap_or(1))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg == NODE_BOOTSTRAP {
                f.write_str(" <bootstrap>")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn is_javascript(entry: &str) -> bool {
    let lower = entry.to_ascii_lowercase();
    [".js", ".cjs", ".mjs"].iter().any(|ext| lower.ends_with(ext))
}

/// Resolves commands to packages and runs them
pub struct Dispatcher<'a> {
    config: &'a Config,
    registry: Arc<dyn Registry>,
    installer: Arc<dyn Installer>,
}

impl<'a> Dispatcher<'a> {
    /// Dispatcher backed by the configured HTTP registry
    pub fn from_config(config: &'a Config) -> Self {
        let registry = Arc::new(HttpRegistry::new(&config.registry));
        let installer = Arc::new(TarballInstaller::new(registry.clone()));
        Self::new(config, registry, installer)
    }

    pub fn new(
        config: &'a Config,
        registry: Arc<dyn Registry>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            config,
            registry,
            installer,
        }
    }

    /// Map a command name to its pinned package
    pub fn resolve(&self, command: &str) -> ScaffoldResult<PackageSpec> {
        COMMANDS
            .iter()
            .find(|(name, _)| *name == command)
            .map(|(_, package)| PackageSpec::new(*package, PINNED_VERSION))
            .ok_or_else(|| ScaffoldError::UnknownCommand {
                name: command.to_string(),
                available: available_commands(),
            })
    }

    /// Store directory for dispatched command packages
    pub fn store_dir(&self) -> PathBuf {
        Config::store_dir(&self.config.dependencies_dir())
    }

    /// Settings the child inherits from this invocation's flags
    pub fn child_env(&self) -> Vec<(&'static str, String)> {
        let mut envs = Vec::new();
        if self.config.verbose {
            envs.push((LOG_LEVEL_ENV, "verbose".to_string()));
        }
        if let Some(ref target) = self.config.target_path {
            envs.push((TARGET_PATH_ENV, format_path(target)));
        }
        envs
    }

    /// Build the package and make sure it is present and current
    pub async fn prepare_package(&self, spec: PackageSpec) -> ScaffoldResult<Package> {
        let registry = self.registry.clone();
        let installer = self.installer.clone();

        let mut package = match self.config.target_path {
            Some(ref target) => {
                debug!("Dispatch stage: {}", DispatchStage::Skipped);
                return Ok(Package::local(spec, target, registry, installer));
            }
            None => Package::cached(spec, self.store_dir(), registry, installer),
        };

        debug!("Dispatch stage: {}", DispatchStage::CacheChecking);
        if package.exists().await? {
            debug!("Dispatch stage: {}", DispatchStage::Updating);
            package.update().await?;
        } else {
            debug!("Dispatch stage: {}", DispatchStage::Installing);
            package.install().await?;
        }

        Ok(package)
    }

    /// Resolve, prepare and run a command. Returns the child's exit code.
    pub async fn dispatch(
        &self,
        command: &str,
        args: Vec<String>,
        options: Map<String, Value>,
    ) -> ScaffoldResult<i32> {
        let result = self.run_stages(command, args, options).await;
        match result {
            Ok(code) => debug!("Dispatch stage: {} (exit code {})", DispatchStage::Completed, code),
            Err(ref e) => debug!("Dispatch stage: {} ({})", DispatchStage::Failed, e),
        }
        result
    }

    async fn run_stages(
        &self,
        command: &str,
        args: Vec<String>,
        options: Map<String, Value>,
    ) -> ScaffoldResult<i32> {
        debug!("Dispatch stage: {} ({})", DispatchStage::Resolving, command);
        let spec = self.resolve(command)?;
        let package = self.prepare_package(spec).await?;

        debug!("Dispatch stage: {}", DispatchStage::EntryResolving);
        let entry = package
            .root_file_path()?
            .filter(|entry| entry.is_file())
            .ok_or_else(|| ScaffoldError::EntryNotFound {
                package: package.spec().to_string(),
                path: package.cache_file_path(),
            })?;
        debug!("Entry point: {}", entry.display());

        let request = ExecutionRequest::new(command, args, options);
        let request_file = request.write_temp()?;
        let mut invocation = Invocation::plan(&entry, request_file.path());
        for (key, value) in self.child_env() {
            invocation = invocation.env(key, value);
        }

        debug!("Dispatch stage: {}", DispatchStage::Spawning);
        invocation.run(Some(request_file.path())).await
    }
}
