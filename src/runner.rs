//! Lifecycle for self-contained command implementations
//!
//! A [`CommandRunner`] takes the argument vector a dispatched package
//! receives (`[...args, options]`), checks that the CLI that produced it is
//! recent enough, splits it into positional arguments and options, then
//! drives a [`Command`] through `init` and `exec`.

use crate::dispatch::ExecutionRequest;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::registry::parse_version;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

/// Oldest CLI release whose requests commands understand
pub const MIN_CLI_VERSION: &str = "1.0.0";

/// A command run by [`CommandRunner`]
#[async_trait(?Send)]
pub trait Command {
    /// Command name, used in error messages
    fn name(&self) -> &str;

    /// Consume positional arguments and options
    async fn init(&mut self, _args: &[String], _options: &Map<String, Value>) -> ScaffoldResult<()> {
        Err(ScaffoldError::NotImplemented {
            command: self.name().to_string(),
            method: "init",
        })
    }

    /// Perform the command
    async fn exec(&mut self) -> ScaffoldResult<()> {
        Err(ScaffoldError::NotImplemented {
            command: self.name().to_string(),
            method: "exec",
        })
    }
}

/// Drives a command through validation, init and exec
#[derive(Debug)]
pub struct CommandRunner {
    argv: Vec<Value>,
    cli_version: String,
    args: Vec<String>,
    options: Map<String, Value>,
}

impl CommandRunner {
    /// Create a runner for an argument vector produced by `cli_version`
    pub fn new(argv: Vec<Value>, cli_version: impl Into<String>) -> ScaffoldResult<Self> {
        if argv.is_empty() {
            return Err(ScaffoldError::InvalidArguments(
                "argument list must not be empty".to_string(),
            ));
        }

        Ok(Self {
            argv,
            cli_version: cli_version.into(),
            args: Vec::new(),
            options: Map::new(),
        })
    }

    /// Create a runner for a dispatched request
    pub fn from_request(request: &ExecutionRequest) -> ScaffoldResult<Self> {
        Self::new(request.argv(), request.cli_version.clone())
    }

    /// Fail when the calling CLI is older than [`MIN_CLI_VERSION`]
    pub fn check_runtime_version(&self) -> ScaffoldResult<()> {
        let current = parse_version(&self.cli_version)?;
        let required = parse_version(MIN_CLI_VERSION)?;
        debug!("CLI version {} (minimum {})", current, MIN_CLI_VERSION);

        if current < required {
            return Err(ScaffoldError::RuntimeVersion {
                current: self.cli_version.clone(),
                required: MIN_CLI_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// Split the argument vector into positional arguments and options
    pub fn init_args(&mut self) -> ScaffoldResult<()> {
        let (last, rest) = self
            .argv
            .split_last()
            .ok_or_else(|| ScaffoldError::InvalidArguments("argument list must not be empty".to_string()))?;

        let Value::Object(options) = last else {
            return Err(ScaffoldError::InvalidArguments(format!(
                "last argument must be an options object, got {}",
                last
            )));
        };

        self.options = options.clone();
        self.args = rest
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Ok(())
    }

    /// Positional arguments (after [`CommandRunner::init_args`])
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Options (after [`CommandRunner::init_args`])
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Run the full lifecycle
    pub async fn run(mut self, command: &mut dyn Command) -> ScaffoldResult<()> {
        self.check_runtime_version()?;
        self.init_args()?;
        debug!(
            "Running {} with {} argument(s)",
            command.name(),
            self.args.len()
        );
        command.init(&self.args, &self.options).await?;
        command.exec().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Bare;

    #[async_trait(?Send)]
    impl Command for Bare {
        fn name(&self) -> &str {
            "bare"
        }
    }

    #[derive(Default)]
    struct Recorder {
        args: Vec<String>,
        force: bool,
        executed: bool,
    }

    #[async_trait(?Send)]
    impl Command for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn init(&mut self, args: &[String], options: &Map<String, Value>) -> ScaffoldResult<()> {
            self.args = args.to_vec();
            self.force = options.get("force").and_then(Value::as_bool).unwrap_or(false);
            Ok(())
        }

        async fn exec(&mut self) -> ScaffoldResult<()> {
            self.executed = true;
            Ok(())
        }
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = CommandRunner::new(vec![], "1.0.7").unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidArguments(_)));
    }

    #[test]
    fn old_cli_is_rejected() {
        let runner = CommandRunner::new(vec![json!({})], "0.9.3").unwrap();
        let err = runner.check_runtime_version().unwrap_err();
        assert!(matches!(err, ScaffoldError::RuntimeVersion { .. }));

        let runner = CommandRunner::new(vec![json!({})], "1.0.0").unwrap();
        runner.check_runtime_version().unwrap();
    }

    #[test]
    fn trailing_element_must_be_options() {
        let mut runner = CommandRunner::new(vec![json!("my-app")], "1.0.7").unwrap();
        let err = runner.init_args().unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidArguments(_)));
    }

    #[test]
    fn init_args_splits_argv() {
        let mut runner =
            CommandRunner::new(vec![json!("my-app"), json!({"force": true})], "1.0.7").unwrap();
        runner.init_args().unwrap();

        assert_eq!(runner.args(), ["my-app"]);
        assert_eq!(runner.options().get("force"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn default_init_is_not_implemented() {
        let runner = CommandRunner::new(vec![json!({})], "1.0.7").unwrap();
        let err = runner.run(&mut Bare).await.unwrap_err();

        match err {
            ScaffoldError::NotImplemented { command, method } => {
                assert_eq!(command, "bare");
                assert_eq!(method, "init");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let request = ExecutionRequest::new(
            "init",
            vec!["project-name".to_string()],
            json!({"force": true}).as_object().cloned().unwrap(),
        );
        let runner = CommandRunner::from_request(&request).unwrap();
        let mut command = Recorder::default();

        runner.run(&mut command).await.unwrap();

        assert_eq!(command.args, vec!["project-name"]);
        assert!(command.force);
        assert!(command.executed);
    }
}
