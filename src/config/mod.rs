//! Configuration management for scaffolder
//!
//! Everything environment-dependent is read here, once, and handed to the
//! rest of the crate as a [`Config`]. Components never consult
//! `std::env` themselves.

pub mod schema;

pub use schema::{Config, FileConfig, RegistryConfig, TemplateConfig};

use crate::error::{ScaffoldError, ScaffoldResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Snapshot of the process environment, merged over `~/.env`
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    warnings: Vec<String>,
}

impl Environment {
    /// Capture the process environment.
    ///
    /// Values from `{home}/.env` fill in keys the real environment lacks.
    /// Problems reading that file are collected in
    /// [`Environment::warnings`] for the caller to log.
    pub fn capture(home: Option<&Path>) -> Self {
        let mut vars = HashMap::new();
        let mut warnings = Vec::new();

        if let Some(dotenv_path) = home.map(|h| h.join(".env")) {
            if dotenv_path.is_file() {
                match dotenvy::from_path_iter(&dotenv_path) {
                    Ok(iter) => {
                        for item in iter {
                            match item {
                                Ok((key, value)) => {
                                    vars.insert(key, value);
                                }
                                Err(e) => warnings.push(format!(
                                    "Skipping malformed line in {}: {}",
                                    dotenv_path.display(),
                                    e
                                )),
                            }
                        }
                    }
                    Err(e) => {
                        warnings.push(format!("Failed to read {}: {}", dotenv_path.display(), e))
                    }
                }
            }
        }

        vars.extend(std::env::vars());
        Self { vars, warnings }
    }

    /// Build an environment from explicit pairs (tests, embedding)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            warnings: Vec::new(),
        }
    }

    /// Problems met while reading `~/.env`
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether `LOG_LEVEL=verbose` is set
    pub fn verbose(&self) -> bool {
        self.get("LOG_LEVEL") == Some("verbose")
    }

    /// Look up a non-empty variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Overrides coming from global CLI flags
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--debug`
    pub debug: bool,

    /// `--target-path`
    pub target_path: Option<PathBuf>,
}

/// Configuration manager
pub struct ConfigManager {
    home: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the current user's home directory
    pub fn new() -> ScaffoldResult<Self> {
        let home = dirs::home_dir().ok_or(ScaffoldError::HomeNotFound)?;
        Self::with_home(home)
    }

    /// Create a manager rooted at an explicit home directory
    pub fn with_home(home: PathBuf) -> ScaffoldResult<Self> {
        if !home.is_dir() {
            return Err(ScaffoldError::HomeNotFound);
        }
        Ok(Self { home })
    }

    /// The user home directory
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Resolve the runtime configuration.
    ///
    /// Precedence, highest first: CLI flags, environment, `config.toml`,
    /// built-in defaults.
    pub fn load(&self, env: &Environment, overrides: &CliOverrides) -> ScaffoldResult<Config> {
        let mut config = Config::with_home(&self.home);

        if let Some(cli_home) = env.get("CLI_HOME") {
            config.cli_home = self.home.join(cli_home);
        }

        let file = Self::load_file(&config.config_file())?;
        config.registry = file.registry;
        config.templates = file.templates;

        if let Some(registry) = env.get("CLI_REGISTRY") {
            config.registry.url = registry.to_string();
        }
        if let Some(base_url) = env.get("CLI_BASE_URL") {
            config.templates.base_url = Some(base_url.to_string());
        }

        config.target_path = overrides
            .target_path
            .clone()
            .or_else(|| env.get("CLI_TARGET_PATH").map(PathBuf::from));

        config.verbose = overrides.debug || env.verbose();

        debug!("CLI home: {}", config.cli_home.display());
        if let Some(ref target) = config.target_path {
            debug!("Target path: {}", target.display());
        }

        Ok(config)
    }

    /// Load the optional config file, defaulting when absent
    pub fn load_file(path: &Path) -> ScaffoldResult<FileConfig> {
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(FileConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ScaffoldError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ScaffoldError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
