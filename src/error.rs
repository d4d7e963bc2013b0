//! Error types for scaffolder
//!
//! All modules use `ScaffoldResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scaffolder operations
pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

/// All errors that can occur in scaffolder
#[derive(Error, Debug)]
pub enum ScaffoldError {
    // Argument errors
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("scaffolder {current} is too old, at least v{required} is required")]
    RuntimeVersion { current: String, required: String },

    #[error("{method}() must be implemented by the {command} command")]
    NotImplemented {
        command: String,
        method: &'static str,
    },

    // Registry errors
    #[error("Failed to fetch version info for {package}: {reason}")]
    Registry { package: String, reason: String },

    #[error("Package {0} has no published versions")]
    NoVersions(String),

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    // Package cache errors
    #[error("Failed to install {package}@{version}: {reason}")]
    Install {
        package: String,
        version: String,
        reason: String,
    },

    #[error("Failed to update {package}: {reason}")]
    Update { package: String, reason: String },

    #[error("No entry point found for {package} in {path}")]
    EntryNotFound { package: String, path: PathBuf },

    // Dispatch errors
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String, available: Vec<String> },

    #[error("Failed to start {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}, exit code: {code}")]
    CommandFailed { command: String, code: i32 },

    // Template errors
    #[error("Unrecognized template type: {0}")]
    TemplateType(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to render {path}: {reason}")]
    Render { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("User home directory not found")]
    HomeNotFound,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl ScaffoldError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a registry error for a package
    pub fn registry(package: impl Into<String>, reason: impl ToString) -> Self {
        Self::Registry {
            package: package.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an install error for a package version
    pub fn install(
        package: impl Into<String>,
        version: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Install {
            package: package.into(),
            version: version.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a spawn error
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::UnknownCommand { available, .. } if !available.is_empty() => {
                Some(format!("Available commands: {}", available.join(", ")))
            }
            Self::Registry { .. } => {
                Some("Check your network or set CLI_REGISTRY to a reachable registry".to_string())
            }
            Self::EntryNotFound { .. } => {
                Some("The package.json of the package must declare a \"main\" entry".to_string())
            }
            Self::HomeNotFound => Some("Set HOME to an existing directory".to_string()),
            _ => None,
        }
    }
}
