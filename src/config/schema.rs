//! Configuration schema for scaffolder
//!
//! The optional file lives at `~/.scaffolder/config.toml`; environment
//! variables override anything set there.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default CLI home directory name under the user home
pub const DEFAULT_CLI_HOME: &str = ".scaffolder";

/// Cache directory for dispatched command packages
pub const DEPENDENCIES_DIR: &str = "dependences";

/// Cache directory for project templates
pub const TEMPLATE_DIR: &str = "template";

/// Store directory name inside each cache directory
pub const STORE_DIR: &str = "node_modules";

/// Mirror registry used by default
pub const DEFAULT_REGISTRY: &str = "https://registry.npmmirror.com";

/// Settings read from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Package registry settings
    pub registry: RegistryConfig,

    /// Template service settings
    pub templates: TemplateConfig,
}

/// Package registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,

    /// Timeout for metadata lookups, in seconds
    pub timeout_secs: u64,

    /// Timeout for tarball downloads, in seconds
    pub download_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY.to_string(),
            timeout_secs: 5,
            download_timeout_secs: 60,
        }
    }
}

/// Template service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Template service base URL. The built-in template list is used when unset.
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 5,
        }
    }
}

/// Fully resolved runtime configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// User home directory
    pub home: PathBuf,

    /// CLI home (`~/.scaffolder` unless overridden by `CLI_HOME`)
    pub cli_home: PathBuf,

    /// Local package directory that bypasses the cache
    pub target_path: Option<PathBuf>,

    /// Verbose logging requested (`--debug` or `LOG_LEVEL=verbose`)
    pub verbose: bool,

    /// Package registry settings
    pub registry: RegistryConfig,

    /// Template service settings
    pub templates: TemplateConfig,
}

impl Config {
    /// Build a config rooted at `home` with default settings
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let cli_home = home.join(DEFAULT_CLI_HOME);
        Self {
            home,
            cli_home,
            target_path: None,
            verbose: false,
            registry: RegistryConfig::default(),
            templates: TemplateConfig::default(),
        }
    }

    /// Cache root for dispatched command packages
    pub fn dependencies_dir(&self) -> PathBuf {
        self.cli_home.join(DEPENDENCIES_DIR)
    }

    /// Cache root for project templates
    pub fn template_dir(&self) -> PathBuf {
        self.cli_home.join(TEMPLATE_DIR)
    }

    /// Store directory holding the cache slots under a cache root
    pub fn store_dir(root: &Path) -> PathBuf {
        root.join(STORE_DIR)
    }

    /// Path of the optional config file
    pub fn config_file(&self) -> PathBuf {
        self.cli_home.join("config.toml")
    }
}
