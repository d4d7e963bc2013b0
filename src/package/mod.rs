//! Versioned package cache
//!
//! A [`Package`] is one registry package pinned at one version. It lives
//! either in a managed store directory (one cache slot per version, see
//! [`crate::paths`]) or in a developer-provided local directory.
//!
//! # Cache model
//!
//! | Question | Answer |
//! |----------|--------|
//! | Is `name@version` installed? | Its slot directory exists |
//! | Where does a new version go? | Its own slot; old slots stay |
//! | Is an existing slot verified? | No, the cache is trusted |

pub mod installer;

pub use installer::{Installer, TarballInstaller};

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::paths::{cache_slot_path, resolve_absolute};
use crate::registry::Registry;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Version placeholder resolved against the registry on first use
pub const LATEST: &str = "latest";

/// A requested package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Whether the version still needs resolving
    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Where a package's files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLocation {
    /// Managed cache: one slot per version under `store_dir`
    Store { store_dir: PathBuf },

    /// Local directory used as-is
    Target { target_path: PathBuf },
}

/// The fields of `package.json` the cache cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageManifest {
    /// Read a `package.json`
    pub fn from_file(path: &Path) -> ScaffoldResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScaffoldError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// One package pinned at one version
pub struct Package {
    spec: PackageSpec,
    location: PackageLocation,
    registry: Arc<dyn Registry>,
    installer: Arc<dyn Installer>,
}

impl Package {
    /// Package kept in the managed cache under `store_dir`
    pub fn cached(
        spec: PackageSpec,
        store_dir: impl Into<PathBuf>,
        registry: Arc<dyn Registry>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            spec,
            location: PackageLocation::Store {
                store_dir: store_dir.into(),
            },
            registry,
            installer,
        }
    }

    /// Package read from a local directory
    pub fn local(
        spec: PackageSpec,
        target_path: impl Into<PathBuf>,
        registry: Arc<dyn Registry>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            spec,
            location: PackageLocation::Target {
                target_path: target_path.into(),
            },
            registry,
            installer,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Current version (may still be `latest` before [`Package::exists`])
    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    pub fn location(&self) -> &PackageLocation {
        &self.location
    }

    /// Slot directory of the current version, or the local directory
    pub fn cache_file_path(&self) -> PathBuf {
        match self.location {
            PackageLocation::Store { ref store_dir } => {
                cache_slot_path(store_dir, &self.spec.name, &self.spec.version)
            }
            PackageLocation::Target { ref target_path } => target_path.clone(),
        }
    }

    /// Create the store directory and pin `latest` to a concrete version
    async fn prepare(&mut self) -> ScaffoldResult<()> {
        if let PackageLocation::Store { ref store_dir } = self.location {
            if !store_dir.exists() {
                debug!("Creating store directory {}", store_dir.display());
                tokio::fs::create_dir_all(store_dir).await.map_err(|e| {
                    ScaffoldError::io(format!("creating directory {}", store_dir.display()), e)
                })?;
            }
        }

        if self.spec.is_latest() {
            let latest = self
                .registry
                .latest_version(&self.spec.name)
                .await?
                .ok_or_else(|| ScaffoldError::NoVersions(self.spec.name.clone()))?;
            debug!("Resolved {}@latest to {}", self.spec.name, latest);
            self.spec.version = latest.to_string();
        }

        Ok(())
    }

    /// Whether the package is present on disk.
    ///
    /// In store mode this also creates the store directory, so a following
    /// [`Package::install`] finds its root ready.
    pub async fn exists(&mut self) -> ScaffoldResult<bool> {
        match self.location {
            PackageLocation::Store { .. } => {
                self.prepare().await?;
                Ok(self.cache_file_path().exists())
            }
            PackageLocation::Target { ref target_path } => Ok(target_path.exists()),
        }
    }

    /// Install the current version into its slot
    pub async fn install(&mut self) -> ScaffoldResult<()> {
        let store_dir = match self.location {
            PackageLocation::Store { ref store_dir } => store_dir.clone(),
            PackageLocation::Target { ref target_path } => {
                debug!("Skipping install for local package at {}", target_path.display());
                return Ok(());
            }
        };

        self.prepare().await?;
        self.installer
            .install(&store_dir, &self.spec.name, &self.spec.version)
            .await
    }

    /// Move to the latest caret-compatible version, installing it if its
    /// slot is missing. Earlier slots are left on disk.
    pub async fn update(&mut self) -> ScaffoldResult<()> {
        let store_dir = match self.location {
            PackageLocation::Store { ref store_dir } => store_dir.clone(),
            PackageLocation::Target { .. } => return Ok(()),
        };

        self.prepare().await?;

        let latest = match self
            .registry
            .latest_compatible_version(&self.spec.version, &self.spec.name)
            .await?
        {
            Some(version) => version.to_string(),
            None => {
                debug!("No compatible version of {} in the registry", self.spec);
                return Ok(());
            }
        };

        let latest_path = cache_slot_path(&store_dir, &self.spec.name, &latest);
        if !latest_path.exists() {
            self.installer
                .install(&store_dir, &self.spec.name, &latest)
                .await
                .map_err(|e| ScaffoldError::Update {
                    package: self.spec.name.clone(),
                    reason: e.to_string(),
                })?;
        }

        if latest != self.spec.version {
            debug!("Updated {} to {}", self.spec, latest);
        }
        self.spec.version = latest;
        Ok(())
    }

    /// Absolute, forward-slash path of the package entry point.
    ///
    /// Looks for the nearest `package.json` at or above the package
    /// directory and resolves its `main` field. `None` when there is no
    /// manifest or it declares no entry.
    pub fn root_file_path(&self) -> ScaffoldResult<Option<PathBuf>> {
        let start = self.cache_file_path();
        let Some(dir) = find_package_dir(&start) else {
            debug!("No package.json at or above {}", start.display());
            return Ok(None);
        };

        let manifest = PackageManifest::from_file(&dir.join("package.json"))?;
        let Some(main) = manifest.main.filter(|m| !m.trim().is_empty()) else {
            return Ok(None);
        };

        let entry = resolve_absolute(&dir.join(main))
            .map_err(|e| ScaffoldError::io(format!("resolving entry of {}", self.spec.name), e))?;
        Ok(Some(entry))
    }
}

/// Nearest directory at or above `start` containing a `package.json`
pub fn find_package_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .map(Path::to_path_buf)
}
