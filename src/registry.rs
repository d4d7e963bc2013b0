//! Package registry client
//!
//! Queries an npm-compatible registry (`GET {registry}/{name}`) for the
//! versions a package publishes and picks the latest overall or the latest
//! caret-compatible one. Lookups are single-attempt with a short timeout.

use crate::config::RegistryConfig;
use crate::error::{ScaffoldError, ScaffoldResult};
use async_trait::async_trait;
use semver::{Comparator, Op, Version, VersionReq};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Abbreviated metadata first, full document as fallback
const ACCEPT_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// Upper bound for a metadata document
const METADATA_LIMIT: u64 = 64 * 1024 * 1024;

/// Registry document for one package
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    /// Published versions keyed by version string
    #[serde(default)]
    pub versions: BTreeMap<String, VersionMetadata>,
}

/// Per-version registry entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Distribution info of a published version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub tarball: Option<String>,
}

impl PackageMetadata {
    /// Version strings as advertised by the registry
    pub fn version_strings(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    /// Tarball URL advertised for a version, if any
    pub fn tarball(&self, version: &str) -> Option<&str> {
        self.versions
            .get(version)
            .and_then(|v| v.dist.as_ref())
            .and_then(|d| d.tarball.as_deref())
    }
}

/// Greatest version by semver ordering. Unparseable entries are skipped.
pub fn max_version<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<Version> {
    versions
        .into_iter()
        .filter_map(|v| Version::parse(v).ok())
        .max()
}

/// Greatest version satisfying `^base`
pub fn max_compatible<'a>(
    base: &Version,
    versions: impl IntoIterator<Item = &'a str>,
) -> Option<Version> {
    let req = caret_requirement(base);
    versions
        .into_iter()
        .filter_map(|v| Version::parse(v).ok())
        .filter(|v| req.matches(v))
        .max()
}

/// Caret requirement anchored at `base`. Build metadata is dropped.
fn caret_requirement(base: &Version) -> VersionReq {
    VersionReq {
        comparators: vec![Comparator {
            op: Op::Caret,
            major: base.major,
            minor: Some(base.minor),
            patch: Some(base.patch),
            pre: base.pre.clone(),
        }],
    }
}

/// Parse a version string, reporting the offending input
pub fn parse_version(version: &str) -> ScaffoldResult<Version> {
    Version::parse(version.trim_start_matches('v')).map_err(|e| ScaffoldError::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}

/// Source of package version metadata
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the registry document for a package
    async fn fetch_metadata(&self, name: &str) -> ScaffoldResult<PackageMetadata>;

    /// Latest published version, or `None` when nothing is published
    async fn latest_version(&self, name: &str) -> ScaffoldResult<Option<Version>> {
        let metadata = self.fetch_metadata(name).await?;
        Ok(max_version(metadata.version_strings()))
    }

    /// Latest version caret-compatible with `base`
    async fn latest_compatible_version(
        &self,
        base: &str,
        name: &str,
    ) -> ScaffoldResult<Option<Version>> {
        let base = parse_version(base)?;
        let metadata = self.fetch_metadata(name).await?;
        Ok(max_compatible(&base, metadata.version_strings()))
    }
}

/// Registry client over HTTP
#[derive(Clone)]
pub struct HttpRegistry {
    base_url: String,
    agent: ureq::Agent,
    download_agent: ureq::Agent,
}

impl HttpRegistry {
    /// Create a client from registry settings
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            agent: build_agent(config.timeout_secs),
            download_agent: build_agent(config.download_timeout_secs),
        }
    }

    /// URL of the registry document for a package
    pub fn metadata_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Conventional tarball location when the registry omits `dist.tarball`
    pub fn default_tarball_url(&self, name: &str, version: &str) -> String {
        let basename = name.rsplit('/').next().unwrap_or(name);
        format!("{}/{}/-/{}-{}.tgz", self.base_url, name, basename, version)
    }

    /// Resolve the tarball URL of an exact version
    pub async fn tarball_url(&self, name: &str, version: &str) -> ScaffoldResult<String> {
        let metadata = self.fetch_metadata(name).await?;
        if !metadata.versions.contains_key(version) {
            return Err(ScaffoldError::install(
                name,
                version,
                "version is not published in the registry",
            ));
        }
        Ok(metadata
            .tarball(version)
            .map(str::to_string)
            .unwrap_or_else(|| self.default_tarball_url(name, version)))
    }

    /// Download a tarball into memory
    pub async fn download(&self, url: &str) -> ScaffoldResult<Vec<u8>> {
        debug!("Downloading {}", url);
        let agent = self.download_agent.clone();
        let target = url.to_string();

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, String> {
            let response = agent.get(&target).call().map_err(|e| e.to_string())?;
            let mut bytes = Vec::new();
            response
                .into_body()
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| e.to_string())?;
            Ok(bytes)
        })
        .await
        .map_err(|e| ScaffoldError::User(format!("Download task failed: {}", e)))?;

        result.map_err(|reason| ScaffoldError::User(format!("Download of {} failed: {}", url, reason)))
    }
}

fn build_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .into()
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn fetch_metadata(&self, name: &str) -> ScaffoldResult<PackageMetadata> {
        if name.is_empty() {
            return Err(ScaffoldError::registry(name, "package name is empty"));
        }

        let url = self.metadata_url(name);
        debug!("Fetching registry metadata: {}", url);
        let agent = self.agent.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<PackageMetadata, String> {
            let mut response = agent
                .get(&url)
                .header("Accept", ACCEPT_METADATA)
                .call()
                .map_err(|e| e.to_string())?;
            response
                .body_mut()
                .with_config()
                .limit(METADATA_LIMIT)
                .read_json::<PackageMetadata>()
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ScaffoldError::registry(name, format!("lookup task failed: {}", e)))?;

        let metadata = result.map_err(|reason| ScaffoldError::registry(name, reason))?;
        debug!("{} publishes {} version(s)", name, metadata.versions.len());
        Ok(metadata)
    }
}
