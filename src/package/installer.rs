//! Package installation from registry tarballs
//!
//! A tarball is unpacked into a temporary directory next to the slot and
//! renamed into place, so an interrupted install never leaves a slot that
//! looks complete. Installing a version whose slot already holds a
//! `package.json` is a no-op.

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::paths::cache_slot_path;
use crate::registry::HttpRegistry;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

/// Installs one package version into a store directory
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install `name@version` into its cache slot under `store_dir`.
    ///
    /// Must be idempotent per (name, version).
    async fn install(&self, store_dir: &Path, name: &str, version: &str) -> ScaffoldResult<()>;
}

/// Installer downloading npm-style tarballs from the registry
pub struct TarballInstaller {
    registry: Arc<HttpRegistry>,
}

impl TarballInstaller {
    pub fn new(registry: Arc<HttpRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Installer for TarballInstaller {
    async fn install(&self, store_dir: &Path, name: &str, version: &str) -> ScaffoldResult<()> {
        let slot = cache_slot_path(store_dir, name, version);
        if is_installed(&slot) {
            debug!("{}@{} already installed at {}", name, version, slot.display());
            return Ok(());
        }

        let url = self.registry.tarball_url(name, version).await?;
        info!("Installing {}@{}", name, version);
        let bytes = self
            .registry
            .download(&url)
            .await
            .map_err(|e| ScaffoldError::install(name, version, e))?;

        let store_dir = store_dir.to_path_buf();
        let (pkg, ver) = (name.to_string(), version.to_string());
        let slot = tokio::task::spawn_blocking(move || install_archive(&bytes, &store_dir, &pkg, &ver))
            .await
            .map_err(|e| ScaffoldError::install(name, version, format!("install task failed: {}", e)))??;

        info!("Installed {}@{} ({})", name, version, slot.display());
        Ok(())
    }
}

/// Whether a slot holds an unpacked package
pub fn is_installed(slot: &Path) -> bool {
    slot.join("package.json").is_file()
}

/// Unpack a gzipped package tarball into the slot for `name@version`.
///
/// Returns the slot path.
pub fn install_archive(
    bytes: &[u8],
    store_dir: &Path,
    name: &str,
    version: &str,
) -> ScaffoldResult<PathBuf> {
    let slot = cache_slot_path(store_dir, name, version);
    let fail = |reason: String| ScaffoldError::install(name, version, reason);

    if is_installed(&slot) {
        return Ok(slot);
    }

    // Leftover directory from an earlier partial install: refresh it in place
    if slot.exists() {
        warn!("Completing partial install at {}", slot.display());
        unpack_package(bytes, &slot).map_err(|e| fail(e.to_string()))?;
        return Ok(slot);
    }

    let parent = slot
        .parent()
        .ok_or_else(|| fail(format!("invalid slot path {}", slot.display())))?;
    fs::create_dir_all(parent)
        .map_err(|e| ScaffoldError::io(format!("creating directory {}", parent.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .map_err(|e| ScaffoldError::io(format!("creating staging directory in {}", parent.display()), e))?;
    unpack_package(bytes, staging.path()).map_err(|e| fail(e.to_string()))?;

    if !is_installed(staging.path()) {
        return Err(fail("tarball does not contain a package.json".to_string()));
    }

    let staged = staging.into_path();
    if let Err(e) = fs::rename(&staged, &slot) {
        // Another process may have won the race for the same slot
        fs::remove_dir_all(&staged).ok();
        if !is_installed(&slot) {
            return Err(ScaffoldError::io(format!("moving package into {}", slot.display()), e));
        }
    }

    debug!("Installed {}@{} into {}", name, version, slot.display());
    Ok(slot)
}

/// Extract a package tarball into `dest`, dropping the leading `package/`
/// directory. Only regular files and directories are extracted.
pub fn unpack_package(bytes: &[u8], dest: &Path) -> std::io::Result<()> {
    let mut archive = Archive::new(GzDecoder::new(bytes));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        if !matches!(entry_type, EntryType::Regular | EntryType::Directory) {
            debug!("Skipping {:?} entry in package tarball", entry_type);
            continue;
        }

        let path = entry.path()?.into_owned();
        let relative: PathBuf = path.components().skip(1).collect();
        if relative.as_os_str().is_empty() {
            continue;
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            warn!("Skipping unsafe path in package tarball: {}", path.display());
            continue;
        }

        let target = dest.join(&relative);
        if entry_type == EntryType::Directory {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Installer doubles for tests

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records install calls and writes a minimal package into the slot
    #[derive(Debug, Default)]
    pub struct RecordingInstaller {
        calls: AtomicUsize,
        installed: Mutex<Vec<String>>,
        main: Option<String>,
        entry: Option<String>,
    }

    impl RecordingInstaller {
        pub fn new() -> Self {
            Self::with_main("lib/index.js")
        }

        pub fn with_main(main: &str) -> Self {
            Self {
                main: Some(main.to_string()),
                ..Self::default()
            }
        }

        /// Also write an executable entry file at `main` with `content`
        pub fn with_entry(main: &str, content: &str) -> Self {
            Self {
                entry: Some(content.to_string()),
                ..Self::with_main(main)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn installed(&self) -> Vec<String> {
            self.installed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Installer for RecordingInstaller {
        async fn install(&self, store_dir: &Path, name: &str, version: &str) -> ScaffoldResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.installed
                .lock()
                .unwrap()
                .push(format!("{}@{}", name, version));

            let slot = cache_slot_path(store_dir, name, version);
            fs::create_dir_all(&slot).unwrap();
            let manifest = match self.main {
                Some(ref main) => serde_json::json!({"name": name, "version": version, "main": main}),
                None => serde_json::json!({"name": name, "version": version}),
            };
            fs::write(slot.join("package.json"), manifest.to_string()).unwrap();

            if let (Some(main), Some(content)) = (&self.main, &self.entry) {
                let entry = slot.join(main);
                if let Some(parent) = entry.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&entry, content).unwrap();
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&entry, fs::Permissions::from_mode(0o755)).unwrap();
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn installs_into_slot() {
        let store = TempDir::new().unwrap();
        let bytes = tarball(&[
            ("package/package.json", r#"{"name":"@scaffolder/init","main":"lib/index.js"}"#),
            ("package/lib/index.js", "module.exports = () => {}"),
        ]);

        let slot = install_archive(&bytes, store.path(), "@scaffolder/init", "1.0.7").unwrap();

        assert_eq!(
            slot,
            store.path().join("_@scaffolder_init@1.0.7@@scaffolder/init")
        );
        assert!(slot.join("package.json").is_file());
        assert!(slot.join("lib/index.js").is_file());
    }

    #[test]
    fn reinstall_keeps_existing_files() {
        let store = TempDir::new().unwrap();
        let bytes = tarball(&[("package/package.json", r#"{"name":"tpl"}"#)]);
        let slot = install_archive(&bytes, store.path(), "tpl", "1.0.0").unwrap();
        fs::write(slot.join("marker"), "keep").unwrap();

        install_archive(&bytes, store.path(), "tpl", "1.0.0").unwrap();

        assert_eq!(fs::read_to_string(slot.join("marker")).unwrap(), "keep");
    }

    #[test]
    fn versions_install_side_by_side() {
        let store = TempDir::new().unwrap();
        let bytes = tarball(&[("package/package.json", r#"{"name":"tpl"}"#)]);
        let a = install_archive(&bytes, store.path(), "tpl", "1.0.0").unwrap();
        let b = install_archive(&bytes, store.path(), "tpl", "1.1.0").unwrap();

        assert_ne!(a, b);
        assert!(is_installed(&a));
        assert!(is_installed(&b));
    }

    #[test]
    fn tarball_without_manifest_fails() {
        let store = TempDir::new().unwrap();
        let bytes = tarball(&[("package/README.md", "# no manifest")]);
        let err = install_archive(&bytes, store.path(), "tpl", "1.0.0").unwrap_err();

        assert!(matches!(err, ScaffoldError::Install { .. }));
        assert!(!cache_slot_path(store.path(), "tpl", "1.0.0").exists());
    }

    #[test]
    fn corrupt_tarball_fails() {
        let store = TempDir::new().unwrap();
        let err = install_archive(b"not a tarball", store.path(), "tpl", "1.0.0").unwrap_err();
        assert!(matches!(err, ScaffoldError::Install { .. }));
    }

    #[test]
    fn partial_slot_is_completed() {
        let store = TempDir::new().unwrap();
        let slot = cache_slot_path(store.path(), "tpl", "1.0.0");
        fs::create_dir_all(&slot).unwrap();

        let bytes = tarball(&[("package/package.json", r#"{"name":"tpl"}"#)]);
        install_archive(&bytes, store.path(), "tpl", "1.0.0").unwrap();

        assert!(is_installed(&slot));
    }
}
