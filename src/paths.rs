//! Path helpers shared by the package cache and the dispatcher
//!
//! Cache slots follow the npminstall store layout:
//! `{store_dir}/_{encoded}@{version}@{name}` where `encoded` is the package
//! name with `/` replaced by `_`. For a scoped name the trailing `@{name}`
//! segment nests one directory deeper (`_@scope_init@1.0.7@@scope/init`).

use std::path::{Component, Path, PathBuf};

/// Convert platform separators to forward slashes.
///
/// Paths handed to a child process (or embedded in generated files) stay
/// portable this way. Forward-slash paths are returned unchanged.
pub fn format_path(path: impl AsRef<Path>) -> String {
    let raw = path.as_ref().to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Encode a package name into the prefix used for its cache slots
pub fn encode_package_name(name: &str) -> String {
    name.replace('/', "_")
}

/// Directory segment for one (name, version) pair
pub fn cache_slot_segment(name: &str, version: &str) -> String {
    format!("_{}@{}@{}", encode_package_name(name), version, name)
}

/// Compute the cache slot directory for a package version.
///
/// Distinct (name, version) pairs never map to the same directory: the
/// segment embeds both the raw name and the version.
pub fn cache_slot_path(store_dir: &Path, name: &str, version: &str) -> PathBuf {
    store_dir.join(cache_slot_segment(name, version))
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Absolute, normalized, forward-slash form of a path
pub fn resolve_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    Ok(PathBuf::from(format_path(normalize_lexically(&absolute))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_windows_path() {
        assert_eq!(format_path("C:\\a\\b"), "C:/a/b");
    }

    #[test]
    fn format_forward_slash_is_identity() {
        assert_eq!(format_path("/home/user/.scaffolder"), "/home/user/.scaffolder");
        assert_eq!(format_path("C:/a/b"), "C:/a/b");
    }

    #[test]
    fn scoped_name_encoding() {
        assert_eq!(encode_package_name("@scaffolder/init"), "@scaffolder_init");
        assert_eq!(
            cache_slot_segment("@scaffolder/init", "1.0.7"),
            "_@scaffolder_init@1.0.7@@scaffolder/init"
        );
    }

    #[test]
    fn slot_path_layout() {
        let store = Path::new("/store/node_modules");
        assert_eq!(
            cache_slot_path(store, "template-vue", "1.0.0"),
            PathBuf::from("/store/node_modules/_template-vue@1.0.0@template-vue")
        );
    }

    #[test]
    fn slot_paths_are_distinct_per_version() {
        let store = Path::new("/store");
        let versions = ["1.0.0", "1.0.1", "1.1.0", "2.0.0", "1.0.0-beta.1"];
        for (i, a) in versions.iter().enumerate() {
            for b in versions.iter().skip(i + 1) {
                assert_ne!(
                    cache_slot_path(store, "@scaffolder/init", a),
                    cache_slot_path(store, "@scaffolder/init", b)
                );
            }
        }
    }

    #[test]
    fn lexical_normalization() {
        assert_eq!(
            normalize_lexically(Path::new("/slot/./lib/../bin/index.js")),
            PathBuf::from("/slot/bin/index.js")
        );
    }

    #[test]
    fn resolve_absolute_anchors_relative_paths() {
        let resolved = resolve_absolute(Path::new("demos/./init")).unwrap();
        assert!(resolved.is_absolute());
        assert!(format_path(&resolved).ends_with("demos/init"));
    }

    #[test]
    fn slot_paths_distinguish_names_with_same_encoding() {
        let store = Path::new("/store");
        assert_ne!(
            cache_slot_path(store, "a/b", "1.0.0"),
            cache_slot_path(store, "a_b", "1.0.0")
        );
    }
}
