//! Target directory handling for project creation

use crate::error::{ScaffoldError, ScaffoldResult};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Whether `dir` has no entries besides dotfiles and `node_modules`
pub fn is_dir_empty(dir: &Path) -> ScaffoldResult<bool> {
    let entries =
        fs::read_dir(dir).map_err(|e| ScaffoldError::io(format!("reading {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ScaffoldError::io(format!("reading {}", dir.display()), e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with('.') && name != "node_modules" {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Remove everything inside `dir`, keeping the directory itself
pub fn empty_dir(dir: &Path) -> ScaffoldResult<()> {
    let entries =
        fs::read_dir(dir).map_err(|e| ScaffoldError::io(format!("reading {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ScaffoldError::io(format!("reading {}", dir.display()), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| ScaffoldError::io(format!("inspecting {}", path.display()), e))?;
        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| ScaffoldError::io(format!("removing {}", path.display()), e))?;
    }

    debug!("Emptied {}", dir.display());
    Ok(())
}

/// Copy the contents of `src` into `dst`, overwriting files that exist.
///
/// Both directories are created when missing. Returns the number of files
/// copied.
pub fn copy_dir(src: &Path, dst: &Path) -> ScaffoldResult<usize> {
    fs::create_dir_all(src)
        .map_err(|e| ScaffoldError::io(format!("creating directory {}", src.display()), e))?;
    fs::create_dir_all(dst)
        .map_err(|e| ScaffoldError::io(format!("creating directory {}", dst.display()), e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            ScaffoldError::io(
                format!("walking {}", src.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| ScaffoldError::io(format!("creating directory {}", target.display()), e))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| ScaffoldError::io(format!("copying to {}", target.display()), e))?;
            copied += 1;
        }
    }

    debug!("Copied {} file(s) from {} to {}", copied, src.display(), dst.display());
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dotfiles_and_node_modules_do_not_count() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join(".npmrc"), "").unwrap();
        assert!(is_dir_empty(dir.path()).unwrap());

        fs::write(dir.path().join("README.md"), "# hi").unwrap();
        assert!(!is_dir_empty(dir.path()).unwrap());
    }

    #[test]
    fn empty_dir_keeps_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("src/deep/a.txt"), "a").unwrap();
        fs::write(dir.path().join(".env"), "A=1").unwrap();

        empty_dir(dir.path()).unwrap();

        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn copy_dir_merges_into_target() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("src")).unwrap();
        fs::write(src.path().join("package.json"), "{}").unwrap();
        fs::write(src.path().join("src/main.js"), "main").unwrap();
        fs::write(dst.path().join("keep.txt"), "keep").unwrap();
        fs::write(dst.path().join("package.json"), "old").unwrap();

        let copied = copy_dir(src.path(), dst.path()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.path().join("package.json")).unwrap(), "{}");
        assert_eq!(fs::read_to_string(dst.path().join("src/main.js")).unwrap(), "main");
        assert!(dst.path().join("keep.txt").exists());
    }

    #[test]
    fn copy_from_missing_source_creates_it() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("template");
        let dst = root.path().join("out");

        assert_eq!(copy_dir(&src, &dst).unwrap(), 0);
        assert!(src.is_dir());
        assert!(dst.is_dir());
    }
}
