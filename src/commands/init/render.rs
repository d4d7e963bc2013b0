//! Placeholder rendering for copied template files
//!
//! Supports the two output tags templates use: `<%= key %>` (HTML-escaped)
//! and `<%- key %>` (raw). Keys are top-level fields of the render
//! context; referencing an unknown key fails the file.

use crate::error::{ScaffoldError, ScaffoldResult};
use futures_util::future::try_join_all;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;
use walkdir::WalkDir;

/// Never rendered, whatever the template declares
pub const ALWAYS_IGNORE: &[&str] = &["**/node_modules/**"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<%([=-])\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*%>").expect("tag regex is valid")
});

/// Render the placeholders in `template`
pub fn render_string(template: &str, context: &Map<String, Value>) -> Result<String, String> {
    let mut missing = None;
    let rendered = TAG_RE.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[2];
        let Some(value) = context.get(key) else {
            missing.get_or_insert_with(|| key.to_string());
            return String::new();
        };
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        if &caps[1] == "=" {
            escape_html(&text)
        } else {
            text
        }
    });

    match missing {
        Some(key) => Err(format!("{} is not defined", key)),
        None => Ok(rendered.into_owned()),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Compile the ignore patterns, always including [`ALWAYS_IGNORE`]
pub fn build_ignore_set(patterns: &[String]) -> ScaffoldResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let all = ALWAYS_IGNORE
        .iter()
        .copied()
        .chain(patterns.iter().map(String::as_str));

    for pattern in all {
        let glob = Glob::new(pattern).map_err(|e| {
            ScaffoldError::User(format!("Invalid template ignore pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| ScaffoldError::User(format!("Failed to build ignore patterns: {}", e)))
}

/// Files under `root` that should be rendered, relative paths matched
/// against `ignore`
pub fn collect_files(root: &Path, ignore: &GlobSet) -> ScaffoldResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            ScaffoldError::io(
                format!("walking {}", root.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if ignore.is_match(relative) {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn render_file(path: &Path, context: &Map<String, Value>) -> ScaffoldResult<bool> {
    let bytes = std::fs::read(path)
        .map_err(|e| ScaffoldError::io(format!("reading {}", path.display()), e))?;
    let Ok(content) = String::from_utf8(bytes) else {
        debug!("Skipping binary file {}", path.display());
        return Ok(false);
    };

    let rendered = render_string(&content, context).map_err(|reason| ScaffoldError::Render {
        path: path.to_path_buf(),
        reason,
    })?;
    if rendered != content {
        std::fs::write(path, rendered)
            .map_err(|e| ScaffoldError::io(format!("writing {}", path.display()), e))?;
    }
    Ok(true)
}

/// Render every file under `root` in place, concurrently.
///
/// All-or-nothing: the first failing file fails the whole batch. Returns
/// the number of text files processed.
pub async fn render_tree(
    root: &Path,
    ignore: &[String],
    context: Map<String, Value>,
) -> ScaffoldResult<usize> {
    let ignore = build_ignore_set(ignore)?;
    let files = collect_files(root, &ignore)?;
    debug!("Rendering {} file(s) under {}", files.len(), root.display());

    let context = Arc::new(context);
    let tasks = files.into_iter().map(|path| {
        let context = Arc::clone(&context);
        async move {
            tokio::task::spawn_blocking(move || render_file(&path, &context))
                .await
                .map_err(|e| ScaffoldError::User(format!("Render task failed: {}", e)))?
        }
    });

    let rendered = try_join_all(tasks).await?;
    Ok(rendered.into_iter().filter(|text| *text).count())
}
