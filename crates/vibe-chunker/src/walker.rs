//! Source file discovery from glob patterns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use vibe_core::{ComponentKind, ComponentPattern, VibeError};

use crate::path_key;

/// A file matched by one of the configured patterns.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use vibe_chunker::walker::DiscoveredFile;
///
/// let file = DiscoveredFile {
///     path: PathBuf::from("/work/app/src/main.ts"),
///     relative: "src/main.ts".into(),
/// };
/// assert_eq!(file.relative, "src/main.ts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub relative: String,
}

/// Find every file under `root` matching any of `patterns`.
///
/// Paths containing a directory named in `exclude_dirs` are skipped, hidden
/// directories are only entered when a pattern names them, and a file
/// matched by several patterns is returned once, in first-match order.
///
/// # Errors
///
/// Returns [`VibeError::Pattern`] if a pattern is not a valid glob.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vibe_chunker::walker::discover_files;
///
/// let files = discover_files(Path::new("."), &["src/**/*.ts".into()], &["node_modules".into()]).unwrap();
/// for f in &files {
///     println!("{}", f.relative);
/// }
/// ```
pub fn discover_files(
    root: &Path,
    patterns: &[String],
    exclude_dirs: &[String],
) -> Result<Vec<DiscoveredFile>, VibeError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        for file in glob_files(root, pattern, exclude_dirs)? {
            if seen.insert(file.relative.clone()) {
                files.push(file);
            }
        }
    }
    Ok(files)
}

/// Find component files and classify them by the first pattern they match.
///
/// # Errors
///
/// Returns [`VibeError::Pattern`] if a pattern is not a valid glob.
pub fn discover_components(
    root: &Path,
    patterns: &[ComponentPattern],
    exclude_dirs: &[String],
) -> Result<Vec<(DiscoveredFile, ComponentKind)>, VibeError> {
    let mut seen = HashSet::new();
    let mut components = Vec::new();
    for pattern in patterns {
        for file in glob_files(root, &pattern.pattern, exclude_dirs)? {
            if seen.insert(file.relative.clone()) {
                components.push((file, pattern.kind));
            }
        }
    }
    Ok(components)
}

fn glob_files(
    root: &Path,
    pattern: &str,
    exclude_dirs: &[String],
) -> Result<Vec<DiscoveredFile>, VibeError> {
    let full = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches("./")
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob::glob_with(&full, options)
        .map_err(|e| VibeError::Pattern(format!("{pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if is_excluded(relative, exclude_dirs) {
            continue;
        }
        let relative = path_key(relative);
        files.push(DiscoveredFile { path, relative });
    }
    Ok(files)
}

fn is_excluded(relative: &Path, exclude_dirs: &[String]) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        exclude_dirs.iter().any(|ex| *ex == name)
    })
}
