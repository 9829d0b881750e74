use super::types::SpecDocument;
use crate::error::LoadError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const SPEC_EXTENSION: &str = "json";

/// Find every spec file under `root`, sorted by path relative to `root`.
///
/// A `root` that is itself a file is returned as the only entry, whatever its
/// extension, so a single document can be checked from the command line.
///
/// # Errors
///
/// Returns a [`LoadError`] if `root` does not exist, or for the first entry
/// under it that cannot be read while walking, such as a dangling `.json`
/// symlink or an unreadable directory.
pub fn discover_specs(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    walk_specs(root)?.into_iter().collect()
}

/// Walk `root` and keep unreadable entries as per-entry errors.
///
/// Walk errors are kept when they concern a spec file or a directory that may
/// hold spec files; anything else the walk cannot read is ignored like any
/// other non-spec file.
fn walk_specs(root: &Path) -> Result<Vec<Result<PathBuf, LoadError>>, LoadError> {
    if root.is_file() {
        return Ok(vec![Ok(root.to_path_buf())]);
    }
    if !root.is_dir() {
        return Err(LoadError::new(root, "spec root does not exist"));
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_spec_path(entry.path()) {
                    found.push(Ok(entry.path().to_path_buf()));
                }
            }
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                if path == root {
                    return Err(LoadError::new(root, err.to_string()));
                }
                if is_spec_path(&path) || path.is_dir() || err.loop_ancestor().is_some() {
                    warn!(path = %path.display(), error = %err, "cannot read entry under spec root");
                    found.push(Err(LoadError::new(path, err.to_string())));
                }
            }
        }
    }

    found.sort_by(|a, b| relative_to(root, entry_path(a)).cmp(&relative_to(root, entry_path(b))));
    debug!(root = %root.display(), count = found.len(), "discovered spec files");
    Ok(found)
}

fn is_spec_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == SPEC_EXTENSION)
        .unwrap_or(false)
}

fn entry_path(entry: &Result<PathBuf, LoadError>) -> &Path {
    match entry {
        Ok(path) => path,
        Err(err) => &err.path,
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// Read and parse one spec file.
///
/// `root` is only used to compute [`SpecDocument::relative_path`].
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be read, is not valid JSON, or its
/// root is not a JSON object.
pub fn load_spec(path: &Path, root: &Path) -> Result<SpecDocument, LoadError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))?;
    let raw: Value = serde_json::from_str(&content)
        .map_err(|e| LoadError::new(path, format!("malformed JSON: {e}")))?;
    SpecDocument::from_value(path, relative_to(root, path), raw)
}

/// Load every spec under `root`, stopping at the first malformed file.
///
/// This is the router-construction policy: a broken spec cannot yield a usable
/// route, so there is no point in loading its siblings.
///
/// # Errors
///
/// Returns the first [`LoadError`] encountered.
pub fn load_specs(root: &Path) -> Result<Vec<SpecDocument>, LoadError> {
    let docs = discover_specs(root)?
        .iter()
        .map(|path| load_spec(path, root))
        .collect::<Result<Vec<_>, _>>()?;
    info!(root = %root.display(), documents = docs.len(), "loaded spec documents");
    Ok(docs)
}

/// Load every spec under `root`, keeping per-file failures in place.
///
/// Entries stay in discovery order, so a report built from the result lists
/// files in the same order as [`load_specs`] would.
///
/// An entry the walk cannot read (a dangling symlink, an unreadable
/// directory) is kept as a failed entry like a malformed file.
///
/// # Errors
///
/// Only fails if `root` does not exist or cannot be read itself.
pub fn load_specs_lenient(root: &Path) -> Result<Vec<Result<SpecDocument, LoadError>>, LoadError> {
    let entries: Vec<_> = walk_specs(root)?
        .into_iter()
        .map(|entry| {
            let loaded = entry.and_then(|path| load_spec(&path, root));
            if let Err(err) = &loaded {
                warn!(error = %err, "skipping malformed spec");
            }
            loaded
        })
        .collect();
    Ok(entries)
}
