//! Monitored-folder scan.
//!
//! Recursively walks the monitored root and returns every regular file.
//! Directories found empty are pruned as a side effect — files deleted
//! after a committed upload leave their parents behind, and the next
//! scan sweeps them up. The monitored root itself is never removed.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Walks `root` and returns the absolute paths of all regular files.
pub(crate) fn scan_folder(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk(&path, files)?;
            remove_if_empty(&path);
        } else if metadata.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn remove_if_empty(dir: &Path) {
    let is_empty = match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            debug!(dir = %dir.display(), "failed to re-read directory: {e}");
            return;
        }
    };

    if is_empty {
        match std::fs::remove_dir(dir) {
            Ok(()) => debug!(dir = %dir.display(), "pruned empty directory"),
            Err(e) => debug!(dir = %dir.display(), "failed to prune directory: {e}"),
        }
    }
}

/// Computes the wire name for `path`: the root prefix stripped and
/// separators normalized to `/`.
pub(crate) fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
