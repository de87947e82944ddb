//! Recursive directory traversal.
//!
//! Every stage that touches a tree (content rendering, asset mirroring, script
//! transpiling) goes through [`walk`], so they all agree on which files exist
//! and how a file's path relates to its root.
//!
//! ## Policy
//!
//! - Only regular files reach the visitor; directories are recursed into.
//! - Entries are visited in file-name order, so two runs over the same tree
//!   produce the same sequence of writes.
//! - Symbolic links are followed. A link loop is an error.
//! - A root that does not exist yields zero files. `static/` is optional.
//! - Any other traversal failure (an unreadable subdirectory, a vanished
//!   entry) is an error. Skipping a subtree would publish a site that is
//!   missing pages without anyone noticing.

use crate::paths::extension_of;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Failed to traverse {path}: {source}")]
    Traverse {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Walk root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Entry {path} is outside walk root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// A regular file discovered under a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as reachable from the current directory (root joined with relative).
    pub path: PathBuf,
    /// Path with the walk root stripped, e.g. `posts/hello.md`.
    pub relative: PathBuf,
}

impl SourceFile {
    /// Extension of the file name including the dot, or `""`.
    pub fn extension(&self) -> String {
        self.relative
            .file_name()
            .map(|name| extension_of(&name.to_string_lossy()).to_string())
            .unwrap_or_default()
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension() == ext
    }

    /// Where this file lands when its tree is mirrored under `dest_root`.
    pub fn mirrored_under(&self, dest_root: &Path) -> PathBuf {
        dest_root.join(&self.relative)
    }
}

/// Invoke `visit` once for every regular file under `root`.
///
/// Returns the number of files visited. The first error, from the traversal
/// or from the visitor, stops the walk and is returned.
pub fn walk<F, E>(root: &Path, mut visit: F) -> Result<usize, E>
where
    F: FnMut(&SourceFile) -> Result<(), E>,
    E: From<WalkError>,
{
    if !root.exists() {
        log::debug!("{} does not exist, nothing to walk", root.display());
        return Ok(0);
    }
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()).into());
    }

    let mut visited = 0;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| WalkError::Traverse {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| WalkError::OutsideRoot {
                path: entry.path().to_path_buf(),
                root: root.to_path_buf(),
            })?
            .to_path_buf();
        let file = SourceFile {
            path: entry.into_path(),
            relative,
        };
        visit(&file)?;
        visited += 1;
    }

    Ok(visited)
}

/// Collect every regular file under `root` before acting on any of them.
///
/// Used by stages that create and delete files inside the tree they walk.
pub fn collect_files(root: &Path) -> Result<Vec<SourceFile>, WalkError> {
    let mut files = Vec::new();
    walk(root, |file| {
        files.push(file.clone());
        Ok::<(), WalkError>(())
    })?;
    Ok(files)
}
