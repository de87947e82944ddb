//! Asset mirroring.
//!
//! Copies a tree into the output root keeping relative paths. The build mirrors
//! `theme/static/` first and `static/` second, so a project file replaces the
//! theme file at the same relative path.

use crate::paths::copy_file;
use crate::walk::{WalkError, walk};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("Failed to copy {source_path} to {dest}: {source}")]
    Copy {
        source_path: PathBuf,
        dest: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copy every regular file under `source_root` to `dest_root/<relative>`.
///
/// Returns the number of files copied. A missing `source_root` copies nothing.
pub fn mirror_tree(source_root: &Path, dest_root: &Path) -> Result<usize, MirrorError> {
    walk(source_root, |file| {
        let dest = file.mirrored_under(dest_root);
        copy_file(&file.path, &dest).map_err(|source| MirrorError::Copy {
            source_path: file.path.clone(),
            dest: dest.clone(),
            source,
        })?;
        log::debug!("mirrored {}", file.relative.display());
        Ok(())
    })
}
