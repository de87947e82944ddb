//! Path utilities shared by every pipeline stage.
//!
//! Extension handling is done on strings, not [`Path::extension`], because the
//! rules differ from std in two places that matter for output paths:
//!
//! - only the final path segment is inspected, so `a.b/c` has no extension;
//! - a leading dot counts, so `.nojekyll` has the extension `.nojekyll`.
//!
//! The returned extension always includes its dot (`".md"`, not `"md"`).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Byte offset where the final segment of `path` starts.
fn final_segment_start(path: &str) -> usize {
    path.rfind(|c: char| c == '/' || std::path::is_separator(c))
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Return the extension of the final segment, including the dot.
///
/// ```
/// use grafe::paths::extension_of;
/// assert_eq!(extension_of("a/b/c.tar.gz"), ".gz");
/// assert_eq!(extension_of("a/b/noext"), "");
/// assert_eq!(extension_of("a.b/c"), "");
/// ```
pub fn extension_of(path: &str) -> &str {
    let name = &path[final_segment_start(path)..];
    match name.rfind('.') {
        Some(dot) => &name[dot..],
        None => "",
    }
}

/// Strip the extension returned by [`extension_of`].
pub fn remove_extension(path: &str) -> &str {
    let ext = extension_of(path);
    &path[..path.len() - ext.len()]
}

/// Append `ext` verbatim. The caller supplies the dot.
pub fn add_extension(path: &str, ext: &str) -> String {
    format!("{path}{ext}")
}

/// Replace the final extension of `path` with `new_ext` (or add it if none).
pub fn change_extension(path: &str, new_ext: &str) -> String {
    add_extension(remove_extension(path), new_ext)
}

/// Create every missing directory above `path`.
///
/// Idempotent. Fails if the filesystem refuses, e.g. a regular file sits where
/// a directory is needed.
pub fn ensure_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Byte-copy `source` to `destination`, creating parent directories.
///
/// The destination is created with the default mode; source permissions are
/// not carried over. An existing destination is truncated.
pub fn copy_file(source: &Path, destination: &Path) -> io::Result<u64> {
    ensure_parent_dirs(destination)?;
    let mut reader = File::open(source)?;
    let mut writer = File::create(destination)?;
    io::copy(&mut reader, &mut writer)
}

/// UTF-8 view of a path whose extension is about to be rewritten.
///
/// Extension rewriting works on strings; a non-UTF-8 name is reported rather
/// than lossily converted into a different output path.
pub fn path_str(path: &Path) -> io::Result<&str> {
    path.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", path.display()),
        )
    })
}

/// `path` with its final extension replaced by `new_ext`.
pub fn with_extension(path: &Path, new_ext: &str) -> io::Result<PathBuf> {
    Ok(PathBuf::from(change_extension(path_str(path)?, new_ext)))
}
