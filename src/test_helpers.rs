//! Shared test utilities for the grafe test suite.
//!
//! Provides the fixture project and helpers for inspecting a built output
//! tree.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let project = Project::new(tmp.path());
//! build_site(&project, &SiteConfig::default(), &MockTranspiler::default()).unwrap();
//!
//! assert!(output_files(&project.output_dir).contains(&"index.html".to_string()));
//! let html = read_output(&project, "posts/hello-world.html");
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::pipeline::Project;
use crate::walk::collect_files;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Output inspection
// =========================================================================

/// Every file under `dir`, relative, `/`-separated, sorted.
pub fn output_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = collect_files(dir)
        .unwrap()
        .into_iter()
        .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
        .collect();
    files.sort();
    files
}

/// Read a built file as text. Panics with the available files on a miss.
pub fn read_output(project: &Project, rel: &str) -> String {
    fs::read_to_string(project.output_dir.join(rel)).unwrap_or_else(|e| {
        let available = output_files(&project.output_dir);
        panic!("cannot read output '{rel}': {e}. Available: {available:?}")
    })
}
