//! CLI output formatting for the build and check commands.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Layouts
//!     default.html
//!     post.html
//!
//! Content
//!     4 pages rendered
//!     1 draft skipped
//!     1 file copied
//!
//! Assets
//!     theme/static: 2 files
//!     static: 2 files
//!
//! Scripts
//!     1 script transpiled
//!
//! Built public/
//! ```
//!
//! ## Check
//!
//! ```text
//! Layouts
//!     default.html
//!
//! Content
//!     4 pages OK
//!     1 draft skipped
//!     1 file to copy
//!
//! No problems found
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::{BuildReport, CheckReport};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn layout_lines(layouts: &[String], lines: &mut Vec<String>) {
    lines.push("Layouts".to_string());
    if layouts.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for layout in layouts {
        lines.push(format!("{}{layout}", indent(1)));
    }
    lines.push(String::new());
}

/// `output` shown relative to `root` when it lives under it.
fn display_dir(output: &Path, root: &Path) -> String {
    let shown = output.strip_prefix(root).unwrap_or(output);
    format!("{}/", shown.display())
}

/// Format the summary of a finished build.
pub fn format_build_output(report: &BuildReport, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    layout_lines(&report.layouts, &mut lines);

    lines.push("Content".to_string());
    lines.push(format!(
        "{}{} rendered",
        indent(1),
        count(report.pages, "page", "pages")
    ));
    if report.drafts > 0 {
        lines.push(format!(
            "{}{} skipped",
            indent(1),
            count(report.drafts, "draft", "drafts")
        ));
    }
    lines.push(format!(
        "{}{} copied",
        indent(1),
        count(report.content_files, "file", "files")
    ));
    lines.push(String::new());

    lines.push("Assets".to_string());
    lines.push(format!(
        "{}theme/static: {}",
        indent(1),
        count(report.theme_assets, "file", "files")
    ));
    lines.push(format!(
        "{}static: {}",
        indent(1),
        count(report.static_assets, "file", "files")
    ));
    lines.push(String::new());

    lines.push("Scripts".to_string());
    lines.push(format!(
        "{}{} transpiled",
        indent(1),
        count(report.scripts, "script", "scripts")
    ));
    lines.push(String::new());

    lines.push(format!("Built {}", display_dir(&report.output_dir, root)));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(report: &BuildReport, root: &Path) {
    for line in format_build_output(report, root) {
        println!("{}", line);
    }
}

/// Format the summary of a successful check.
pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();
    layout_lines(&report.layouts, &mut lines);

    lines.push("Content".to_string());
    lines.push(format!(
        "{}{} OK",
        indent(1),
        count(report.pages, "page", "pages")
    ));
    if report.drafts > 0 {
        lines.push(format!(
            "{}{} skipped",
            indent(1),
            count(report.drafts, "draft", "drafts")
        ));
    }
    lines.push(format!(
        "{}{} to copy",
        indent(1),
        count(report.content_files, "file", "files")
    ));
    lines.push(String::new());

    lines.push("No problems found".to_string());
    lines
}

/// Print check output to stdout.
pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn build_report() -> BuildReport {
        BuildReport {
            output_dir: PathBuf::from("/site/public"),
            layouts: vec!["default.html".to_string(), "post.html".to_string()],
            pages: 4,
            drafts: 1,
            content_files: 1,
            theme_assets: 2,
            static_assets: 0,
            scripts: 1,
        }
    }

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(0, "page", "pages"), "0 pages");
        assert_eq!(count(1, "page", "pages"), "1 page");
        assert_eq!(count(2, "page", "pages"), "2 pages");
    }

    #[test]
    fn build_output_full() {
        let lines = format_build_output(&build_report(), Path::new("/site"));
        assert_eq!(
            lines,
            vec![
                "Layouts",
                "    default.html",
                "    post.html",
                "",
                "Content",
                "    4 pages rendered",
                "    1 draft skipped",
                "    1 file copied",
                "",
                "Assets",
                "    theme/static: 2 files",
                "    static: 0 files",
                "",
                "Scripts",
                "    1 script transpiled",
                "",
                "Built public/",
            ]
        );
    }

    #[test]
    fn build_output_hides_zero_drafts() {
        let report = BuildReport {
            drafts: 0,
            ..build_report()
        };
        let lines = format_build_output(&report, Path::new("/site"));
        assert!(!lines.iter().any(|l| l.contains("draft")));
    }

    #[test]
    fn build_output_outside_root_shows_full_path() {
        let lines = format_build_output(&build_report(), Path::new("/elsewhere"));
        assert_eq!(lines.last().unwrap(), "Built /site/public/");
    }

    #[test]
    fn check_output_without_layouts() {
        let report = CheckReport {
            layouts: Vec::new(),
            pages: 0,
            drafts: 0,
            content_files: 2,
        };
        assert_eq!(
            format_check_output(&report),
            vec![
                "Layouts",
                "    (none)",
                "",
                "Content",
                "    0 pages OK",
                "    2 files to copy",
                "",
                "No problems found",
            ]
        );
    }
}
