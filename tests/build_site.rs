//! End-to-end builds of the fixture project through the public API.
//!
//! Scripts go through a stand-in transpiler, so no external program is needed.

use grafe::config::SiteConfig;
use grafe::pipeline::{BuildError, Project, build_site, check_site};
use grafe::render::{ContentError, FrontMatterError, RenderError};
use grafe::scripts::{ScriptTranspiler, TranspileError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Strips `: string` annotations, which is all the fixture script needs.
struct StripTypes;

impl ScriptTranspiler for StripTypes {
    fn transpile(&self, source: &str, _path: &Path) -> Result<String, TranspileError> {
        Ok(source.replace(": string", ""))
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) {
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            fs::create_dir_all(&dst_path).unwrap();
            copy_dir_recursive(&src_path, &dst_path);
        } else {
            fs::copy(&src_path, &dst_path).unwrap();
        }
    }
}

fn fixture_project() -> (TempDir, Project) {
    let tmp = TempDir::new().unwrap();
    copy_dir_recursive(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site"),
        tmp.path(),
    );
    let project = Project::new(tmp.path());
    (tmp, project)
}

fn build(project: &Project) -> Result<grafe::pipeline::BuildReport, BuildError> {
    build_site(project, &SiteConfig::default(), &StripTypes)
}

fn read(project: &Project, rel: &str) -> String {
    fs::read_to_string(project.output_dir.join(rel)).unwrap()
}

/// Every output file with its bytes, sorted by path.
fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(dir).unwrap();
            files.push((
                rel.to_string_lossy().replace('\\', "/"),
                fs::read(entry.path()).unwrap(),
            ));
        }
    }
    files
}

#[test]
fn pages_are_rendered_with_their_layouts() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();

    let index = read(&project, "index.html");
    assert!(index.contains("<title>Home</title>"));
    assert!(index.contains("<main>"));
    assert!(index.contains("<footer>Built with grafe</footer>"));
    assert!(index.contains("<a href=\"about.html\">about</a>"));
    assert!(index.contains("<a href=\"posts/hello-world.html\">first post</a>"));
    assert!(index.contains("<table>"));

    let post = read(&project, "posts/hello-world.html");
    assert!(post.contains("<title>Hello, World</title>"));
    assert!(post.contains("<p class=\"byline\">by Ada</p>"));
    assert!(post.contains("<li>intro</li><li>meta</li>"));
    assert!(post.contains("<h2 id=\"euler\"><a class=\"anchor\" href=\"#euler\">#</a> Euler</h2>"));
    assert!(post.contains("<span class=\"math inline\">"));
    assert!(post.contains("<span class=\"math display\">"));
    assert!(post.contains("href=\"index.html#welcome\""));
}

#[test]
fn raw_html_in_body_is_not_escaped() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();

    let notes = read(&project, "posts/notes.html");
    assert!(notes.contains("<abbr title=\"HyperText Markup Language\">HTML</abbr>"));
}

#[test]
fn duplicate_headings_get_distinct_ids() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();

    let about = read(&project, "about.html");
    assert!(about.contains("id=\"contact\""));
    assert!(about.contains("id=\"contact-1\""));
}

#[test]
fn drafts_produce_no_output() {
    let (_tmp, project) = fixture_project();
    let report = build(&project).unwrap();

    assert_eq!(report.drafts, 1);
    assert!(!project.output_dir.join("posts/upcoming.html").exists());
}

#[test]
fn project_static_overrides_theme_static() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();

    assert_eq!(read(&project, "css/site.css"), "body { font-family: sans-serif; }\n");
    assert!(project.output_dir.join("img/logo.svg").is_file());
}

#[test]
fn typescript_becomes_javascript() {
    let (_tmp, project) = fixture_project();
    let report = build(&project).unwrap();

    assert_eq!(report.scripts, 1);
    assert!(!project.output_dir.join("js/app.ts").exists());
    assert_eq!(
        read(&project, "js/app.js"),
        "const greeting = \"hello\";\nconsole.log(greeting);\n"
    );
}

#[test]
fn marker_file_is_empty() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();

    assert_eq!(fs::read(project.marker_path()).unwrap(), b"");
}

#[test]
fn missing_template_halts_the_build() {
    let (_tmp, project) = fixture_project();
    fs::write(
        project.content_dir.join("orphan.md"),
        "---\nTitle: Orphan\nSummary: No layout\nTemplate: landing\n---\n",
    )
    .unwrap();

    let err = build(&project).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("orphan.md"), "{message}");
    assert!(message.contains("landing.html"), "{message}");
    // Stages after content never ran.
    assert!(!project.marker_path().exists());
}

#[test]
fn page_without_template_halts_the_build() {
    let (_tmp, project) = fixture_project();
    fs::write(
        project.content_dir.join("untitled.md"),
        "---\nTitle: Untitled\nSummary: No template key\n---\n\nBody\n",
    )
    .unwrap();

    let err = build(&project).unwrap_err();
    match &err {
        BuildError::Content(ContentError::Page {
            path,
            source:
                RenderError::FrontMatter(FrontMatterError::Missing {
                    field: "Template", ..
                }),
        }) => assert!(path.ends_with("untitled.md"), "{}", path.display()),
        other => panic!("expected missing Template, got {other:?}"),
    }
    assert!(err.to_string().contains("untitled.md"));
    assert!(!project.marker_path().exists());
}

#[test]
fn transpiler_failure_halts_the_build() {
    struct Failing;
    impl ScriptTranspiler for Failing {
        fn transpile(&self, _source: &str, _path: &Path) -> Result<String, TranspileError> {
            Err(TranspileError::Other("unexpected token".to_string()))
        }
    }

    let (_tmp, project) = fixture_project();
    let err = build_site(&project, &SiteConfig::default(), &Failing).unwrap_err();
    assert!(matches!(err, BuildError::Scripts(_)));
    assert!(err.to_string().contains("app.ts"));
}

#[test]
fn building_twice_is_byte_identical() {
    let (_tmp, project) = fixture_project();
    build(&project).unwrap();
    let first = snapshot(&project.output_dir);

    build(&project).unwrap();
    let second = snapshot(&project.output_dir);

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn check_matches_build_counts() {
    let (_tmp, project) = fixture_project();
    let checked = check_site(&project).unwrap();
    let built = build(&project).unwrap();

    assert_eq!(checked.pages, built.pages);
    assert_eq!(checked.drafts, built.drafts);
    assert_eq!(checked.content_files, built.content_files);
    assert_eq!(checked.layouts, built.layouts);
}
