//! Build orchestration.
//!
//! A build is a fixed sequence of stages over a fixed project layout:
//!
//! ```text
//! 1. Clean      rm -rf public/
//! 2. Load       theme/templates/{layouts,includes}  →  TemplateSet
//! 3. Content    content/**       →  public/  (.md rendered, rest copied)
//! 4. Theme      theme/static/**  →  public/
//! 5. Static     static/**        →  public/  (overrides theme files)
//! 6. Scripts    public/**/*.ts   →  public/**/*.js
//! 7. Marker     public/.nojekyll
//! ```
//!
//! Every build starts from an empty `public/`, so the output never depends on
//! a previous run. The first failing stage stops the build and its error is
//! returned; nothing in here exits the process.

use crate::config::SiteConfig;
use crate::markdown::MarkdownConverter;
use crate::mirror::{MirrorError, mirror_tree};
use crate::render::{ContentError, check_content_tree, render_content_tree};
use crate::scripts::{ScriptError, ScriptTranspiler, transpile_scripts};
use crate::templates::{TemplateError, TemplateSet, load_templates};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Empty file written at the output root. Tells GitHub Pages not to run Jekyll.
pub const MARKER_FILE: &str = ".nojekyll";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to clean {path}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to load templates: {0}")]
    Templates(#[from] TemplateError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Failed to mirror {root}: {source}")]
    Mirror {
        root: PathBuf,
        #[source]
        source: MirrorError,
    },
    #[error("Script error: {0}")]
    Scripts(#[from] ScriptError),
    #[error("Failed to create {path}: {source}")]
    Marker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The fixed input and output locations of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub theme_static_dir: PathBuf,
    pub static_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            content_dir: root.join("content"),
            templates_dir: root.join("theme/templates"),
            theme_static_dir: root.join("theme/static"),
            static_dir: root.join("static"),
            output_dir: root.join("public"),
            root,
        }
    }

    pub fn marker_path(&self) -> PathBuf {
        self.output_dir.join(MARKER_FILE)
    }
}

/// What a build produced, stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub layouts: Vec<String>,
    pub pages: usize,
    pub drafts: usize,
    pub content_files: usize,
    pub theme_assets: usize,
    pub static_assets: usize,
    pub scripts: usize,
}

/// What a check found. Nothing is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub layouts: Vec<String>,
    pub pages: usize,
    pub drafts: usize,
    pub content_files: usize,
}

fn layout_names(templates: &TemplateSet) -> Vec<String> {
    templates.names().map(str::to_string).collect()
}

/// Run a full build of `project` into its output directory.
pub fn build_site(
    project: &Project,
    config: &SiteConfig,
    transpiler: &dyn ScriptTranspiler,
) -> Result<BuildReport, BuildError> {
    let output = &project.output_dir;

    log::info!("cleaning {}", output.display());
    clean_output(output)?;

    log::info!("loading templates from {}", project.templates_dir.display());
    let templates = load_templates(&project.templates_dir)?;
    let converter = MarkdownConverter::new();

    log::info!("rendering {}", project.content_dir.display());
    let content = render_content_tree(&project.content_dir, output, &templates, &converter)?;

    log::info!("mirroring theme assets");
    let theme_assets = mirror(&project.theme_static_dir, output)?;
    log::info!("mirroring project assets");
    let static_assets = mirror(&project.static_dir, output)?;

    log::info!("transpiling {} files", config.scripts.source_extension);
    let scripts = transpile_scripts(output, transpiler, &config.scripts)?;

    let marker = project.marker_path();
    // The output dir may not exist yet if nothing else was written.
    fs::create_dir_all(output)
        .and_then(|_| fs::write(&marker, b""))
        .map_err(|source| BuildError::Marker {
            path: marker.clone(),
            source,
        })?;

    Ok(BuildReport {
        output_dir: output.clone(),
        layouts: layout_names(&templates),
        pages: content.pages,
        drafts: content.drafts,
        content_files: content.copied,
        theme_assets,
        static_assets,
        scripts,
    })
}

/// Load templates and render every page in memory.
///
/// Catches everything a build would catch in the content stage (bad front
/// matter, missing layouts, template errors, output collisions) without
/// touching `public/`.
pub fn check_site(project: &Project) -> Result<CheckReport, BuildError> {
    let templates = load_templates(&project.templates_dir)?;
    let content = check_content_tree(
        &project.content_dir,
        &templates,
        &MarkdownConverter::new(),
    )?;
    Ok(CheckReport {
        layouts: layout_names(&templates),
        pages: content.pages,
        drafts: content.drafts,
        content_files: content.copied,
    })
}

fn clean_output(output: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(output) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Clean {
            path: output.to_path_buf(),
            source,
        }),
    }
}

fn mirror(root: &Path, output: &Path) -> Result<usize, BuildError> {
    mirror_tree(root, output).map_err(|source| BuildError::Mirror {
        root: root.to_path_buf(),
        source,
    })
}
