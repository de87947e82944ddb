//! Content rendering.
//!
//! Turns one markdown content file into one HTML page, and drives that over the
//! whole `content/` tree.
//!
//! ## Front Matter
//!
//! ```yaml
//! ---
//! Title: Getting Started      # required string
//! Summary: First steps       # required string
//! Template: default          # required string, resolves to layouts/default.html
//! Draft: false               # optional bool; true skips the page entirely
//! Params:                    # optional mapping, handed to the layout as-is
//!   tags: [intro]
//! ---
//! ```
//!
//! No value is coerced: `Title: 2024` is a number and is rejected, `Draft: yes`
//! is a string and is rejected.
//!
//! ## Template Context
//!
//! Layouts see exactly four names:
//!
//! | Name | Value |
//! |------|-------|
//! | `Title` | front matter `Title` (escaped) |
//! | `Summary` | front matter `Summary` (escaped) |
//! | `Body` | converted markdown (inserted verbatim) |
//! | `PageParams` | front matter `Params`, empty map when absent |
//!
//! ## Output Paths
//!
//! `content/<rel>.md` renders to `public/<rel>.html`. Every other content file is
//! copied to `public/<rel>` unchanged. Two sources that map to the same output
//! path abort the build instead of silently overwriting each other. Drafts
//! produce nothing, so they claim no path.

use crate::markdown::{ContentConverter, ConvertError, value_kind};
use crate::paths::{copy_file, ensure_parent_dirs, with_extension};
use crate::templates::{TemplateError, TemplateSet};
use crate::walk::{WalkError, walk};
use minijinja::{Value, context};
use serde_yaml::Mapping;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of content files that are rendered rather than copied.
pub const MARKDOWN_EXTENSION: &str = ".md";
/// Extension given to rendered pages and appended to `Template` values.
pub const HTML_EXTENSION: &str = ".html";

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("front matter field {field} is missing (expected a {expected})")]
    Missing {
        field: &'static str,
        expected: &'static str,
    },
    #[error("front matter field {field} must be a {expected}, found {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Markdown conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("Invalid {0}")]
    FrontMatter(#[from] FrontMatterError),
    #[error("The template {0} does not exist")]
    MissingTemplate(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("{path}: {source}")]
    Page {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{first} and {second} both produce {output}")]
    OutputCollision {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Typed view of a page's front matter.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: String,
    pub summary: String,
    /// Logical layout name, without extension.
    pub template: String,
    pub draft: bool,
    pub params: Mapping,
}

impl PageMetadata {
    /// Validate and extract every field. No value is coerced.
    pub fn from_front_matter(front_matter: &Mapping) -> Result<Self, FrontMatterError> {
        Ok(Self {
            title: required_string(front_matter, "Title")?,
            summary: required_string(front_matter, "Summary")?,
            template: required_string(front_matter, "Template")?,
            draft: is_draft(front_matter)?,
            params: params(front_matter)?,
        })
    }

    /// File name of the layout this page selects, e.g. `default.html`.
    pub fn template_file(&self) -> String {
        format!("{}{HTML_EXTENSION}", self.template)
    }
}

/// `Draft` flag. Absent means not a draft; anything but a boolean is an error.
pub fn is_draft(front_matter: &Mapping) -> Result<bool, FrontMatterError> {
    match front_matter.get("Draft") {
        None => Ok(false),
        Some(serde_yaml::Value::Bool(draft)) => Ok(*draft),
        Some(other) => Err(FrontMatterError::WrongType {
            field: "Draft",
            expected: "boolean",
            found: value_kind(other),
        }),
    }
}

fn required_string(front_matter: &Mapping, field: &'static str) -> Result<String, FrontMatterError> {
    match front_matter.get(field) {
        None => Err(FrontMatterError::Missing {
            field,
            expected: "string",
        }),
        Some(serde_yaml::Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(FrontMatterError::WrongType {
            field,
            expected: "string",
            found: value_kind(other),
        }),
    }
}

fn params(front_matter: &Mapping) -> Result<Mapping, FrontMatterError> {
    match front_matter.get("Params") {
        None | Some(serde_yaml::Value::Null) => Ok(Mapping::new()),
        Some(serde_yaml::Value::Mapping(params)) => Ok(params.clone()),
        Some(other) => Err(FrontMatterError::WrongType {
            field: "Params",
            expected: "mapping",
            found: value_kind(other),
        }),
    }
}

/// The values a layout is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub params: Mapping,
}

impl RenderedPage {
    pub fn new(metadata: PageMetadata, body: String) -> Self {
        Self {
            title: metadata.title,
            summary: metadata.summary,
            body,
            params: metadata.params,
        }
    }

    /// Root template context. `Body` is marked safe so autoescape leaves it alone.
    pub fn to_context(&self) -> Value {
        context! {
            Title => &self.title,
            Summary => &self.summary,
            Body => Value::from_safe_string(self.body.clone()),
            PageParams => Value::from_serialize(&self.params),
        }
    }
}

/// Whether a rendered file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Written,
    Draft,
}

/// Convert, check the draft flag, validate, and resolve the layout.
///
/// `None` means the page is a draft. Validation is skipped for drafts, so an
/// unfinished page does not need complete front matter.
fn prepare(
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
    source: &str,
) -> Result<Option<(String, RenderedPage)>, RenderError> {
    let converted = converter.convert(source)?;
    if is_draft(&converted.metadata)? {
        return Ok(None);
    }
    let metadata = PageMetadata::from_front_matter(&converted.metadata)?;
    let template = metadata.template_file();
    if !templates.contains(&template) {
        return Err(RenderError::MissingTemplate(template));
    }
    Ok(Some((template, RenderedPage::new(metadata, converted.html))))
}

/// Render `source` to an HTML string. `None` for drafts.
pub fn render_page(
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
    source: &str,
) -> Result<Option<String>, RenderError> {
    match prepare(templates, converter, source)? {
        Some((template, page)) => Ok(Some(templates.render(&template, page.to_context())?)),
        None => Ok(None),
    }
}

/// Render `source` and write the page to `output_path`.
///
/// Drafts write nothing, not even parent directories.
pub fn render_content_file(
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
    source: &str,
    output_path: &Path,
) -> Result<RenderOutcome, RenderError> {
    let Some((template, page)) = prepare(templates, converter, source)? else {
        return Ok(RenderOutcome::Draft);
    };
    let io_err = |source| RenderError::Io {
        path: output_path.to_path_buf(),
        source,
    };
    ensure_parent_dirs(output_path).map_err(io_err)?;
    let html = templates.render(&template, page.to_context())?;
    fs::write(output_path, html).map_err(io_err)?;
    Ok(RenderOutcome::Written)
}

/// Counts from one pass over `content/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentReport {
    /// Pages rendered (or, when checking, pages that would be).
    pub pages: usize,
    /// Pages skipped because of `Draft: true`.
    pub drafts: usize,
    /// Non-markdown files copied verbatim.
    pub copied: usize,
}

/// Render every markdown file under `content_dir` into `output_root` and copy
/// everything else next to it.
pub fn render_content_tree(
    content_dir: &Path,
    output_root: &Path,
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
) -> Result<ContentReport, ContentError> {
    process_tree(content_dir, templates, converter, Some(output_root))
}

/// Same validation as [`render_content_tree`] without touching the filesystem.
pub fn check_content_tree(
    content_dir: &Path,
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
) -> Result<ContentReport, ContentError> {
    process_tree(content_dir, templates, converter, None)
}

fn process_tree(
    content_dir: &Path,
    templates: &TemplateSet,
    converter: &dyn ContentConverter,
    output_root: Option<&Path>,
) -> Result<ContentReport, ContentError> {
    let mut report = ContentReport::default();
    // Output path (relative to public/) → the source that claimed it.
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    walk(content_dir, |file| {
        let is_markdown = file.has_extension(MARKDOWN_EXTENSION);
        let relative_output = if is_markdown {
            with_extension(&file.relative, HTML_EXTENSION).map_err(|source| ContentError::Io {
                path: file.path.clone(),
                source,
            })?
        } else {
            file.relative.clone()
        };

        // Drafts never claim an output path.
        let claim = |claimed: &mut HashMap<PathBuf, PathBuf>| {
            if let Some(first) = claimed.get(&relative_output) {
                return Err(ContentError::OutputCollision {
                    output: relative_output.clone(),
                    first: first.clone(),
                    second: file.path.clone(),
                });
            }
            claimed.insert(relative_output.clone(), file.path.clone());
            Ok(())
        };

        if is_markdown {
            let source = fs::read_to_string(&file.path).map_err(|source| ContentError::Io {
                path: file.path.clone(),
                source,
            })?;
            let page_err = |source| ContentError::Page {
                path: file.path.clone(),
                source,
            };
            let outcome = match output_root {
                Some(root) => {
                    let output_path = root.join(&relative_output);
                    render_content_file(templates, converter, &source, &output_path)
                        .map_err(page_err)?
                }
                None => match render_page(templates, converter, &source).map_err(page_err)? {
                    Some(_) => RenderOutcome::Written,
                    None => RenderOutcome::Draft,
                },
            };
            match outcome {
                RenderOutcome::Written => {
                    claim(&mut claimed)?;
                    log::debug!("rendered {}", file.relative.display());
                    report.pages += 1;
                }
                RenderOutcome::Draft => {
                    log::debug!("skipped draft {}", file.relative.display());
                    report.drafts += 1;
                }
            }
        } else {
            claim(&mut claimed)?;
            if let Some(root) = output_root {
                let output_path = root.join(&relative_output);
                copy_file(&file.path, &output_path).map_err(|source| ContentError::Io {
                    path: output_path.clone(),
                    source,
                })?;
                log::debug!("copied {}", file.relative.display());
            }
            report.copied += 1;
        }
        Ok::<(), ContentError>(())
    })?;

    Ok(report)
}
