//! Template registry.
//!
//! A theme provides page layouts and shared includes:
//!
//! ```text
//! theme/templates/
//! ├── layouts/
//! │   ├── default.html    # selected by `Template: default`
//! │   └── post.html       # selected by `Template: post`
//! └── includes/
//!     ├── head.html       # {% include "head.html" %}
//!     └── macros.html     # {% import "macros.html" as m %}
//! ```
//!
//! Every layout is compiled into its own unit together with all includes, so a
//! layout sees every include under the include's file name. Units are keyed by
//! the layout's file name and never change once loaded.
//!
//! Templates use [minijinja](https://docs.rs/minijinja) syntax. HTML
//! autoescaping is on for `.html`, `.htm` and `.xml` names; values bound as safe
//! strings (the page body) are written as-is.

use minijinja::{Environment, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Template file name is not valid UTF-8: {0}")]
    InvalidName(PathBuf),
    #[error("Failed to parse template {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
    #[error("The template {0} does not exist")]
    NotFound(String),
    #[error("Failed to render template {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// One template file read from disk.
#[derive(Debug, Clone)]
struct TemplateSource {
    name: String,
    path: PathBuf,
    source: String,
}

/// Compiled layouts keyed by file name (e.g. `"default.html"`).
pub struct TemplateSet {
    units: BTreeMap<String, Environment<'static>>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TemplateSet {
    /// Whether a unit named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Layout names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Execute the unit named `name` with `ctx` as its root context.
    pub fn render(&self, name: &str, ctx: Value) -> Result<String, TemplateError> {
        let env = self
            .units
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        env.get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })
    }

    fn compile(
        layouts: Vec<TemplateSource>,
        includes: &[TemplateSource],
    ) -> Result<Self, TemplateError> {
        let mut units = BTreeMap::new();
        for layout in layouts {
            let mut env = Environment::new();
            env.set_keep_trailing_newline(true);
            // Layout last: a layout shadows an include with the same name.
            for template in includes.iter().chain(std::iter::once(&layout)) {
                env.add_template_owned(template.name.clone(), template.source.clone())
                    .map_err(|source| TemplateError::Parse {
                        path: template.path.clone(),
                        source,
                    })?;
            }
            log::debug!(
                "compiled layout {} with {} include(s)",
                layout.name,
                includes.len()
            );
            units.insert(layout.name, env);
        }
        Ok(Self { units })
    }
}

/// Load `layouts/*` and `includes/*` under `templates_dir`.
///
/// A parse error in any file is returned; a template that does not parse
/// cannot be rendered later in the build either.
pub fn load_templates(templates_dir: &Path) -> Result<TemplateSet, TemplateError> {
    let layouts = read_template_dir(&templates_dir.join("layouts"))?;
    let includes = read_template_dir(&templates_dir.join("includes"))?;

    if layouts.is_empty() {
        log::warn!(
            "no layouts found in {}; every page will fail to resolve its template",
            templates_dir.join("layouts").display()
        );
    }

    TemplateSet::compile(layouts, &includes)
}

/// Read the regular files directly inside `dir`, sorted by name.
///
/// A missing directory reads as empty.
fn read_template_dir(dir: &Path) -> Result<Vec<TemplateSource>, TemplateError> {
    let io_err = |source| TemplateError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(io_err)?.path();
        // fs::metadata follows symlinks, so a linked layout counts as a file.
        if fs::metadata(&path).map_err(io_err)?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| TemplateError::InvalidName(path.clone()))?
                .to_string();
            let source = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(TemplateSource { name, path, source })
        })
        .collect()
}
