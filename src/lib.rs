//! # grafe
//!
//! A small static site generator. A project is a fixed directory layout of
//! markdown content, a theme, and assets; a build turns it into a `public/`
//! tree that any static file host can serve.
//!
//! # Architecture: One Pass, Fixed Stages
//!
//! ```text
//! content/**/*.md        ──render──▶  public/**/*.html
//! content/** (other)     ──copy────▶  public/**
//! theme/static/**        ──mirror──▶  public/**
//! static/**              ──mirror──▶  public/**        (wins over theme)
//! public/**/*.ts         ──transpile─▶ public/**/*.js
//!                                     public/.nojekyll
//! ```
//!
//! Every stage that touches a tree goes through the same walker and the same
//! relative-path arithmetic, so an input at `<dir>/a/b.ext` always lands at
//! `public/a/b.ext` (with `.md` becoming `.html`). The output directory is
//! deleted at the start of each build, which keeps builds reproducible: two
//! builds of the same project produce the same bytes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`paths`] | Extension arithmetic, parent directory creation, file copy |
//! | [`walk`] | Sorted recursive traversal yielding root-relative [`walk::SourceFile`]s |
//! | [`templates`] | Layouts + includes compiled into an immutable [`templates::TemplateSet`] |
//! | [`markdown`] | The markdown converter: front matter, tables, wiki links, heading anchors, math |
//! | [`render`] | Front matter validation, draft policy, page rendering, the content pass |
//! | [`mirror`] | Byte-for-byte asset tree copy |
//! | [`scripts`] | In-place TypeScript → JavaScript pass over the output tree |
//! | [`pipeline`] | Project layout and the build/check sequences |
//! | [`serve`] | Read-only preview server over `public/` |
//! | [`config`] | Optional `grafe.toml` loading and validation |
//! | [`output`] | CLI summaries for build and check |
//!
//! # Design Decisions
//!
//! ## Runtime Templates
//!
//! Layouts are theme files, not part of the binary, so they are compiled at
//! build time with [minijinja](https://docs.rs/minijinja). Each layout gets its
//! own environment holding every include; layouts can include, import and
//! extend shared fragments by file name. Title and summary are autoescaped; the
//! rendered body is bound as a safe value and inserted as-is.
//!
//! ## Strict Front Matter
//!
//! `Title`, `Summary` and `Template` must be strings, `Draft` a boolean and
//! `Params` a mapping. Nothing is coerced: a page with `Title: 2024` fails with
//! the field name and the type found, rather than rendering with a surprise
//! title. Drafts are skipped before validation, so a half-written page never
//! breaks the build.
//!
//! ## Errors Stop the Build
//!
//! There is no partial-success mode. The first failure is returned up through
//! [`pipeline::BuildError`] with the offending path attached; only the binary
//! turns it into a non-zero exit.
//!
//! ## Scripts Through an External Transpiler
//!
//! TypeScript is compiled by piping each file through a configurable command
//! (esbuild by default) behind the [`scripts::ScriptTranspiler`] trait. The
//! program is looked up only when a script is actually found, so sites without
//! TypeScript never need it installed.

pub mod config;
pub mod markdown;
pub mod mirror;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod render;
pub mod scripts;
pub mod serve;
pub mod templates;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
