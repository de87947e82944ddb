//! Markdown conversion.
//!
//! [`MarkdownConverter`] is configured once per build with a fixed set of
//! extensions and reused for every content file:
//!
//! | Extension | Source | Output |
//! |-----------|--------|--------|
//! | Front matter | `---` YAML block on line 1 | [`Converted::metadata`], not rendered |
//! | Tables | GFM pipe tables | `<table>` |
//! | Wiki links | `[[Page]]`, `[[Page#frag\|label]]` | `<a href="Page.html">` |
//! | Heading IDs | `## Setup` or `## Setup {#custom}` | `<h2 id="setup">` |
//! | Heading anchors | every heading | `<a class="anchor" href="#setup">#</a>` |
//! | Math | `$x$`, `$$x$$` | MathJax `\(x\)` / `\[x\]` spans |
//!
//! Raw HTML in the source passes through untouched.
//!
//! Front matter is only recognised when `---` is the very first line and a
//! closing `---` line follows. Anywhere else a `---` block is plain markdown
//! (a rule, then whatever the lines parse as). The body is converted in one
//! parser pass with the event stream rewritten on the fly; per-document state
//! (heading IDs already handed out) lives in a `ConvertContext` created for
//! that call alone.

use crate::paths::extension_of;
use pulldown_cmark::{
    CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
    html::push_html,
};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Front matter is not valid YAML: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
    #[error("Front matter must be a mapping of keys to values, found {0}")]
    FrontMatterShape(&'static str),
}

/// Output of a single conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    /// Rendered body, ready to be embedded without escaping.
    pub html: String,
    /// Front matter keys and values; empty when the file has none.
    pub metadata: Mapping,
}

/// Turns a content file's source text into HTML plus metadata.
pub trait ContentConverter {
    fn convert(&self, source: &str) -> Result<Converted, ConvertError>;
}

/// The markdown converter used for every `.md` file.
#[derive(Debug, Clone)]
pub struct MarkdownConverter {
    options: Options,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_HEADING_ATTRIBUTES
                | Options::ENABLE_WIKILINKS
                | Options::ENABLE_MATH,
        }
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentConverter for MarkdownConverter {
    fn convert(&self, source: &str) -> Result<Converted, ConvertError> {
        let (front_matter, body) = split_front_matter(source);
        let metadata = parse_front_matter(front_matter)?;

        let mut ctx = ConvertContext::default();
        let mut events = Vec::new();
        for event in Parser::new_ext(body, self.options) {
            ctx.handle(event, &mut events);
        }

        let mut html = String::with_capacity(body.len() * 3 / 2);
        push_html(&mut html, events.into_iter());

        Ok(Converted { html, metadata })
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

fn is_closing_fence(line: &str) -> bool {
    matches!(line.trim_end(), "---" | "...")
}

/// Split a leading `---` block off `source`.
///
/// Returns the YAML between the fences and the remaining body. Without an
/// opening fence on line 1, or without a closing `---` or `...` line, the
/// whole source is body.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let Some((first, rest)) = source.split_once('\n') else {
        return (None, source);
    };
    if !is_fence(first) {
        return (None, source);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if is_closing_fence(line) {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, source)
}

/// Parse front matter YAML into a mapping. An empty block is an empty mapping.
fn parse_front_matter(yaml: Option<&str>) -> Result<Mapping, ConvertError> {
    let Some(yaml) = yaml else {
        return Ok(Mapping::new());
    };
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(ConvertError::FrontMatterShape(value_kind(&other))),
    }
}

/// A heading whose events are held back until its ID is known.
struct PendingHeading<'a> {
    level: HeadingLevel,
    explicit_id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    text: String,
    inner: Vec<Event<'a>>,
}

/// Per-call conversion state. Never shared between documents.
#[derive(Default)]
struct ConvertContext<'a> {
    used_ids: HashSet<String>,
    heading: Option<PendingHeading<'a>>,
}

impl<'a> ConvertContext<'a> {
    fn handle(&mut self, event: Event<'a>, out: &mut Vec<Event<'a>>) {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                self.heading = Some(PendingHeading {
                    level,
                    explicit_id: id,
                    classes,
                    attrs,
                    text: String::new(),
                    inner: Vec::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = self.heading.take() {
                    self.finish_heading(heading, out);
                }
            }
            event => {
                let event = rewrite_inline(event);
                match self.heading.as_mut() {
                    Some(heading) => {
                        if let Event::Text(text) | Event::Code(text) = &event {
                            heading.text.push_str(text);
                        }
                        heading.inner.push(event);
                    }
                    None => out.push(event),
                }
            }
        }
    }

    fn finish_heading(&mut self, heading: PendingHeading<'a>, out: &mut Vec<Event<'a>>) {
        let tag = heading_tag(heading.level);
        let id = match heading.explicit_id {
            Some(id) => {
                self.used_ids.insert(id.to_string());
                id.to_string()
            }
            None => self.generate_id(&heading.text),
        };
        let id = escape_html(&id);

        let mut open = format!("<{tag} id=\"{id}\"");
        if !heading.classes.is_empty() {
            let classes: Vec<&str> = heading.classes.iter().map(|c| &**c).collect();
            open.push_str(&format!(" class=\"{}\"", escape_html(&classes.join(" "))));
        }
        for (key, value) in &heading.attrs {
            match value {
                Some(value) => open.push_str(&format!(
                    " {}=\"{}\"",
                    escape_html(key),
                    escape_html(value)
                )),
                None => open.push_str(&format!(" {}", escape_html(key))),
            }
        }
        open.push_str(&format!("><a class=\"anchor\" href=\"#{id}\">#</a> "));

        out.push(Event::Html(open.into()));
        out.extend(heading.inner);
        out.push(Event::Html(format!("</{tag}>\n").into()));
    }

    /// Auto heading ID: ASCII alphanumerics lowercased, each space, `-` or
    /// `_` becomes `-`, everything else dropped. Repeats get `-1`, `-2`, ...
    fn generate_id(&mut self, text: &str) -> String {
        let mut base: String = text
            .trim()
            .chars()
            .filter_map(|c| {
                if c.is_ascii_alphanumeric() {
                    Some(c.to_ascii_lowercase())
                } else if c.is_ascii_whitespace() || c == '-' || c == '_' {
                    Some('-')
                } else {
                    None
                }
            })
            .collect();
        if base.is_empty() {
            base = "heading".to_string();
        }

        if self.used_ids.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used_ids.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Wiki link targets and math spans.
fn rewrite_inline(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Start(Tag::Link {
            link_type: link_type @ LinkType::WikiLink { .. },
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: resolve_wikilink(&dest_url).into(),
            title,
            id,
        }),
        Event::InlineMath(math) => Event::InlineHtml(
            format!(
                "<span class=\"math inline\">\\({}\\)</span>",
                escape_html(&math)
            )
            .into(),
        ),
        Event::DisplayMath(math) => Event::InlineHtml(
            format!(
                "<span class=\"math display\">\\[{}\\]</span>",
                escape_html(&math)
            )
            .into(),
        ),
        event => event,
    }
}

/// `Page` → `Page.html`, `Page#frag` → `Page.html#frag`, `#frag` → `#frag`.
/// Targets that already carry an extension are left alone.
pub fn resolve_wikilink(target: &str) -> String {
    let (page, fragment) = match target.split_once('#') {
        Some((page, fragment)) => (page, Some(fragment)),
        None => (target, None),
    };
    let mut dest = page.to_string();
    if !page.is_empty() && extension_of(page).is_empty() {
        dest.push_str(".html");
    }
    if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
        dest.push('#');
        dest.push_str(fragment);
    }
    dest
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Name of a YAML value's type, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Converter that returns canned output and records what it was given.
    #[derive(Default)]
    pub struct MockConverter {
        pub html: String,
        pub metadata: Mapping,
        pub calls: RefCell<Vec<String>>,
    }

    impl MockConverter {
        pub fn with_metadata(html: &str, yaml: &str) -> Self {
            Self {
                html: html.to_string(),
                metadata: serde_yaml::from_str(yaml).unwrap(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ContentConverter for MockConverter {
        fn convert(&self, source: &str) -> Result<Converted, ConvertError> {
            self.calls.borrow_mut().push(source.to_string());
            Ok(Converted {
                html: self.html.clone(),
                metadata: self.metadata.clone(),
            })
        }
    }

    fn convert(source: &str) -> Converted {
        MarkdownConverter::new().convert(source).unwrap()
    }

    #[test]
    fn front_matter_is_extracted_not_rendered() {
        let out = convert("---\nTitle: Hello\nDraft: true\n---\n\nBody text\n");
        assert_eq!(out.metadata.get("Title").and_then(Value::as_str), Some("Hello"));
        assert_eq!(out.metadata.get("Draft").and_then(Value::as_bool), Some(true));
        assert!(!out.html.contains("Title"));
        assert!(out.html.contains("<p>Body text</p>"));
    }

    #[test]
    fn no_front_matter_gives_empty_metadata() {
        let out = convert("# Just a heading\n");
        assert!(out.metadata.is_empty());
    }

    #[test]
    fn nested_params_survive() {
        let out = convert("---\nParams:\n  tags: [a, b]\n  weight: 3\n---\n");
        let params = out.metadata.get("Params").unwrap();
        assert_eq!(value_kind(params), "mapping");
        assert_eq!(params.get("weight").and_then(Value::as_u64), Some(3));
    }

    #[test]
    fn scalar_front_matter_is_rejected() {
        let err = MarkdownConverter::new()
            .convert("---\njust a string\n---\n")
            .unwrap_err();
        assert!(matches!(err, ConvertError::FrontMatterShape("string")));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = MarkdownConverter::new()
            .convert("---\nTitle: [unclosed\n---\n")
            .unwrap_err();
        assert!(matches!(err, ConvertError::FrontMatter(_)));
    }

    #[test]
    fn later_dash_block_is_body_text() {
        let out = convert("Para\n\n---\nfoo: bar\n---\n\nEnd\n");
        assert!(out.metadata.is_empty());
        assert!(out.html.contains("<hr />"));
        assert!(out.html.contains("foo: bar"));
        assert!(out.html.contains("<p>End</p>"));
    }

    #[test]
    fn second_dash_block_after_front_matter_is_body_text() {
        let out = convert("---\nTitle: T\n---\nIntro\n\n---\nfoo: bar\n---\n");
        assert_eq!(out.metadata.len(), 1);
        assert!(out.html.contains("<p>Intro</p>"));
        assert!(out.html.contains("foo: bar"));
    }

    #[test]
    fn front_matter_must_open_on_first_line() {
        let out = convert("\n---\nTitle: T\n---\nbody\n");
        assert!(out.metadata.is_empty());
        assert!(out.html.contains("Title: T"));
        assert!(out.html.contains("body"));
    }

    #[test]
    fn front_matter_with_crlf_line_endings() {
        let out = convert("---\r\nTitle: T\r\n---\r\nbody\r\n");
        assert_eq!(out.metadata.get("Title").and_then(Value::as_str), Some("T"));
        assert!(out.html.contains("<p>body</p>"));
    }

    #[test]
    fn unclosed_front_matter_is_body() {
        let (yaml, body) = split_front_matter("---\nTitle: T\n");
        assert_eq!(yaml, None);
        assert_eq!(body, "---\nTitle: T\n");
    }

    #[test]
    fn split_front_matter_without_trailing_body() {
        assert_eq!(
            split_front_matter("---\nTitle: T\n---"),
            (Some("Title: T\n"), "")
        );
        assert_eq!(split_front_matter("---\n---\n"), (Some(""), ""));
        assert_eq!(
            split_front_matter("---\nTitle: T\n...\nbody"),
            (Some("Title: T\n"), "body")
        );
    }

    #[test]
    fn tables_are_rendered() {
        let out = convert("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("<td>2</td>"));
    }

    #[test]
    fn headings_get_ids_and_anchors() {
        let out = convert("## Getting Started\n");
        assert_eq!(
            out.html,
            "<h2 id=\"getting-started\"><a class=\"anchor\" href=\"#getting-started\">#</a> Getting Started</h2>\n"
        );
    }

    #[test]
    fn duplicate_headings_are_numbered() {
        let out = convert("# Notes\n\n# Notes\n\n# Notes\n");
        assert!(out.html.contains("id=\"notes\""));
        assert!(out.html.contains("id=\"notes-1\""));
        assert!(out.html.contains("id=\"notes-2\""));
    }

    #[test]
    fn heading_ids_reset_between_documents() {
        let converter = MarkdownConverter::new();
        let first = converter.convert("# Intro\n").unwrap();
        let second = converter.convert("# Intro\n").unwrap();
        assert_eq!(first.html, second.html);
        assert!(second.html.contains("id=\"intro\""));
    }

    #[test]
    fn explicit_heading_id_wins() {
        let out = convert("## Setup {#install .wide}\n");
        assert!(out.html.contains("<h2 id=\"install\" class=\"wide\">"));
        assert!(out.html.contains("href=\"#install\""));
    }

    #[test]
    fn heading_id_drops_punctuation_and_non_ascii() {
        let out = convert("## What's new in v2.0?\n");
        assert!(out.html.contains("id=\"whats-new-in-v20\""));
    }

    #[test]
    fn heading_without_slug_text_falls_back() {
        let out = convert("## ???\n");
        assert!(out.html.contains("id=\"heading\""));
    }

    #[test]
    fn heading_keeps_inline_markup() {
        let out = convert("## Use `cargo` *now*\n");
        assert!(out.html.contains("id=\"use-cargo-now\""));
        assert!(out.html.contains("<code>cargo</code>"));
        assert!(out.html.contains("<em>now</em>"));
    }

    #[test]
    fn wikilinks_point_at_html_pages() {
        let out = convert("See [[Setup Guide]] and [[faq#billing|billing]].\n");
        assert!(out.html.contains("href=\"Setup%20Guide.html\"") || out.html.contains("href=\"Setup Guide.html\""));
        assert!(out.html.contains("href=\"faq.html#billing\""));
        assert!(out.html.contains(">billing</a>"));
    }

    #[test]
    fn resolve_wikilink_rules() {
        assert_eq!(resolve_wikilink("Page"), "Page.html");
        assert_eq!(resolve_wikilink("Page#frag"), "Page.html#frag");
        assert_eq!(resolve_wikilink("#frag"), "#frag");
        assert_eq!(resolve_wikilink("diagram.png"), "diagram.png");
        assert_eq!(resolve_wikilink("docs/intro"), "docs/intro.html");
    }

    #[test]
    fn math_uses_mathjax_delimiters() {
        let out = convert("Inline $a<b$ and display:\n\n$$x^2$$\n");
        assert!(out.html.contains("<span class=\"math inline\">\\(a&lt;b\\)</span>"));
        assert!(out.html.contains("<span class=\"math display\">\\[x^2\\]</span>"));
    }

    #[test]
    fn raw_html_passes_through() {
        let out = convert("<div class=\"note\">kept</div>\n");
        assert!(out.html.contains("<div class=\"note\">kept</div>"));
    }

    #[test]
    fn mock_records_sources() {
        let mock = MockConverter::with_metadata("<p>x</p>", "Title: T");
        let out = mock.convert("source").unwrap();
        assert_eq!(out.html, "<p>x</p>");
        assert_eq!(mock.calls.borrow().as_slice(), ["source".to_string()]);
    }
}
