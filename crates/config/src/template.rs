//! Destination path templating.
//!
//! Converts extracted [`Tags`] into deterministic relative paths using
//! user-configured [upon] templates. Placeholders use single braces
//! (`{shot}`, `{task|upper}`) and the usual upon filter syntax, extended with:
//!
//! - **`slug`**: turns free text into an underscore-separated lowercase token
//!   (`"Hero" Tree's Bark` becomes `hero_trees_bark`).
//! - **`upper`** / **`lower`**: Unicode-aware case conversion.
//! - **`truncate`**: keeps at most `n` characters and drops separators left
//!   dangling at the cut, usable as either `truncate(value, n)` or
//!   `{value|truncate: n}`.
//!
//! # Template Variables
//!
//! | Variable      | Description                                          |
//! |---------------|------------------------------------------------------|
//! | `shot`        | Shot tag                                             |
//! | `task`        | Task tag                                             |
//! | `asset`       | Asset tag                                            |
//! | `version`     | Version number without the `v` (`001`)               |
//! | `version_tag` | Canonical version (`v001`)                           |
//! | `resolution`  | Resolution tag                                       |
//! | `stage`       | Stage tag                                            |
//! | `name`        | Display name of the item (`plate.[1001-1050].exr`)   |
//! | `base`        | Display name without its extension                   |
//! | `ext`         | Extension without the dot                            |
//! | `range`       | Frame range of a sequence (`1001-1050`), else empty  |
//! | `padding`     | Frame number width of a sequence, else `0`           |
//!
//! Tags that weren't extracted render as the configured missing tag token.
//! A template that renders to something ending in `/` names a directory: the
//! item's display name is appended to it.
//!
//! # Example
//!
//! ```
//! use shotsort_config::{PathTemplate, TemplateContext};
//! use shotsort_extract::{Category, Tags};
//!
//! let template: PathTemplate = "{shot}/{task|upper}/v{version}/".parse().unwrap();
//! let tags = Tags::default()
//!     .with(Category::Shot, "sh010".to_string())
//!     .with(Category::Task, "comp".to_string())
//!     .with(Category::Version, "v3".to_string());
//! let context = TemplateContext::new(&tags, "sh010_comp_v3.exr");
//! let path = template.render(&context).unwrap();
//! assert_eq!(path.to_str(), Some("sh010/COMP/v003/sh010_comp_v3.exr"));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

use exn::ResultExt;
use shotsort_extract::{Category, Tags, version_number};
use upon::{Engine, Syntax, Template};

use crate::error::{Error, ErrorKind, Result};
use crate::path::validate;

/// Token rendered in place of tags that weren't extracted, unless configured.
pub const DEFAULT_MISSING_TAG: &str = "NOTAG";

/// Everything a [`PathTemplate`] can reference for a single item.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub tags: &'a Tags,
    /// Display name: the file name, or the bracketed name of a sequence.
    pub name: &'a str,
    pub range: &'a str,
    pub padding: usize,
    pub missing: &'a str,
}
impl<'a> TemplateContext<'a> {
    pub fn new(tags: &'a Tags, name: &'a str) -> Self {
        Self {
            tags,
            name,
            range: "",
            padding: 0,
            missing: DEFAULT_MISSING_TAG,
        }
    }

    pub fn with_sequence(mut self, range: &'a str, padding: usize) -> Self {
        self.range = range;
        self.padding = padding;
        self
    }

    pub fn with_missing(mut self, missing: &'a str) -> Self {
        self.missing = missing;
        self
    }

    fn split_name(&self) -> (&'a str, &'a str) {
        match self.name.rsplit_once('.') {
            Some((base, ext)) if !base.is_empty() => (base, ext),
            _ => (self.name, ""),
        }
    }

    fn tag(&self, category: Category) -> &'a str {
        self.tags.get(category).unwrap_or(self.missing)
    }

    /// Builds the [`upon::Value`] map exposed to the template engine.
    fn parameters(&self) -> upon::Value {
        let (base, ext) = self.split_name();
        let version = self.tags.get(Category::Version);
        upon::value! {
            shot: self.tag(Category::Shot),
            task: self.tag(Category::Task),
            asset: self.tag(Category::Asset),
            version: version.map(version_number).unwrap_or(self.missing),
            version_tag: version.unwrap_or(self.missing),
            resolution: self.tag(Category::Resolution),
            stage: self.tag(Category::Stage),
            name: self.name,
            base: base,
            ext: ext,
            range: self.range,
            padding: self.padding as u64,
        }
    }
}

/// A compiled destination template.
///
/// Constructed via [`FromStr`], which compiles the template eagerly and
/// renders it once against sample values, so syntax errors and references to
/// unknown variables surface when configuration is loaded rather than while
/// mapping files.
pub struct PathTemplate {
    source: String,
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::with_syntax(Syntax::builder().expr("{", "}").build());
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template {
            template: s.to_string(),
            reason: "template does not compile".to_string(),
        })?;
        let generator = Self {
            source: s.to_string(),
            engine,
            template,
        };
        let sample = Category::ALL.into_iter().fold(Tags::default(), |tags, c| tags.with(c, c.to_string()));
        generator
            .render(&TemplateContext::new(&sample, "sample.[1-2].exr").with_sequence("1-2", 4))
            .or_raise(|| ErrorKind::Template {
                template: s.to_string(),
                reason: "template does not render".to_string(),
            })?;
        Ok(generator)
    }
}
impl Debug for PathTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("PathTemplate").field(&self.source).finish()
    }
}
impl PathTemplate {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders the template, returning a normalized path relative to the
    /// destination root.
    pub fn render(&self, context: &TemplateContext<'_>) -> Result<PathBuf> {
        let rendered = self
            .template
            .render(&self.engine, context.parameters())
            .to_string()
            .or_raise(|| ErrorKind::Template {
                template: self.source.clone(),
                reason: "unable to render".to_string(),
            })?;
        let rendered = rendered.trim();
        let path = match rendered.is_empty() || rendered.ends_with('/') {
            true => format!("{rendered}{}", context.name),
            false => rendered.to_string(),
        };
        Self::normalize(&path)
    }

    /// Trims each path segment, joins them with `/`, then validates.
    fn normalize(path: &str) -> Result<PathBuf> {
        let path = path.split('/').map(str::trim).collect::<Vec<_>>().join("/");
        validate(&path)
    }
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    fn is_quote(c: char) -> bool {
        matches!(c, '\'' | '"' | '`' | '\u{2018}'..='\u{201F}' | '\u{00AB}' | '\u{00BB}' | '\u{2039}' | '\u{203A}')
    }

    /// Shot, task and asset names separate words with `_`, so slugs do too.
    /// Quotes are dropped rather than turned into separators.
    pub(super) fn slug(s: &str) -> String {
        let unquoted: String = s.chars().filter(|c| !is_quote(*c)).collect();
        slugify!(&unquoted).replace('-', "_")
    }

    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => f.write_str(&slug(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// At most `max_chars` characters, without a trailing `_`, `-`, `.` or
    /// space: `sh010_comp` cut at 6 is `sh010`, not `sh010_`.
    pub(super) fn truncate(s: &str, max_chars: usize) -> String {
        let end = s.char_indices().nth(max_chars).map_or(s.len(), |(i, _)| i);
        s[..end].trim_end_matches(['_', '-', '.', ' ']).to_string()
    }

    fn upper(s: &str) -> String {
        s.to_uppercase()
    }

    fn lower(s: &str) -> String {
        s.to_lowercase()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate);
        engine.add_function("upper", upper);
        engine.add_function("lower", lower);
    }
}
