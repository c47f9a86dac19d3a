//! Pattern and profile documents.
//!
//! Both documents are maps: the pattern document is keyed by tag category and
//! the profile document by profile name. Each document is parsed with
//! [`figment`] into loosely-typed values first, so that one malformed entry
//! only empties that entry instead of failing the whole document. Rules that
//! have the right shape but can't be used (a regex that doesn't compile, an
//! unknown tag name) fail the load.
//!
//! ```yaml
//! # patterns.yaml
//! task:
//!   - keyword: comp
//!   - keyword: mm
//!     value: matchmove
//! version:
//!   - regex: '(?i)_(v\d+)'
//!
//! # profiles.yaml
//! default:
//!   description: Shots by task
//!   rules:
//!     - name: comps
//!       when: { task: comp }
//!       destination: '{shot}/comp/v{version}/'
//!     - when: { shot: { present: true } }
//!       destination: '{shot}/{task}/'
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Json, Toml, Yaml};
use figment::value::Value;
use regex::Regex;
use serde::Deserialize;
use shotsort_extract::{Capture, Category, PatternRule, PatternSet};

use crate::error::{ErrorKind, Result};
use crate::profile::{ClassificationRule, Predicate, Profile};
use crate::template::PathTemplate;

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Toml,
    Json,
}
impl DocumentFormat {
    /// Picks the format from the file extension, defaulting to YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path.as_ref().extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCapture {
    Index(usize),
    Name(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPatternRule {
    keyword: Option<String>,
    regex: Option<String>,
    group: Option<RawCapture>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProfile {
    Rules(Vec<RawRule>),
    Object {
        #[serde(default)]
        description: Option<String>,
        rules: Vec<RawRule>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    name: Option<String>,
    #[serde(default)]
    when: BTreeMap<String, RawPredicate>,
    #[serde(alias = "template")]
    destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPredicate {
    /// `task: comp` is shorthand for `task: { equals: comp }`.
    Equals(String),
    /// `asset: true` is shorthand for `asset: { present: true }`.
    Present(bool),
    Fields(RawPredicateFields),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPredicateFields {
    equals: Option<String>,
    contains: Option<String>,
    matches: Option<String>,
    present: Option<bool>,
}

fn parse_map(text: &str, format: DocumentFormat, document: &'static str) -> Result<BTreeMap<String, Value>> {
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let figment = match format {
        DocumentFormat::Yaml => Figment::from(Yaml::string(text)),
        DocumentFormat::Toml => Figment::from(Toml::string(text)),
        DocumentFormat::Json => Figment::from(Json::string(text)),
    };
    let map = figment.extract::<BTreeMap<String, Value>>().map_err(|e| ErrorKind::Malformed {
        document,
        reason: e.to_string(),
    })?;
    Ok(map)
}

/// Parses a pattern document into one [`PatternSet`] per category mentioned.
pub(crate) fn parse_patterns(text: &str, format: DocumentFormat) -> Result<Vec<PatternSet>> {
    let mut sets = Vec::new();
    for (key, value) in parse_map(text, format, "pattern")? {
        let Ok(category) = key.parse::<Category>() else {
            tracing::warn!(category = %key, "ignoring unknown tag category in pattern document");
            continue;
        };
        let raw = match value.deserialize::<Option<Vec<RawPatternRule>>>() {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(%category, error = %e, "malformed pattern list, category left empty");
                Vec::new()
            },
        };
        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, rule)| build_pattern(category, index + 1, rule))
            .collect::<Result<Vec<_>>>()?;
        sets.push(PatternSet::new(category, rules));
    }
    Ok(sets)
}

fn build_pattern(category: Category, position: usize, raw: RawPatternRule) -> Result<PatternRule> {
    let invalid = |reason: &str| ErrorKind::InvalidPattern {
        category,
        position,
        reason: reason.to_string(),
    };
    let rule = match (raw.keyword, raw.regex) {
        (Some(keyword), None) => {
            if raw.group.is_some() {
                exn::bail!(invalid("keyword rules have no capture groups"));
            }
            PatternRule::keyword(keyword).or_raise(|| invalid("unusable keyword"))?
        },
        (None, Some(regex)) => {
            let rule = PatternRule::regex(&regex).or_raise(|| invalid("regular expression does not compile"))?;
            match raw.group {
                Some(RawCapture::Index(i)) => rule.with_capture(Capture::Index(i)),
                Some(RawCapture::Name(name)) => rule.with_capture(Capture::Name(name)),
                None => Ok(rule),
            }
            .or_raise(|| invalid("capture group does not exist"))?
        },
        (Some(_), Some(_)) => exn::bail!(invalid("keyword and regex are mutually exclusive")),
        (None, None) => exn::bail!(invalid("either keyword or regex is required")),
    };
    Ok(match raw.value {
        Some(value) => rule.with_value(value),
        None => rule,
    })
}

/// Parses a profile document into profiles keyed by name.
pub(crate) fn parse_profiles(text: &str, format: DocumentFormat) -> Result<BTreeMap<String, Profile>> {
    let mut profiles = BTreeMap::new();
    for (name, value) in parse_map(text, format, "profile")? {
        let (description, raw) = match value.deserialize::<RawProfile>() {
            Ok(RawProfile::Rules(rules)) => (None, rules),
            Ok(RawProfile::Object { description, rules }) => (description, rules),
            Err(e) => {
                tracing::warn!(profile = %name, error = %e, "malformed profile, no rules loaded");
                (None, Vec::new())
            },
        };
        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, rule)| build_rule(&name, index + 1, rule))
            .collect::<Result<Vec<_>>>()?;
        let mut profile = Profile::new(name.clone(), rules);
        profile.description = description;
        profiles.insert(name, profile);
    }
    Ok(profiles)
}

fn build_rule(profile: &str, position: usize, raw: RawRule) -> Result<ClassificationRule> {
    let invalid = |reason: String| ErrorKind::InvalidRule {
        profile: profile.to_string(),
        position,
        reason,
    };
    let template = raw
        .destination
        .parse::<PathTemplate>()
        .or_raise(|| invalid(format!("unusable destination template `{}`", raw.destination)))?;
    let mut rule = ClassificationRule::new(template);
    rule.name = raw.name;
    for (key, predicate) in raw.when {
        let category = key.parse::<Category>().or_raise(|| invalid(format!("unknown tag `{key}`")))?;
        let predicate = match predicate {
            RawPredicate::Equals(value) => Predicate::Equals(value),
            RawPredicate::Present(present) => Predicate::Present(present),
            RawPredicate::Fields(fields) => match (fields.equals, fields.contains, fields.matches, fields.present) {
                (Some(value), None, None, None) => Predicate::Equals(value),
                (None, Some(value), None, None) => Predicate::contains(value),
                (None, None, Some(pattern), None) => Predicate::Matches(
                    Regex::new(&pattern).or_raise(|| invalid(format!("`{pattern}` does not compile")))?,
                ),
                (None, None, None, Some(present)) => Predicate::Present(present),
                _ => exn::bail!(invalid(format!(
                    "`{key}` needs exactly one of equals, contains, matches or present"
                ))),
            },
        };
        rule = rule.when(category, predicate);
    }
    Ok(rule)
}
