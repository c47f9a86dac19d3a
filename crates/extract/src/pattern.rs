use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Range;

use regex::Regex;

use crate::category::Category;
use crate::consts::TOKEN_REGEX;
use crate::error::{ErrorKind, Result};

/// Which capture group of a regular expression provides the tag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Index(usize),
    Name(String),
}
impl Display for Capture {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Capture::Index(i) => write!(f, "{i}"),
            Capture::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Stored lowercase; compared against whole filename tokens.
    Keyword(String),
    Regex { regex: Regex, capture: Option<Capture> },
}

/// A single tag extraction rule: a matcher plus an optional fixed value.
///
/// - **Keyword** rules match a whole alphanumeric token of the filename,
///   ignoring case (`comp` matches `sh010_COMP_v1.exr` but not
///   `sh010_compositing.exr`). They yield the fixed value, or the keyword.
/// - **Regex** rules yield the fixed value, or the text of their capture
///   group. Without an explicit group, group 1 is used when the expression
///   has one, otherwise the whole match.
#[derive(Debug, Clone)]
pub struct PatternRule {
    matcher: Matcher,
    value: Option<String>,
}
impl PatternRule {
    pub fn keyword(keyword: impl Into<String>) -> Result<Self> {
        let keyword = keyword.into();
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric()) {
            exn::bail!(ErrorKind::InvalidKeyword(keyword));
        }
        Ok(Self {
            matcher: Matcher::Keyword(keyword.to_ascii_lowercase()),
            value: None,
        })
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ErrorKind::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            matcher: Matcher::Regex { regex, capture: None },
            value: None,
        })
    }

    /// Selects the capture group that provides the value. Only valid for
    /// regex rules, and the group must exist in the expression.
    pub fn with_capture(mut self, capture: Capture) -> Result<Self> {
        let Matcher::Regex { regex, capture: slot } = &mut self.matcher else {
            exn::bail!(ErrorKind::InvalidCapture(format!("keyword rules have no capture groups ({capture})")));
        };
        let exists = match &capture {
            Capture::Index(i) => *i < regex.captures_len(),
            Capture::Name(name) => regex.capture_names().flatten().any(|n| n == name),
        };
        if !exists {
            exn::bail!(ErrorKind::InvalidCapture(format!("`{}` has no group {capture}", regex.as_str())));
        }
        *slot = Some(capture);
        Ok(self)
    }

    /// Replaces whatever was matched with a fixed value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Runs the rule against `filename`, returning the value and the byte span
    /// of the filename that produced it.
    pub fn find(&self, filename: &str) -> Option<(String, Range<usize>)> {
        let (matched, span) = match &self.matcher {
            Matcher::Keyword(keyword) => {
                let token = TOKEN_REGEX.find_iter(filename).find(|t| t.as_str().eq_ignore_ascii_case(keyword))?;
                (keyword.clone(), token.range())
            },
            Matcher::Regex { regex, capture } => {
                let captures = regex.captures(filename)?;
                let group = match capture {
                    Some(Capture::Index(i)) => captures.get(*i),
                    Some(Capture::Name(name)) => captures.name(name),
                    None if regex.captures_len() > 1 => captures.get(1),
                    None => captures.get(0),
                }?;
                (group.as_str().to_string(), group.range())
            },
        };
        let value = self.value.clone().unwrap_or(matched);
        (!value.trim().is_empty()).then_some((value, span))
    }

    /// Short human readable description, e.g. `keyword:comp`.
    pub fn describe(&self) -> String {
        match &self.matcher {
            Matcher::Keyword(keyword) => format!("keyword:{keyword}"),
            Matcher::Regex { regex, .. } => format!("regex:{}", regex.as_str()),
        }
    }
}

/// The ordered rules for one tag [`Category`]. The first rule to match wins.
#[derive(Debug, Clone)]
pub struct PatternSet {
    category: Category,
    rules: Vec<PatternRule>,
}
impl PatternSet {
    pub fn new(category: Category, rules: Vec<PatternRule>) -> Self {
        Self { category, rules }
    }

    pub fn empty(category: Category) -> Self {
        Self::new(category, Vec::new())
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
