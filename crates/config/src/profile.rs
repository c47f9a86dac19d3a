use std::fmt::{Display, Formatter, Result as FmtResult};

use regex::Regex;
use shotsort_extract::{Category, Tags};

use crate::template::PathTemplate;

/// A test against a single tag value.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Case-insensitive equality.
    Equals(String),
    /// Case-insensitive substring; stored lowercase.
    Contains(String),
    Matches(Regex),
    /// `true` when the tag must be present, `false` when it must be absent.
    Present(bool),
}
impl Predicate {
    pub fn contains(needle: impl AsRef<str>) -> Self {
        Self::Contains(needle.as_ref().to_lowercase())
    }

    pub fn test(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Present(expected), value) => value.is_some() == *expected,
            (_, None) => false,
            (Self::Equals(expected), Some(value)) => value.to_lowercase() == expected.to_lowercase(),
            (Self::Contains(needle), Some(value)) => value.to_lowercase().contains(needle.as_str()),
            (Self::Matches(regex), Some(value)) => regex.is_match(value),
        }
    }
}
impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Equals(value) => write!(f, "equals `{value}`"),
            Self::Contains(value) => write!(f, "contains `{value}`"),
            Self::Matches(regex) => write!(f, "matches `{}`", regex.as_str()),
            Self::Present(true) => write!(f, "is present"),
            Self::Present(false) => write!(f, "is absent"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub category: Category,
    pub predicate: Predicate,
}
impl Condition {
    pub fn new(category: Category, predicate: Predicate) -> Self {
        Self { category, predicate }
    }

    pub fn holds(&self, tags: &Tags) -> bool {
        self.predicate.test(tags.get(self.category))
    }
}

/// Conditions over tags plus the template used when all of them hold.
/// A rule without conditions matches everything.
#[derive(Debug)]
pub struct ClassificationRule {
    pub name: Option<String>,
    pub conditions: Vec<Condition>,
    pub template: PathTemplate,
}
impl ClassificationRule {
    pub fn new(template: PathTemplate) -> Self {
        Self {
            name: None,
            conditions: Vec::new(),
            template,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn when(mut self, category: Category, predicate: Predicate) -> Self {
        self.conditions.push(Condition::new(category, predicate));
        self
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        self.conditions.iter().all(|c| c.holds(tags))
    }

    /// The rule name, or a description of its conditions.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.conditions.is_empty() {
            true => "catch-all".to_string(),
            false => self
                .conditions
                .iter()
                .map(|c| format!("{} {}", c.category, c.predicate))
                .collect::<Vec<_>>()
                .join(" and "),
        }
    }
}

/// A named, ordered list of [`ClassificationRule`]s.
#[derive(Debug)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    pub rules: Vec<ClassificationRule>,
}
impl Profile {
    pub fn new(name: impl Into<String>, rules: Vec<ClassificationRule>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rules,
        }
    }

    /// Evaluates rules top to bottom; the first satisfied rule wins.
    pub fn classify(&self, tags: &Tags) -> Option<(usize, &ClassificationRule)> {
        self.rules.iter().enumerate().find(|(_, rule)| rule.matches(tags))
    }
}
