use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::{Error, ErrorKind};
use crate::version::normalize_version;

/// A semantic production attribute extracted from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Shot,
    Task,
    Asset,
    Version,
    Resolution,
    /// Pipeline stage (`wip`, `review`, `final`, ...).
    Stage,
}
impl Category {
    /// Every category, in canonical order.
    pub const ALL: [Category; 6] = [
        Category::Shot,
        Category::Task,
        Category::Asset,
        Category::Version,
        Category::Resolution,
        Category::Stage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shot => "shot",
            Category::Task => "task",
            Category::Asset => "asset",
            Category::Version => "version",
            Category::Resolution => "resolution",
            Category::Stage => "stage",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}
impl FromStr for Category {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "shot" => Self::Shot,
            "task" => Self::Task,
            "asset" => Self::Asset,
            "version" => Self::Version,
            "resolution" | "res" => Self::Resolution,
            "stage" => Self::Stage,
            _ => exn::bail!(ErrorKind::UnknownCategory(s.to_string())),
        })
    }
}
impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Tag overrides applied on top of extracted [`Tags`]: `Some(value)` replaces
/// a tag, `None` clears it. Categories that aren't present are left alone.
pub type TagEdits = BTreeMap<Category, Option<String>>;

/// One optional value per [`Category`].
///
/// Values are trimmed on insertion and empty strings are stored as `None`.
/// Version values are stored in canonical form (see [`normalize_version`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags([Option<String>; 6]);
impl Tags {
    pub fn get(&self, category: Category) -> Option<&str> {
        self.0[category.index()].as_deref()
    }

    pub fn set(&mut self, category: Category, value: impl Into<Option<String>>) {
        let value = value.into().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).map(|v| match category {
            Category::Version => normalize_version(&v).unwrap_or(v),
            _ => v,
        });
        self.0[category.index()] = value;
    }

    pub fn with(mut self, category: Category, value: impl Into<Option<String>>) -> Self {
        self.set(category, value);
        self
    }

    pub fn is_present(&self, category: Category) -> bool {
        self.get(category).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Option<&str>)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Returns a copy of these tags with `edits` applied.
    pub fn with_edits(&self, edits: &TagEdits) -> Tags {
        let mut tags = self.clone();
        for (category, value) in edits {
            tags.set(*category, value.clone());
        }
        tags
    }
}
