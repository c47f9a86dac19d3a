use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use tracing::instrument;

use crate::category::{Category, Tags};
use crate::pattern::PatternSet;
use crate::version::normalize_version;

/// A successful match of a [`PatternSet`] against a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The tag value (canonical form for versions).
    pub value: String,
    /// Index of the rule that matched within its set.
    pub rule: usize,
    /// Byte span of the filename the value came from.
    pub span: Range<usize>,
}

/// Runs `set` against the file name of `name`, returning the first match.
///
/// Directory components are stripped before matching: a tag can only ever
/// come from the file name itself.
pub fn extract(name: &str, set: &PatternSet) -> Option<Extraction> {
    let filename = file_name(name);
    set.rules().iter().enumerate().find_map(|(rule, pattern)| {
        let (value, span) = pattern.find(filename)?;
        let value = match set.category() {
            Category::Version => normalize_version(&value).unwrap_or(value),
            _ => value,
        };
        Some(Extraction { value, rule, span })
    })
}

fn file_name(name: &str) -> &str {
    Path::new(name).file_name().and_then(|n| n.to_str()).unwrap_or(name)
}

/// All tags extracted from one filename, along with the individual matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub tags: Tags,
    pub matches: BTreeMap<Category, Extraction>,
}

/// One [`PatternSet`] per [`Category`].
#[derive(Debug, Clone)]
pub struct TagExtractor {
    sets: Vec<PatternSet>,
}
impl Default for TagExtractor {
    fn default() -> Self {
        Self {
            sets: Category::ALL.into_iter().map(PatternSet::empty).collect(),
        }
    }
}
impl TagExtractor {
    /// Builds an extractor from pattern sets. Categories without a set are
    /// empty; a later set for the same category replaces an earlier one.
    pub fn new(sets: impl IntoIterator<Item = PatternSet>) -> Self {
        let mut extractor = Self::default();
        for set in sets {
            let index = set.category().index();
            extractor.sets[index] = set;
        }
        extractor
    }

    pub fn pattern_set(&self, category: Category) -> &PatternSet {
        &self.sets[category.index()]
    }

    pub fn extract(&self, category: Category, name: &str) -> Option<Extraction> {
        extract(name, self.pattern_set(category))
    }

    /// Runs every category against `name`.
    ///
    /// Numeric tokens can plausibly be both a resolution and a version; when
    /// those two matches overlap a warning is logged and both values are kept
    /// as extracted.
    #[instrument(level = "trace", skip(self))]
    pub fn extract_all(&self, name: &str) -> Extracted {
        let mut extracted = Extracted::default();
        for category in Category::ALL {
            if let Some(extraction) = self.extract(category, name) {
                extracted.tags.set(category, extraction.value.clone());
                extracted.matches.insert(category, extraction);
            }
        }
        if let (Some(resolution), Some(version)) =
            (extracted.matches.get(&Category::Resolution), extracted.matches.get(&Category::Version))
            && resolution.span.start < version.span.end
            && version.span.start < resolution.span.end
        {
            tracing::warn!(
                name,
                resolution = %resolution.value,
                version = %version.value,
                "resolution and version patterns matched overlapping text"
            );
        }
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternRule;

    fn set(category: Category, rules: &[&str]) -> PatternSet {
        PatternSet::new(category, rules.iter().map(|r| PatternRule::regex(r).unwrap()).collect())
    }

    #[test]
    fn test_first_rule_wins() {
        let set = PatternSet::new(
            Category::Task,
            vec![PatternRule::keyword("comp").unwrap(), PatternRule::keyword("roto").unwrap()],
        );
        let extraction = extract("sh010_roto_comp_v001.exr", &set).unwrap();
        assert_eq!(extraction.value, "comp");
        assert_eq!(extraction.rule, 0);
    }

    #[test]
    fn test_rule_order_is_significant() {
        let forward = set(Category::Shot, &[r"^([a-z]+\d+)_", r"^([a-z]+)"]);
        let reverse = set(Category::Shot, &[r"^([a-z]+)", r"^([a-z]+\d+)_"]);
        assert_eq!(extract("sh010_comp.exr", &forward).unwrap().value, "sh010");
        assert_eq!(extract("sh010_comp.exr", &reverse).unwrap().value, "sh");
    }

    #[test]
    fn test_falls_through_to_later_rules() {
        let set = set(Category::Shot, &[r"^(sq\d+_sh\d+)", r"^([a-z]+\d+)_"]);
        let extraction = extract("ab0010_plate.dpx", &set).unwrap();
        assert_eq!(extraction.value, "ab0010");
        assert_eq!(extraction.rule, 1);
    }

    #[test]
    fn test_no_match_is_none() {
        let set = set(Category::Shot, &[r"^([a-z]+\d+)_"]);
        assert_eq!(extract("README.txt", &set), None);
        assert_eq!(extract("anything.exr", &PatternSet::empty(Category::Shot)), None);
    }

    #[test]
    fn test_ignores_parent_directories() {
        let set = PatternSet::new(Category::Task, vec![PatternRule::keyword("comp").unwrap()]);
        assert_eq!(extract("/jobs/comp/sh010/plate_v001.exr", &set), None);
        assert_eq!(extract("/jobs/plates/sh010_comp.exr", &set).unwrap().value, "comp");
    }

    #[test]
    fn test_versions_are_normalized() {
        let set = set(Category::Version, &[r"(?i)_(v\d+)"]);
        assert_eq!(extract("sh010_comp_v1.exr", &set).unwrap().value, "v001");
        assert_eq!(extract("sh010_comp_V0042.exr", &set).unwrap().value, "v042");
    }

    #[test]
    fn test_other_categories_are_verbatim() {
        let set = set(Category::Asset, &[r"_(v\d+)"]);
        assert_eq!(extract("sh010_comp_v1.exr", &set).unwrap().value, "v1");
    }

    #[test]
    fn test_extract_all() {
        let extractor = TagExtractor::new([
            set(Category::Shot, &[r"^([a-z]+\d+)_"]),
            PatternSet::new(Category::Task, vec![PatternRule::keyword("comp").unwrap()]),
            set(Category::Version, &[r"_(v\d+)"]),
            set(Category::Resolution, &[r"(\d{3,4}x\d{3,4})"]),
        ]);
        let extracted = extractor.extract_all("sh010_comp_v2_1920x1080.exr");
        assert_eq!(extracted.tags.get(Category::Shot), Some("sh010"));
        assert_eq!(extracted.tags.get(Category::Task), Some("comp"));
        assert_eq!(extracted.tags.get(Category::Version), Some("v002"));
        assert_eq!(extracted.tags.get(Category::Resolution), Some("1920x1080"));
        assert_eq!(extracted.tags.get(Category::Asset), None);
        assert_eq!(extracted.tags.get(Category::Stage), None);
        assert_eq!(extracted.matches.len(), 4);
    }

    #[test]
    fn test_overlapping_matches_keep_both_values() {
        let extractor = TagExtractor::new([
            set(Category::Version, &[r"_(\d{4})\."]),
            set(Category::Resolution, &[r"_(\d{4})\."]),
        ]);
        let extracted = extractor.extract_all("plate_2048.exr");
        assert_eq!(extracted.tags.get(Category::Version), Some("v2048"));
        assert_eq!(extracted.tags.get(Category::Resolution), Some("2048"));
    }

    #[test]
    fn test_later_sets_replace_earlier_ones() {
        let extractor = TagExtractor::new([set(Category::Shot, &[r"^(a)"]), set(Category::Shot, &[r"^(b)"])]);
        assert_eq!(extractor.pattern_set(Category::Shot).len(), 1);
        assert_eq!(extractor.extract(Category::Shot, "b.exr").unwrap().value, "b");
    }
}
