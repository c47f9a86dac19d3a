use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use exn::ResultExt;
use shotsort_extract::{Category, PatternSet, TagExtractor};
use tracing::instrument;

use crate::document::{DocumentFormat, parse_patterns, parse_profiles};
use crate::error::{ErrorKind, Result};
use crate::profile::Profile;

const BUILTIN_PATTERNS: &str = include_str!("../assets/patterns.yaml");
const BUILTIN_PROFILES: &str = include_str!("../assets/profiles.yaml");

/// Where pattern and profile documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Documents compiled into this crate.
    Builtin,
    /// Documents on disk; the format of each is picked from its extension.
    Files { patterns: PathBuf, profiles: PathBuf },
    Inline {
        patterns: String,
        profiles: String,
        format: DocumentFormat,
    },
}
impl ConfigSource {
    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))
    }
}

/// An immutable snapshot of everything loaded from a [`ConfigSource`].
#[derive(Debug, Default)]
pub struct Catalog {
    extractor: TagExtractor,
    profiles: BTreeMap<String, Arc<Profile>>,
}
impl Catalog {
    pub fn new(extractor: TagExtractor, profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            extractor,
            profiles: profiles.into_iter().map(|p| (p.name.clone(), Arc::new(p))).collect(),
        }
    }

    fn from_source(source: &ConfigSource) -> Result<Self> {
        let (sets, profiles) = match source {
            ConfigSource::Builtin => (
                parse_patterns(BUILTIN_PATTERNS, DocumentFormat::Yaml)?,
                parse_profiles(BUILTIN_PROFILES, DocumentFormat::Yaml)?,
            ),
            ConfigSource::Files { patterns, profiles } => (
                parse_patterns(&ConfigSource::read(patterns)?, DocumentFormat::from_path(patterns))?,
                parse_profiles(&ConfigSource::read(profiles)?, DocumentFormat::from_path(profiles))?,
            ),
            ConfigSource::Inline {
                patterns,
                profiles,
                format,
            } => (parse_patterns(patterns, *format)?, parse_profiles(profiles, *format)?),
        };
        Ok(Self::new(TagExtractor::new(sets), profiles.into_values()))
    }

    pub fn extractor(&self) -> &TagExtractor {
        &self.extractor
    }

    pub fn pattern_set(&self, category: Category) -> &PatternSet {
        self.extractor.pattern_set(category)
    }

    pub fn profile(&self, name: &str) -> Option<Arc<Profile>> {
        self.profiles.get(name).cloned()
    }

    /// Profile names in sorted order.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}

/// Loads pattern sets and profiles, and keeps the last valid [`Catalog`].
///
/// Readers take an [`Arc`] snapshot with [`catalog()`](Self::catalog), so a
/// [`reload()`](Self::reload) never changes the configuration underneath
/// someone already using it.
#[derive(Debug)]
pub struct PatternStore {
    source: ConfigSource,
    current: RwLock<Arc<Catalog>>,
}
impl PatternStore {
    #[instrument(level = "debug", skip_all)]
    pub fn load(source: ConfigSource) -> Result<Self> {
        let catalog = Catalog::from_source(&source)?;
        tracing::debug!(profiles = catalog.profiles.len(), "configuration loaded");
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Re-reads the source. The loaded configuration is only replaced when
    /// everything loads; on failure the previous configuration stays active.
    #[instrument(level = "debug", skip(self))]
    pub fn reload(&self) -> Result<()> {
        match Catalog::from_source(&self.source) {
            Ok(catalog) => {
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
                Ok(())
            },
            Err(e) => {
                let kind: &ErrorKind = &e;
                tracing::warn!(error = %kind, "reload failed, keeping previous configuration");
                Err(e)
            },
        }
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn profile(&self, name: &str) -> Option<Arc<Profile>> {
        self.catalog().profile(name)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.catalog().profile_names()
    }

    pub fn pattern_set(&self, category: Category) -> PatternSet {
        self.catalog().pattern_set(category).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotsort_extract::Tags;

    #[test]
    fn test_builtin_configuration() {
        let store = PatternStore::load(ConfigSource::Builtin).unwrap();
        assert!(store.profile_names().contains(&"default".to_string()));
        for category in Category::ALL {
            assert!(!store.pattern_set(category).is_empty(), "{category} has no builtin patterns");
        }
        let extracted = store.catalog().extractor().extract_all("shotA_comp_v001.1001.exr");
        assert_eq!(extracted.tags.get(Category::Shot), Some("shotA"));
        assert_eq!(extracted.tags.get(Category::Task), Some("comp"));
        assert_eq!(extracted.tags.get(Category::Version), Some("v001"));
    }

    #[test]
    fn test_builtin_default_profile() {
        let catalog = PatternStore::load(ConfigSource::Builtin).unwrap().catalog();
        let profile = catalog.profile("default").unwrap();
        let tags: Tags = catalog.extractor().extract_all("sh010_roto_v003.nk").tags;
        let (_, rule) = profile.classify(&tags).unwrap();
        assert_eq!(rule.template.as_str(), "{shot}/{task}/");
    }

    #[test]
    fn test_profile_names_are_sorted() {
        let store = PatternStore::load(ConfigSource::Inline {
            patterns: String::new(),
            profiles: "zeta: []\nalpha: []\nmid: []\n".to_string(),
            format: DocumentFormat::Yaml,
        })
        .unwrap();
        assert_eq!(store.profile_names(), ["alpha", "mid", "zeta"]);
        assert!(store.profile("nope").is_none());
    }

    fn write_files(dir: &Path, patterns: &str, profiles: &str) -> ConfigSource {
        let source = ConfigSource::Files {
            patterns: dir.join("patterns.yaml"),
            profiles: dir.join("profiles.toml"),
        };
        fs::write(dir.join("patterns.yaml"), patterns).unwrap();
        fs::write(dir.join("profiles.toml"), profiles).unwrap();
        source
    }

    #[test]
    fn test_reload_swaps_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_files(dir.path(), "task:\n  - keyword: comp\n", "[[a]]\ndestination = \"x/\"\n");
        let store = PatternStore::load(source).unwrap();
        let before = store.catalog();
        write_files(dir.path(), "task:\n  - keyword: roto\n", "[[b]]\ndestination = \"y/\"\n");
        store.reload().unwrap();
        assert_eq!(store.profile_names(), ["b"]);
        // Snapshots taken before the reload are unaffected.
        assert_eq!(before.profile_names(), ["a"]);
    }

    #[test]
    fn test_failed_reload_keeps_previous_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_files(dir.path(), "task:\n  - keyword: comp\n", "[[a]]\ndestination = \"x/\"\n");
        let store = PatternStore::load(source).unwrap();
        write_files(dir.path(), "task:\n  - regex: '(unclosed'\n", "[[b]]\ndestination = \"y/\"\n");
        assert!(store.reload().is_err());
        assert_eq!(store.profile_names(), ["a"]);
        assert_eq!(store.pattern_set(Category::Task).len(), 1);
    }

    #[test]
    fn test_missing_files_fail_to_load() {
        let source = ConfigSource::Files {
            patterns: PathBuf::from("/definitely/not/here/patterns.yaml"),
            profiles: PathBuf::from("/definitely/not/here/profiles.yaml"),
        };
        let error = PatternStore::load(source).unwrap_err();
        assert!(error.is_retryable());
    }
}
