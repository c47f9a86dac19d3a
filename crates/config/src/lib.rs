//! Configuration for shotsort: tag pattern sets, classification profiles,
//! destination path templates and engine settings.
//!
//! Pattern and profile documents are loaded through a [`PatternStore`], which
//! hands out immutable [`Catalog`] snapshots. Built-in documents are compiled
//! in, so [`ConfigSource::Builtin`] works without any files on disk.
//!
//! ```
//! use shotsort_config::{ConfigSource, PatternStore};
//!
//! let store = PatternStore::load(ConfigSource::Builtin).unwrap();
//! assert!(store.profile_names().contains(&"default".to_string()));
//! ```

mod document;
pub mod error;
mod path;
mod profile;
mod settings;
mod store;
mod template;

pub use crate::document::DocumentFormat;
pub use crate::path::validate as validate_path;
pub use crate::profile::{ClassificationRule, Condition, Predicate, Profile};
pub use crate::settings::{ENV_PREFIX, Settings};
pub use crate::store::{Catalog, ConfigSource, PatternStore};
pub use crate::template::{DEFAULT_MISSING_TAG, PathTemplate, TemplateContext};
