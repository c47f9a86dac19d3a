//! Tag extraction for VFX production filenames.
//!
//! A [`PatternSet`] is an ordered list of [`PatternRule`]s for a single tag
//! [`Category`]. Rules are tried top to bottom against a file *name* (never a
//! full path, so parent folders can't produce false positives) and the first
//! rule that matches wins. A [`TagExtractor`] bundles one set per category and
//! produces a complete [`Tags`] map for a filename.
//!
//! ```
//! use shotsort_extract::{Category, PatternRule, PatternSet, TagExtractor};
//!
//! let extractor = TagExtractor::new([
//!     PatternSet::new(Category::Shot, vec![PatternRule::regex(r"^([A-Za-z]+\d+)_").unwrap()]),
//!     PatternSet::new(Category::Version, vec![PatternRule::regex(r"_(v\d+)").unwrap()]),
//! ]);
//! let tags = extractor.extract_all("sh010_comp_v3.exr").tags;
//! assert_eq!(tags.get(Category::Shot), Some("sh010"));
//! assert_eq!(tags.get(Category::Version), Some("v003"));
//! assert_eq!(tags.get(Category::Task), None);
//! ```

mod category;
mod consts;
pub mod error;
mod extractor;
mod pattern;
mod version;

pub use crate::category::{Category, TagEdits, Tags};
pub use crate::extractor::{Extracted, Extraction, TagExtractor, extract};
pub use crate::pattern::{Capture, PatternRule, PatternSet};
pub use crate::version::{normalize_version, version_number};
