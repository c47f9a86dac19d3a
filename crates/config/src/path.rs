//! Relative destination path validation.
//!
//! Rendered templates are untrusted: tag values come from filenames and from
//! interactive edits, so a rendered path must never climb out of the
//! destination root.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Device names Windows refuses as a file or directory name, with or without
/// an extension. Destination trees are shared with Windows workstations.
const RESERVED_NAMES: [&str; 22] = [
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8", "com9", "lpt1",
    "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Checks a single segment, returning it without trailing dots and spaces.
fn segment(name: &OsStr) -> Option<&str> {
    let segment = name.to_str()?;
    // A backslash is a separator on Windows: `sh010\..\..` must not sneak through as one segment.
    if segment.chars().any(|c| c == '\\' || c.is_control()) {
        return None;
    }
    let segment = segment.trim_end_matches(['.', ' ']);
    let stem = segment.split_once('.').map_or(segment, |(stem, _)| stem);
    match segment.is_empty() || RESERVED_NAMES.iter().any(|name| stem.eq_ignore_ascii_case(name)) {
        true => None,
        false => Some(segment),
    }
}

/// Validates a path relative to the destination root, returning it normalized.
///
/// `.` and empty segments are dropped, `..` may not climb above the root and
/// trailing dots or spaces are trimmed from every segment. Segments that are
/// not UTF-8, contain a backslash or a control character, or name a Windows
/// device (`con`, `nul.exr`, `LPT1`) are rejected.
///
/// ```
/// use std::path::Path;
/// use shotsort_config::validate_path;
/// assert!(validate_path("sh010/comp/v001").is_ok());
/// assert!(validate_path("a/../sh010").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("sh010\\comp").is_err());
/// assert!(validate_path("assets/aux/bark.tx").is_err());
/// assert_eq!(
///     validate_path("wrong/../v001. /./plate.[1001-1050].exr/").unwrap(),
///     Path::new("v001/plate.[1001-1050].exr")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let invalid = || ErrorKind::InvalidPath(path.as_ref().to_path_buf());
    let mut segments = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => match segment(s) {
                Some(s) => segments.push(s),
                None => exn::bail!(invalid()),
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate("sh010/comp/v001").unwrap(), Path::new("sh010/comp/v001"));
        assert_eq!(validate("plate.[1001-1050].exr").unwrap(), Path::new("plate.[1001-1050].exr"));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(validate("a//b//c").unwrap(), Path::new("a/b/c"));
        assert_eq!(validate("a/./b/./c").unwrap(), Path::new("a/b/c"));
        // Leading separators are dropped, everything is relative to the root.
        assert_eq!(validate("/sh010/comp").unwrap(), Path::new("sh010/comp"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("a/../../b").is_err());
        assert!(validate("..").is_err());
        assert_eq!(validate("a/b/..").unwrap(), Path::new("a"));
    }

    #[rstest]
    #[case("a\0b")]
    #[case("sh010\\comp")]
    #[case("sh010\\..\\..\\etc")]
    #[case("comp/take\t1")]
    fn test_invalid_characters(#[case] path: &str) {
        assert!(validate(path).is_err());
    }

    #[rstest]
    #[case("con")]
    #[case("assets/NUL/bark.tx")]
    #[case("sh010/aux.exr")]
    #[case("lpt1.tar.gz")]
    #[case("Com9 ")]
    fn test_reserved_names(#[case] path: &str) {
        assert!(validate(path).is_err());
    }

    #[test]
    fn test_reserved_names_only_match_whole_stems() {
        assert_eq!(validate("console/auxiliary.exr").unwrap(), Path::new("console/auxiliary.exr"));
        assert_eq!(validate("com10/nullify").unwrap(), Path::new("com10/nullify"));
    }

    #[test]
    fn test_trailing_dots_and_spaces() {
        assert_eq!(validate("v001./README.").unwrap(), Path::new("v001/README"));
        assert_eq!(validate("sh010 /comp. . ").unwrap(), Path::new("sh010/comp"));
        assert!(validate("sh010/...").is_err());
        assert!(validate(". .").is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("//").is_err());
    }
}
