use crate::consts::VERSION_REGEX;

/// Normalizes a version-like token to its canonical form: a lowercase `v`
/// followed by the version number zero-padded to at least three digits.
///
/// Returns `None` when the token doesn't look like a version.
///
/// ```
/// use shotsort_extract::normalize_version;
/// assert_eq!(normalize_version("v1").as_deref(), Some("v001"));
/// assert_eq!(normalize_version("V0042").as_deref(), Some("v042"));
/// assert_eq!(normalize_version("ver_12").as_deref(), Some("v012"));
/// assert_eq!(normalize_version("v1234").as_deref(), Some("v1234"));
/// assert_eq!(normalize_version("final"), None);
/// ```
pub fn normalize_version(token: &str) -> Option<String> {
    let captures = VERSION_REGEX.captures(token.trim())?;
    let number: u64 = captures.get(1)?.as_str().parse().ok()?;
    Some(format!("v{number:03}"))
}

/// The numeric part of a canonical version (`v001` → `001`). Values that
/// aren't canonical versions are returned unchanged.
pub fn version_number(version: &str) -> &str {
    match version.strip_prefix('v') {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits,
        _ => version,
    }
}
