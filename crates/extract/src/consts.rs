use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Filename tokens that keywords are compared against.
regex!(TOKEN_REGEX, r"[A-Za-z0-9]+");
// Anything that looks like a version: "v1", "V0042", "ver_3", "version-12" or a bare number.
regex!(VERSION_REGEX, r"(?i)^(?:v(?:er(?:sion)?)?[_-]?)?(\d{1,18})$");
