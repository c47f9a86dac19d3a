use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Runs of ASCII digits; the last one in a file stem is the frame number.
regex!(DIGITS_REGEX, r"[0-9]+");
