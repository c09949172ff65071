use regex::{Captures, Regex};

const VARIABLE_PATTERN_REGEX: &str = r"\$\{([^}]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)";

lazy_static::lazy_static! {
    static ref VARIABLE_REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(VARIABLE_PATTERN_REGEX).unwrap()
    };
}

/// Replaces `$VAR` and `${VAR}` in `s` with the values of the process environment. Variables that
/// are not set expand to the empty string.
pub fn expand(s: &str) -> String {
    expand_with(s, |name| std::env::var(name).ok())
}

/// Replaces `$VAR` and `${VAR}` in `s` with the value returned by `lookup`. Variables for which
/// `lookup` returns `None` expand to the empty string.
pub fn expand_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VARIABLE_REGEX
        .replace_all(s, |captures: &Captures<'_>| {
            captures
                .get(1)
                .or_else(|| captures.get(2))
                .and_then(|name| lookup(name.as_str()))
                .unwrap_or_default()
        })
        .into_owned()
}
