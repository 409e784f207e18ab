//! Database-name pattern decomposition.
//!
//! Clients list databases with patterns such as `sales_*|waggle_logs`. Each
//! backend only knows its own, unprefixed, namespace, so before a pattern is
//! forwarded it is split into one sub-pattern per routing prefix containing
//! only the part a backend can evaluate.
//!
//! # Grammar
//!
//! - `*` matches any run of characters, possibly empty
//! - `.` matches exactly one character
//! - `|` separates alternatives
//! - every other character is literal
//!
//! # Example
//!
//! ```
//! use apiary_federation::pattern::decompose;
//!
//! let parts = decompose(["abc_", "xyz_"], "ab*");
//! assert_eq!(parts.get("abc_").map(String::as_str), Some("*"));
//! assert!(!parts.contains_key("xyz_"));
//! ```

use std::collections::HashMap;

use regex::Regex;

/// Pattern matching every name.
pub const MATCH_ALL: &str = "*";

/// Separator between alternatives.
pub const OR_SEPARATOR: char = '|';

/// Qualifier naming the default catalog.
pub const DEFAULT_CATALOG: &str = "@hive#";

const CATALOG_MARKER: char = '@';
const CATALOG_SEPARATOR: char = '#';

/// Returns true if the pattern needs no decomposition.
///
/// The universal wildcard and the default-catalog sentinel are forwarded to
/// every backend unchanged.
pub fn is_passthrough(pattern: &str) -> bool {
    pattern == MATCH_ALL || pattern.eq_ignore_ascii_case(DEFAULT_CATALOG)
}

/// Splits `pattern` into per-prefix sub-patterns.
///
/// The result maps each prefix that at least one alternative of `pattern` can
/// structurally match to the remainders of those alternatives, joined with
/// `|`. Prefixes no alternative can match are absent. Passthrough patterns
/// (see [`is_passthrough`]) map every prefix to the pattern unchanged.
pub fn decompose<I, S>(prefixes: I, pattern: &str) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefixes: Vec<S> = prefixes.into_iter().collect();

    if is_passthrough(pattern) {
        return prefixes
            .iter()
            .map(|prefix| (prefix.as_ref().to_string(), pattern.to_string()))
            .collect();
    }

    let pattern = remove_catalog_name(pattern);

    let mut remainders: HashMap<String, Vec<&str>> = HashMap::new();
    for clause in pattern.split(OR_SEPARATOR) {
        for prefix in &prefixes {
            let prefix = prefix.as_ref();
            if let Some((_, remainder)) = split_pattern(prefix, clause) {
                remainders
                    .entry(prefix.to_string())
                    .or_default()
                    .push(remainder);
            }
        }
    }

    remainders
        .into_iter()
        .map(|(prefix, parts)| (prefix, parts.join("|")))
        .collect()
}

/// Splits one alternative into `(consumed, remainder)` for `prefix`.
///
/// `consumed` is the longest leading segment of `pattern`, cut at wildcard
/// boundaries, whose glob fully matches `prefix`. A trailing `*` in `consumed`
/// is shared: it also starts the remainder. A trailing `.` is not. Returns
/// `None` when no segment can match.
pub fn split_pattern<'p>(prefix: &str, pattern: &'p str) -> Option<(String, &'p str)> {
    if let Some(remainder) = pattern.strip_prefix(prefix) {
        return Some((prefix.to_string(), remainder));
    }

    let mut segment = pattern.to_string();
    loop {
        if glob_matches(&segment, prefix) {
            let remainder = if segment.ends_with('*') {
                &pattern[segment.len() - 1..]
            } else {
                &pattern[segment.len()..]
            };
            return Some((segment, remainder));
        }

        if segment.ends_with('*') || segment.ends_with('.') {
            segment.pop();
        }

        let last_star = segment.rfind('*');
        let last_dot = segment.rfind('.');
        match (last_star, last_dot) {
            (Some(star), Some(dot)) if star > dot => segment.truncate(star + 1),
            (Some(star), None) => segment.truncate(star + 1),
            // Rightmost wildcard is a dot: step back a single character.
            (_, Some(_)) => {
                segment.pop();
            }
            (None, None) => return None,
        }
    }
}

/// Returns true if the glob `pattern` matches the whole of `name`.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    match glob_regex(pattern) {
        Ok(regex) => regex.is_match(name),
        Err(_) => false,
    }
}

fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push_str("^(?s:");
    let mut literal = String::new();
    for c in pattern.chars() {
        match c {
            '*' | '.' => {
                expression.push_str(&regex::escape(&literal));
                literal.clear();
                expression.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    expression.push_str(&regex::escape(&literal));
    expression.push_str(")$");
    Regex::new(&expression)
}

/// Strips catalog qualifiers from a database name or pattern.
///
/// Every `@hive#` (any case) is removed, then a leading `@` and a trailing
/// `#` cause all markers of that kind to be removed. A blank result becomes
/// the default-catalog sentinel.
pub fn remove_catalog_name(value: &str) -> String {
    let mut value = remove_ignore_case(value, DEFAULT_CATALOG);

    if value.starts_with(CATALOG_MARKER) {
        value = value.replace(CATALOG_MARKER, "");
    }
    if value.ends_with(CATALOG_SEPARATOR) {
        value = value.replace(CATALOG_SEPARATOR, "");
    }

    if value.trim().is_empty() {
        DEFAULT_CATALOG.to_string()
    } else {
        value
    }
}

fn remove_ignore_case(value: &str, needle: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(value.len());
    let mut start = 0;
    while let Some(pos) = lower[start..].find(&needle) {
        out.push_str(&value[start..start + pos]);
        start += pos + needle.len();
    }
    out.push_str(&value[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(prefix: &str, pattern: &str) -> Option<(String, String)> {
        split_pattern(prefix, pattern).map(|(consumed, rest)| (consumed, rest.to_string()))
    }

    fn pair(consumed: &str, rest: &str) -> Option<(String, String)> {
        Some((consumed.to_string(), rest.to_string()))
    }

    // ========================================================================
    // split_pattern
    // ========================================================================

    #[test]
    fn test_split_literal_prefix() {
        assert_eq!(split("waggle_", "waggle_db"), pair("waggle_", "db"));
        assert_eq!(split("waggle_", "waggle_"), pair("waggle_", ""));
        assert_eq!(split("p", "p_suffix"), pair("p", "_suffix"));
    }

    #[test]
    fn test_split_empty_prefix_keeps_pattern() {
        assert_eq!(split("", "anything*"), pair("", "anything*"));
    }

    #[test]
    fn test_split_shared_star() {
        assert_eq!(split("abc_", "ab*"), pair("ab*", "*"));
        assert_eq!(split("waggle_", "wag*"), pair("wag*", "*"));
        assert_eq!(split("waggle_", "*"), pair("*", "*"));
        assert_eq!(split("waggle_", "*base"), pair("*", "*base"));
    }

    #[test]
    fn test_split_dot_is_consumed() {
        assert_eq!(split("waggle_", "waggle.db"), pair("waggle.", "db"));
        assert_eq!(split("waggle_", "wa.gle_*"), pair("wa.gle_*", "*"));
        assert_eq!(split("ab", "a.cd"), pair("a.", "cd"));
    }

    #[test]
    fn test_split_longest_segment_wins() {
        // "w*_*" already matches the prefix so the star is shared
        assert_eq!(split("waggle_", "w*_*db"), pair("w*_*", "*db"));
        assert_eq!(split("waggle_", "w*e_d*"), pair("w*", "*e_d*"));
    }

    #[test]
    fn test_split_no_match() {
        assert_eq!(split("waggle_", "foo*"), None);
        assert_eq!(split("waggle_", "db"), None);
        assert_eq!(split("waggle_", "w.x*"), None);
        assert_eq!(split("xy", ".a"), None);
    }

    #[test]
    fn test_split_underscore_is_literal() {
        assert_eq!(split("waggle_", "waggle-db"), None);
    }

    // ========================================================================
    // decompose
    // ========================================================================

    #[test]
    fn test_decompose_passthrough() {
        for pattern in ["*", "@hive#", "@HIVE#"] {
            let parts = decompose(["", "a_", "b_"], pattern);
            assert_eq!(parts.len(), 3);
            assert!(parts.values().all(|p| p == pattern));
        }
    }

    #[test]
    fn test_decompose_prefix_suffix() {
        let parts = decompose(["p"], "p_suffix");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts["p"], "_suffix");
    }

    #[test]
    fn test_decompose_shared_trailing_wildcard() {
        let parts = decompose(["abc_"], "ab*");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts["abc_"], "*");
    }

    #[test]
    fn test_decompose_alternatives_attributed() {
        let parts = decompose(["a_", "b_"], "a*|b*");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts["a_"], "*");
        assert_eq!(parts["b_"], "*");
    }

    #[test]
    fn test_decompose_or_joins_per_prefix() {
        let parts = decompose(["", "waggle_"], "waggle_db|waggle_logs|other");
        assert_eq!(parts["waggle_"], "db|logs");
        assert_eq!(parts[""], "waggle_db|waggle_logs|other");
    }

    #[test]
    fn test_decompose_absent_prefix() {
        let parts = decompose(["a_", "b_"], "a_x");
        assert_eq!(parts.len(), 1);
        assert!(!parts.contains_key("b_"));
    }

    #[test]
    fn test_decompose_strips_catalog() {
        let parts = decompose(["waggle_"], "@hive#waggle_db");
        assert_eq!(parts["waggle_"], "db");
    }

    // ========================================================================
    // catalog names and globs
    // ========================================================================

    #[test]
    fn test_remove_catalog_name() {
        assert_eq!(remove_catalog_name("@hive#db"), "db");
        assert_eq!(remove_catalog_name("@HiVe#db"), "db");
        assert_eq!(remove_catalog_name("db"), "db");
        assert_eq!(remove_catalog_name("@hive#"), "@hive#");
        assert_eq!(remove_catalog_name("@other#"), "other");
        assert_eq!(remove_catalog_name("  "), "@hive#");
        assert_eq!(remove_catalog_name("@hive#a*|@hive#b*"), "a*|b*");
    }

    #[test]
    fn test_glob_matches() {
        assert!(glob_matches("wag*", "waggle_"));
        assert!(glob_matches("w.ggle_", "waggle_"));
        assert!(glob_matches("*", ""));
        assert!(!glob_matches("w.ggle_", "wggle_"));
        assert!(!glob_matches("a+b", "aab"));
        assert!(glob_matches("a+b", "a+b"));
    }
}
