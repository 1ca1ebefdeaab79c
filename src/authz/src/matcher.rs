//! Action and resource pattern matching
//!
//! Patterns are compared against the full requested value. The only
//! wildcard is `*`, which matches any run of characters (including none).
//! Everything else is compared byte-for-byte, case-sensitively.

/// Check if a requested action matches any of the given patterns
///
/// # Examples
///
/// ```
/// use warden_authz::matcher::match_action;
///
/// assert!(match_action("document:read", ["document:*"]));
/// assert!(!match_action("image:read", ["document:*"]));
/// ```
pub fn match_action<I, S>(requested: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match_any(requested, patterns)
}

/// Check if a requested resource matches any of the given patterns
pub fn match_resource<I, S>(requested: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match_any(requested, patterns)
}

fn match_any<I, S>(requested: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .any(|pattern| glob_match(pattern.as_ref(), requested))
}

/// Match a single `*` glob against a value, anchored at both ends
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if !pattern.contains('*') {
        return pattern == value;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    // Prefix and suffix must fit without overlapping
    if value.len() < first.len() + last.len() {
        return false;
    }
    if !value.starts_with(first) || !value.ends_with(last) {
        return false;
    }

    // Middle literals, in order, leftmost first
    let mut remaining = &value[first.len()..value.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(found) => remaining = &remaining[found + part.len()..],
            None => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(glob_match("document:read", "document:read"));
        assert!(!glob_match("document:read", "document:write"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!glob_match("Document:read", "document:read"));
        assert!(!glob_match("invoice/*", "INVOICE/1"));
    }

    #[test]
    fn test_star_matches_everything() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "anything/at:all"));
    }

    #[test]
    fn test_prefix_and_suffix_wildcards() {
        assert!(glob_match("document:*", "document:read"));
        assert!(glob_match("document:*", "document:"));
        assert!(!glob_match("document:*", "image:read"));
        assert!(glob_match("*:read", "image:read"));
        assert!(!glob_match("*:read", "image:write"));
    }

    #[test]
    fn test_full_string_anchoring() {
        // Not a substring search
        assert!(!glob_match("invoice/*", "archive/invoice/1"));
        assert!(!glob_match("*/1", "invoice/12"));
    }

    #[test]
    fn test_middle_wildcards() {
        assert!(glob_match("erp:*:create", "erp:invoice:create"));
        assert!(glob_match("a*b*c", "abc"));
        assert!(glob_match("a*b*c", "aXXbYYc"));
        assert!(!glob_match("a*b*c", "acb"));
        assert!(glob_match("a**c", "abc"));
    }

    #[test]
    fn test_overlapping_prefix_suffix() {
        assert!(!glob_match("ab*ba", "aba"));
        assert!(glob_match("ab*ba", "abba"));
    }

    #[test]
    fn test_no_single_char_wildcard() {
        assert!(!glob_match("file?.txt", "file1.txt"));
        assert!(glob_match("file?.txt", "file?.txt"));
    }

    #[test]
    fn test_pattern_lists() {
        assert!(match_action("document:read", ["image:*", "document:read"]));
        assert!(!match_action("document:delete", vec!["image:*".to_string(), "document:read".to_string()]));
        assert!(match_resource("anything", ["*"]));
    }

    #[test]
    fn test_empty_list_never_matches() {
        let none: [&str; 0] = [];
        assert!(!match_action("document:read", none));
        assert!(!match_resource("", Vec::<String>::new()));
    }
}
