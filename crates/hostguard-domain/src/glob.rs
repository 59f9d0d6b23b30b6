use globset::Glob;

/// Shell-style match of `value` against `pattern`.
///
/// `*` crosses separators, matching is case-sensitive. A pattern that does not
/// compile only matches itself literally.
pub fn glob_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(value),
        Err(_) => pattern == value,
    }
}

/// True if any comma separated pattern in `patterns` matches `value`.
pub fn any_glob_matches(patterns: &str, value: &str) -> bool {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| glob_matches(p, value))
}
