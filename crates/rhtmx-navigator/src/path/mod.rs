/// Path utilities for validation, normalization and base-href handling
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

/// Validates if a path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//` or `\`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::is_canonical_path;
///
/// assert!(is_canonical_path("/"));
/// assert!(is_canonical_path("/users/42"));
///
/// assert!(!is_canonical_path(""));
/// assert!(!is_canonical_path("users"));
/// assert!(!is_canonical_path("/users/"));
/// assert!(!is_canonical_path("/users//42"));
/// ```
pub fn is_canonical_path(path: &str) -> bool {
    if path.is_empty() || !path.starts_with('/') {
        return false;
    }

    if path.contains("//") || path.contains('\\') {
        return false;
    }

    path == "/" || !path.ends_with('/')
}

/// Normalize a path to canonical form
///
/// Returns `Cow::Borrowed` when input is already canonical (zero allocations).
///
/// - Missing leading slash: `users` → `/users`
/// - Trailing slashes: `/path/` → `/path`
/// - Repeated separators: `/path//to` → `/path/to`
/// - Backslashes: `\path\to` → `/path/to`
/// - Empty input: `` → `/`
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/about"), Cow::Borrowed("/about")));
/// assert_eq!(normalize_path("about/"), "/about");
/// assert_eq!(normalize_path("/path//to///page"), "/path/to/page");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_canonical_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

/// Splits a path into its non-empty segments
///
/// The root path has no segments.
///
/// ```
/// use rhtmx_navigator::path::split_segments;
///
/// assert_eq!(split_segments("/users/42"), vec!["users", "42"]);
/// assert!(split_segments("/").is_empty());
/// ```
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// Removes the base href prefix from a canonical pathname
///
/// The base must itself be canonical. A pathname equal to the base maps to
/// the root; a pathname outside the base is returned unchanged.
///
/// ```
/// use rhtmx_navigator::path::strip_base;
///
/// assert_eq!(strip_base("/app/users", "/app"), "/users");
/// assert_eq!(strip_base("/app", "/app"), "/");
/// assert_eq!(strip_base("/application", "/app"), "/application");
/// assert_eq!(strip_base("/users", "/"), "/users");
/// ```
pub fn strip_base<'a>(pathname: &'a str, base: &str) -> &'a str {
    if base == "/" {
        return pathname;
    }
    match pathname.strip_prefix(base) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => pathname,
    }
}

/// Prefixes a canonical pathname with the base href
///
/// ```
/// use rhtmx_navigator::path::join_base;
///
/// assert_eq!(join_base("/app", "/users"), "/app/users");
/// assert_eq!(join_base("/app", "/"), "/app");
/// assert_eq!(join_base("/", "/users"), "/users");
/// ```
pub fn join_base(base: &str, pathname: &str) -> String {
    match (base, pathname) {
        ("/", p) => p.to_string(),
        (b, "/") => b.to_string(),
        (b, p) => format!("{}{}", b, p),
    }
}

/// Splits an href into pathname and search (without the `?`)
///
/// Any `#fragment` is dropped.
pub fn split_href(href: &str) -> (&str, &str) {
    let href = href.split_once('#').map(|(h, _)| h).unwrap_or(href);
    match href.split_once('?') {
        Some((pathname, search)) => (pathname, search),
        None => (href, ""),
    }
}
