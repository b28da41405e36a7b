/// Path segment compilation
///
/// Pure functional parsing of route paths into typed segments.
/// All functions are **pure**: same input → same output, no side effects.

use std::fmt;

use crate::error::RouteError;
use crate::path::{normalize_path, split_segments};

const NUMERIC_SUFFIX: &str = "<num>";

/// A compiled route path segment
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::pattern::{classify_segment, PathSegment};
///
/// assert_eq!(classify_segment("users"), PathSegment::Literal("users".into()));
/// assert_eq!(classify_segment(":id"), PathSegment::Named("id".into()));
/// assert_eq!(classify_segment(":id<num>"), PathSegment::Numeric("id".into()));
/// assert_eq!(classify_segment("*"), PathSegment::Wildcard);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Static text, matched by exact equality
    Literal(String),
    /// `:name<num>`, matches `^\d+$` and captures a number
    Numeric(String),
    /// `:name`, captures the raw segment
    Named(String),
    /// `*`, matches the rest of the path and captures nothing
    Wildcard,
}

impl PathSegment {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathSegment::Wildcard)
    }

    /// Name of the captured parameter, if this segment captures one
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PathSegment::Numeric(name) | PathSegment::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal(value) => f.write_str(value),
            PathSegment::Numeric(name) => write!(f, ":{}{}", name, NUMERIC_SUFFIX),
            PathSegment::Named(name) => write!(f, ":{}", name),
            PathSegment::Wildcard => f.write_str("*"),
        }
    }
}

/// Classifies one raw segment (pure function)
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Wildcard**: exactly `*`
/// 2. **Numeric**: `:name<num>`
/// 3. **Named**: `:name`
/// 4. **Literal**: any other text
///
/// Placement rules (wildcard position, empty capture names) are enforced by
/// [`parse_path`].
pub fn classify_segment(segment: &str) -> PathSegment {
    if segment == "*" {
        return PathSegment::Wildcard;
    }

    match segment.strip_prefix(':') {
        Some(capture) => match capture.strip_suffix(NUMERIC_SUFFIX) {
            Some(name) => PathSegment::Numeric(name.to_string()),
            None => PathSegment::Named(capture.to_string()),
        },
        None => PathSegment::Literal(segment.to_string()),
    }
}

/// Compiles a route path into segments
///
/// The path is normalized first, so `users/:id/` and `/users//:id` compile
/// identically. The root path compiles to no segments.
///
/// Fails with [`RouteError::InvalidPath`] when a wildcard is not the final
/// segment, when a nesting route uses a wildcard (there would be nothing
/// left for its children to match), or when a capture has no name.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::pattern::{parse_path, PathSegment};
///
/// let segs = parse_path("/users/:id<num>/*", false).unwrap();
/// assert_eq!(segs.len(), 3);
/// assert!(segs[2].is_wildcard());
///
/// assert!(parse_path("/docs/*", true).is_err());
/// assert!(parse_path("/*/edit", false).is_err());
/// ```
pub fn parse_path(path: &str, is_nest: bool) -> Result<Vec<PathSegment>, RouteError> {
    let normalized = normalize_path(path);
    let raw = split_segments(&normalized);
    let last = raw.len().saturating_sub(1);

    raw.iter()
        .enumerate()
        .map(|(idx, seg)| {
            let invalid = |reason| RouteError::InvalidPath {
                path: path.to_string(),
                reason,
            };
            match classify_segment(seg) {
                PathSegment::Wildcard if is_nest => {
                    Err(invalid("a nesting route cannot use a wildcard"))
                }
                PathSegment::Wildcard if idx != last => {
                    Err(invalid("wildcard must be the last segment"))
                }
                PathSegment::Numeric(name) | PathSegment::Named(name) if name.is_empty() => {
                    Err(invalid("parameter name is empty"))
                }
                segment => Ok(segment),
            }
        })
        .collect()
}

/// Renders segments back into a canonical pattern string
///
/// ```
/// use rhtmx_navigator::route::pattern::{format_pattern, parse_path};
///
/// let segs = parse_path("users//:id<num>/", false).unwrap();
/// assert_eq!(format_pattern(&segs), "/users/:id<num>");
/// assert_eq!(format_pattern(&[]), "/");
/// ```
pub fn format_pattern(segments: &[PathSegment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut acc, seg| {
        acc.push('/');
        acc.push_str(&seg.to_string());
        acc
    })
}
