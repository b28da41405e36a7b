/// Route matching
///
/// Walks the compiled tree in priority order and returns the chain of matched
/// routes from outermost to innermost. The first route that matches wins; no
/// exhaustive search is performed, so matching is deterministic.

use std::sync::Arc;

use crate::params::{ParamValue, Params};
use crate::path::{normalize_path, split_segments};
use crate::query::is_digits;
use crate::route::compiler::{CompiledRoute, RouteKind};
use crate::route::pattern::PathSegment;

/// Matching options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare literal segments ignoring ASCII case
    pub case_insensitive: bool,
}

/// One element of a [`MatchChain`]
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    pub route: Arc<CompiledRoute>,
    /// Captured parameters, merged with those of every enclosing route
    pub params: Params,
    /// Index of the first pathname segment this route consumed
    pub start: usize,
}

impl MatchedRoute {
    /// Whether both elements refer to the same compiled route
    pub fn same_route(&self, other: &MatchedRoute) -> bool {
        Arc::ptr_eq(&self.route, &other.route)
    }
}

/// Matched routes, outermost first
pub type MatchChain = Vec<MatchedRoute>;

/// Matches a pathname against the compiled routes
///
/// Returns `None` when nothing matches.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::{compile_routes, match_routes, MatchOptions, RouteDefinition};
/// use rhtmx_navigator::ParamValue;
///
/// let tree = compile_routes(vec![RouteDefinition::route("/users/:id<num>", "User")]).unwrap();
///
/// let chain = match_routes("/users/42", tree.routes(), MatchOptions::default()).unwrap();
/// assert_eq!(chain[0].params.get("id"), Some(&ParamValue::Num(42)));
///
/// assert!(match_routes("/users/abc", tree.routes(), MatchOptions::default()).is_none());
/// ```
pub fn match_routes(
    pathname: &str,
    routes: &[Arc<CompiledRoute>],
    options: MatchOptions,
) -> Option<MatchChain> {
    let normalized = normalize_path(pathname);
    let segments = split_segments(&normalized);
    match_level(&segments, routes, 0, &Params::new(), options)
}

fn match_level(
    segments: &[&str],
    routes: &[Arc<CompiledRoute>],
    start: usize,
    inherited: &Params,
    options: MatchOptions,
) -> Option<MatchChain> {
    routes
        .iter()
        .find_map(|route| try_match(segments, route, start, inherited, options))
}

/// Attempts to match one route (and, for a nest, its children) starting at
/// segment `start`
pub fn try_match(
    segments: &[&str],
    route: &Arc<CompiledRoute>,
    start: usize,
    inherited: &Params,
    options: MatchOptions,
) -> Option<MatchChain> {
    // Index routes are only ever appended by the navigator
    let pattern = route.segments()?;
    let remaining = segments.get(start..)?;

    let walked = match_segments(pattern, remaining, 0, inherited.clone(), options)?;
    let end = start + walked.consumed;

    let matched = MatchedRoute {
        route: Arc::clone(route),
        params: walked.params,
        start,
    };

    match route.kind() {
        RouteKind::Nest if end < segments.len() => {
            let tail = match_level(segments, route.children(), end, &matched.params, options)?;
            Some(std::iter::once(matched).chain(tail).collect())
        }
        RouteKind::Nest => Some(vec![matched]),
        _ if walked.wildcard || end == segments.len() => Some(vec![matched]),
        _ => None,
    }
}

struct SegmentMatch {
    params: Params,
    consumed: usize,
    wildcard: bool,
}

/// Tail-recursive walk over pattern and path segments
fn match_segments(
    pattern: &[PathSegment],
    path: &[&str],
    consumed: usize,
    mut params: Params,
    options: MatchOptions,
) -> Option<SegmentMatch> {
    let Some((head, pattern_rest)) = pattern.split_first() else {
        return Some(SegmentMatch {
            params,
            consumed,
            wildcard: false,
        });
    };

    // A wildcard ends matching successfully, even with nothing left
    if head.is_wildcard() {
        return Some(SegmentMatch {
            params,
            consumed,
            wildcard: true,
        });
    }

    let (segment, path_rest) = path.split_first()?;

    match head {
        PathSegment::Literal(value) => {
            let equal = if options.case_insensitive {
                value.eq_ignore_ascii_case(segment)
            } else {
                value == segment
            };
            if !equal {
                return None;
            }
        }
        PathSegment::Numeric(name) => {
            if !is_digits(segment) {
                return None;
            }
            let number = segment.parse::<u64>().ok()?;
            params.insert(name.clone(), ParamValue::Num(number));
        }
        PathSegment::Named(name) => {
            params.insert(name.clone(), ParamValue::Str((*segment).to_string()));
        }
        PathSegment::Wildcard => return None,
    }

    match_segments(pattern_rest, path_rest, consumed + 1, params, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;
    use crate::route::{compile_routes, RouteDefinition, RouteTree};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tree() -> RouteTree {
        compile_routes(vec![
            RouteDefinition::route("/", "Home"),
            RouteDefinition::route("/*", "NotFound"),
            RouteDefinition::route("/static", "Static"),
            RouteDefinition::route("/users/:id<num>", "User"),
            RouteDefinition::route("/docs/*", "Docs"),
            RouteDefinition::nest(
                "/a/:id",
                vec![
                    RouteDefinition::index("AIndex"),
                    RouteDefinition::route("/x", "AX"),
                ],
            ),
        ])
        .unwrap()
    }

    fn terminal(path: &str) -> Option<String> {
        let tree = tree();
        match_routes(path, tree.routes(), MatchOptions::default())
            .and_then(|chain| chain.last().map(|m| m.route.pattern().to_string()))
    }

    #[rstest]
    #[case("/", "/")]
    #[case("/static", "/static")]
    #[case("/other", "/*")]
    #[case("/users/42", "/users/:id<num>")]
    #[case("/users/abc", "/*")]
    #[case("/docs", "/docs/*")]
    #[case("/docs/a/b/c", "/docs/*")]
    #[case("/a/1/x", "/a/:id/x")]
    #[case("/a/1", "/a/:id")]
    #[case("/a/1/y", "/*")]
    fn test_terminal_route(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(terminal(path).as_deref(), Some(expected));
    }

    #[test]
    fn test_numeric_capture() {
        let tree = tree();
        let chain = match_routes("/users/42", tree.routes(), MatchOptions::default()).unwrap();
        assert_eq!(chain[0].params, params([("id", ParamValue::Num(42))]));
    }

    #[test]
    fn test_numeric_overflow_does_not_match() {
        let tree = compile_routes(vec![RouteDefinition::route("/n/:v<num>", "N")]).unwrap();
        let huge = "/n/99999999999999999999999";
        assert!(match_routes(huge, tree.routes(), MatchOptions::default()).is_none());
    }

    #[test]
    fn test_nested_params_are_merged() {
        let tree = tree();
        let chain = match_routes("/a/7/x", tree.routes(), MatchOptions::default()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].start, 0);
        assert_eq!(chain[1].start, 2);
        assert_eq!(chain[1].params, params([("id", ParamValue::from("7"))]));
    }

    #[test]
    fn test_wildcard_captures_nothing() {
        let tree = tree();
        let chain = match_routes("/docs/x/y", tree.routes(), MatchOptions::default()).unwrap();
        assert!(chain[0].params.is_empty());
    }

    #[test]
    fn test_case_insensitive_literals() {
        let tree = tree();
        let strict = MatchOptions::default();
        let relaxed = MatchOptions {
            case_insensitive: true,
        };
        let strict_hit = match_routes("/STATIC", tree.routes(), strict).unwrap();
        let relaxed_hit = match_routes("/STATIC", tree.routes(), relaxed).unwrap();
        assert_eq!(strict_hit[0].route.pattern(), "/*");
        assert_eq!(relaxed_hit[0].route.pattern(), "/static");
    }

    #[test]
    fn test_deterministic() {
        let tree = tree();
        let first = match_routes("/a/3/x", tree.routes(), MatchOptions::default()).unwrap();
        let second = match_routes("/a/3/x", tree.routes(), MatchOptions::default()).unwrap();
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.same_route(b) && a.params == b.params));
    }

    #[test]
    fn test_index_never_matches_directly() {
        let tree = compile_routes(vec![RouteDefinition::index("Root")]).unwrap();
        assert!(match_routes("/", tree.routes(), MatchOptions::default()).is_none());
    }
}
