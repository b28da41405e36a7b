// Route module - declarative definitions, compilation and matching

pub mod compiler;
pub mod definition;
pub mod matcher;
pub mod pattern;

pub use compiler::{compile_routes, specificity_weight, CompiledRoute, RouteKind, RouteTree, MAX_WEIGHT};
pub use definition::{
    guard, substitute_params, Component, ComponentLoader, ComponentSource, GuardDecision, GuardFn,
    RedirectFn, RedirectTarget, ResolveContext, Resolver, ResolverFn, Resolves, RouteDefinition,
    SharedComponent,
};
pub use matcher::{match_routes, try_match, MatchChain, MatchOptions, MatchedRoute};
pub use pattern::{classify_segment, format_pattern, parse_path, PathSegment};
