/// Route tree compilation
///
/// Turns declarative [`RouteDefinition`]s into an immutable tree of
/// [`CompiledRoute`]s. Sibling lists are sorted by priority so the matcher can
/// stop at the first hit:
///
/// 1. the index route (at most one per sibling list)
/// 2. routes without a wildcard
/// 3. wildcard routes, weighted by the wildcard's segment index so that a
///    wildcard behind a longer literal prefix is tried first
///
/// Sorting is stable, so routes of equal weight keep declaration order.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::RouteError;
use crate::route::definition::{
    ComponentSource, GuardFn, RedirectTarget, Resolver, RouteDefinition, RouteHooks, RouteVariant,
    SharedComponent,
};
use crate::route::pattern::{format_pattern, parse_path, PathSegment};

/// Weight of a route without a wildcard
pub const MAX_WEIGHT: usize = usize::MAX;

/// Route kind, fixed by the definition variant at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Normal,
    Index,
    Redirect,
    Nest,
}

/// A node of the compiled route tree
pub struct CompiledRoute {
    kind: RouteKind,
    pattern: String,
    segments: Option<Vec<PathSegment>>,
    full_segments: Vec<PathSegment>,
    children: Vec<Arc<CompiledRoute>>,
    component: Option<ComponentSource>,
    loaded: OnceLock<SharedComponent>,
    redirect_to: Option<RedirectTarget>,
    redirect_child: Option<String>,
    hooks: RouteHooks,
}

impl CompiledRoute {
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Full pattern including every enclosing nest, e.g. `/users/:id<num>`
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Segments of this route's own path; `None` for index routes
    pub fn segments(&self) -> Option<&[PathSegment]> {
        self.segments.as_deref()
    }

    /// Segments of the full pattern, ancestors included
    pub fn full_segments(&self) -> &[PathSegment] {
        &self.full_segments
    }

    pub fn children(&self) -> &[Arc<CompiledRoute>] {
        &self.children
    }

    pub fn name(&self) -> Option<&str> {
        self.hooks.name.as_deref()
    }

    pub fn redirect_child(&self) -> Option<&str> {
        self.redirect_child.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.segments
            .as_ref()
            .is_some_and(|s| s.last().is_some_and(PathSegment::is_wildcard))
    }

    /// The component, if ready or already loaded
    pub fn component(&self) -> Option<SharedComponent> {
        match self.component.as_ref()? {
            ComponentSource::Ready(c) => Some(Arc::clone(c)),
            ComponentSource::Lazy(_) => self.loaded.get().cloned(),
        }
    }

    pub fn has_lazy_component(&self) -> bool {
        self.component.as_ref().is_some_and(ComponentSource::is_lazy)
    }

    /// Returns the component, running the lazy loader on first use
    ///
    /// Only a successful load is cached; a failed load is retried on the next
    /// navigation.
    pub async fn load_component(&self) -> anyhow::Result<Option<SharedComponent>> {
        match &self.component {
            None => Ok(None),
            Some(ComponentSource::Ready(c)) => Ok(Some(Arc::clone(c))),
            Some(ComponentSource::Lazy(loader)) => {
                if let Some(c) = self.loaded.get() {
                    return Ok(Some(Arc::clone(c)));
                }
                let component = loader().await?;
                Ok(Some(Arc::clone(self.loaded.get_or_init(|| component))))
            }
        }
    }

    pub(crate) fn redirect_to(&self) -> Option<&RedirectTarget> {
        self.redirect_to.as_ref()
    }

    pub(crate) fn on_enter(&self) -> Option<&GuardFn> {
        self.hooks.on_enter.as_ref()
    }

    pub(crate) fn on_leave(&self) -> Option<&GuardFn> {
        self.hooks.on_leave.as_ref()
    }

    pub(crate) fn resolvers(&self) -> &[(String, Resolver)] {
        &self.hooks.resolves
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .field("name", &self.hooks.name)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Priority weight of a route (pure function)
///
/// Routes without a wildcard weigh [`MAX_WEIGHT`]; a wildcard route weighs the
/// index of its wildcard segment.
///
/// ```
/// use rhtmx_navigator::route::{parse_path, specificity_weight, MAX_WEIGHT};
///
/// let literal = parse_path("/static", false).unwrap();
/// let wild = parse_path("/docs/*", false).unwrap();
/// assert_eq!(specificity_weight(Some(literal.as_slice())), MAX_WEIGHT);
/// assert_eq!(specificity_weight(Some(wild.as_slice())), 1);
/// assert_eq!(specificity_weight(None), MAX_WEIGHT);
/// ```
pub fn specificity_weight(segments: Option<&[PathSegment]>) -> usize {
    segments
        .and_then(|segs| segs.iter().position(PathSegment::is_wildcard))
        .unwrap_or(MAX_WEIGHT)
}

/// A compiled route tree plus its name index
#[derive(Debug, Default)]
pub struct RouteTree {
    routes: Vec<Arc<CompiledRoute>>,
    named: HashMap<String, Arc<CompiledRoute>>,
}

impl RouteTree {
    /// Top-level routes in priority order
    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<CompiledRoute>> {
        self.named.get(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Compiles a route tree
///
/// # Errors
///
/// - [`RouteError::InvalidPath`] for a malformed path
/// - [`RouteError::DuplicateIndexRoute`] when siblings declare two index routes
/// - [`RouteError::DuplicateRouteName`] when a name appears twice anywhere
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::{compile_routes, RouteDefinition, RouteKind};
///
/// let tree = compile_routes(vec![
///     RouteDefinition::route("/*", "NotFound"),
///     RouteDefinition::route("/static", "Static"),
/// ])
/// .unwrap();
///
/// assert_eq!(tree.routes()[0].pattern(), "/static");
/// assert_eq!(tree.routes()[1].kind(), RouteKind::Normal);
/// ```
pub fn compile_routes(definitions: Vec<RouteDefinition>) -> Result<RouteTree, RouteError> {
    let mut named = HashMap::new();
    let routes = compile_level(definitions, &[], &mut named)?;
    Ok(RouteTree { routes, named })
}

fn compile_level(
    definitions: Vec<RouteDefinition>,
    parent: &[PathSegment],
    named: &mut HashMap<String, Arc<CompiledRoute>>,
) -> Result<Vec<Arc<CompiledRoute>>, RouteError> {
    let index_routes = definitions
        .iter()
        .filter(|d| matches!(d.variant, RouteVariant::Index { .. }))
        .count();
    if index_routes > 1 {
        return Err(RouteError::DuplicateIndexRoute {
            parent: format_pattern(parent),
        });
    }

    let mut compiled = definitions
        .into_iter()
        .map(|def| compile_route(def, parent, named))
        .collect::<Result<Vec<_>, _>>()?;

    compiled.sort_by_key(|route| {
        (
            route.kind != RouteKind::Index,
            Reverse(specificity_weight(route.segments())),
        )
    });

    Ok(compiled)
}

fn compile_route(
    definition: RouteDefinition,
    parent: &[PathSegment],
    named: &mut HashMap<String, Arc<CompiledRoute>>,
) -> Result<Arc<CompiledRoute>, RouteError> {
    let RouteDefinition { variant, hooks } = definition;

    let (kind, path, component, redirect_to, redirect_child, children) = match variant {
        RouteVariant::Normal { path, component } => {
            (RouteKind::Normal, Some(path), Some(component), None, None, Vec::new())
        }
        RouteVariant::Index { component } => {
            (RouteKind::Index, None, Some(component), None, None, Vec::new())
        }
        RouteVariant::Redirect { path, redirect_to } => {
            (RouteKind::Redirect, Some(path), None, Some(redirect_to), None, Vec::new())
        }
        RouteVariant::Nest {
            path,
            component,
            redirect_child,
            children,
        } => (RouteKind::Nest, Some(path), component, None, redirect_child, children),
    };

    let segments = path
        .as_deref()
        .map(|p| parse_path(p, kind == RouteKind::Nest))
        .transpose()?;

    let full_segments: Vec<PathSegment> = parent
        .iter()
        .chain(segments.iter().flatten())
        .cloned()
        .collect();

    let redirect_to = redirect_to.map(|target| absolutize(target, parent));
    let children = compile_level(children, &full_segments, named)?;

    let route = Arc::new(CompiledRoute {
        kind,
        pattern: format_pattern(&full_segments),
        segments,
        full_segments,
        children,
        component,
        loaded: OnceLock::new(),
        redirect_to,
        redirect_child,
        hooks,
    });

    if let Some(name) = route.name() {
        if named.insert(name.to_string(), Arc::clone(&route)).is_some() {
            return Err(RouteError::DuplicateRouteName {
                name: name.to_string(),
            });
        }
    }

    Ok(route)
}

/// Resolves a relative static redirect target against the parent pattern
fn absolutize(target: RedirectTarget, parent: &[PathSegment]) -> RedirectTarget {
    match target {
        RedirectTarget::Path(path) if !path.starts_with('/') => {
            let base = format_pattern(parent);
            let joined = if base == "/" {
                format!("/{}", path)
            } else {
                format!("{}/{}", base, path)
            };
            RedirectTarget::Path(joined)
        }
        other => other,
    }
}
