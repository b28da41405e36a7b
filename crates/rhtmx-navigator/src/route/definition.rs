/// Declarative route definitions
///
/// Routes are declared as an immutable tree of [`RouteDefinition`] values and
/// compiled once by [`compile_routes`](crate::route::compile_routes). Every
/// definition is one of four variants (normal, index, redirect, nest) and may
/// carry a name, enter/leave guards and named data resolvers.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

use crate::location::Location;
use crate::params::{Params, Query};

// ============================================================================
// Components
// ============================================================================

/// Something an outlet can render
///
/// The navigator never looks inside a component; it only hands it to the
/// host view layer through [`OutletContent`](crate::outlet::OutletContent).
pub trait Component: Send + Sync + 'static {
    fn name(&self) -> &str;
}

impl Component for &'static str {
    fn name(&self) -> &str {
        self
    }
}

impl Component for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

pub type SharedComponent = Arc<dyn Component>;

/// Async component loader, for code-split views
pub type ComponentLoader =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<SharedComponent>> + Send + Sync>;

/// Either a component ready to render or a loader producing one
///
/// Loaded components are cached on the compiled route after the first
/// successful load.
#[derive(Clone)]
pub enum ComponentSource {
    Ready(SharedComponent),
    Lazy(ComponentLoader),
}

impl ComponentSource {
    pub fn ready(component: impl Component) -> Self {
        ComponentSource::Ready(Arc::new(component))
    }

    /// Wraps an async loader
    ///
    /// ```
    /// use rhtmx_navigator::route::{ComponentSource, SharedComponent};
    /// use std::sync::Arc;
    ///
    /// let source = ComponentSource::lazy(|| async {
    ///     Ok(Arc::new("Settings") as SharedComponent)
    /// });
    /// assert!(source.is_lazy());
    /// ```
    pub fn lazy<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<SharedComponent>> + Send + 'static,
    {
        ComponentSource::Lazy(Arc::new(move || loader().boxed()))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, ComponentSource::Lazy(_))
    }
}

impl From<&'static str> for ComponentSource {
    fn from(name: &'static str) -> Self {
        ComponentSource::ready(name)
    }
}

impl From<String> for ComponentSource {
    fn from(name: String) -> Self {
        ComponentSource::ready(name)
    }
}

impl From<SharedComponent> for ComponentSource {
    fn from(component: SharedComponent) -> Self {
        ComponentSource::Ready(component)
    }
}

impl fmt::Debug for ComponentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSource::Ready(c) => f.debug_tuple("Ready").field(&c.name()).finish(),
            ComponentSource::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

// ============================================================================
// Guards
// ============================================================================

/// Outcome of a navigation guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny,
}

impl From<bool> for GuardDecision {
    fn from(allow: bool) -> Self {
        if allow {
            GuardDecision::Allow
        } else {
            GuardDecision::Deny
        }
    }
}

/// Async guard receiving `(from, to)`
pub type GuardFn = Arc<dyn Fn(Location, Location) -> BoxFuture<'static, GuardDecision> + Send + Sync>;

/// Wraps an async closure into a [`GuardFn`]
///
/// The closure may return anything convertible into a [`GuardDecision`],
/// including a plain `bool`.
///
/// ```
/// use rhtmx_navigator::route::guard;
///
/// let only_logged_in = guard(|_from, to| async move { to.query.contains_key("token") });
/// # drop(only_logged_in);
/// ```
pub fn guard<F, Fut>(f: F) -> GuardFn
where
    F: Fn(Location, Location) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Into<GuardDecision>,
{
    Arc::new(move |from: Location, to: Location| -> BoxFuture<'static, GuardDecision> {
        let decision = f(from, to);
        async move { decision.await.into() }.boxed()
    })
}

// ============================================================================
// Resolvers
// ============================================================================

/// Data resolved for one route, keyed by resolver name
pub type Resolves = BTreeMap<String, Value>;

/// Input handed to resolvers and redirect functions
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// Parameters of the route being resolved, merged with its ancestors
    pub params: Params,
    pub query: Query,
    /// Accumulated resolves of every enclosing route
    pub parent_resolves: Resolves,
}

pub type ResolverFn =
    Arc<dyn Fn(ResolveContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// A named piece of route data: a static value or an async function
#[derive(Clone)]
pub enum Resolver {
    Value(Value),
    Fn(ResolverFn),
}

impl Resolver {
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Resolver::Fn(Arc::new(move |ctx: ResolveContext| f(ctx).boxed()))
    }

    pub(crate) fn resolve(&self, ctx: ResolveContext) -> BoxFuture<'static, anyhow::Result<Value>> {
        match self {
            Resolver::Value(value) => future::ready(Ok(value.clone())).boxed(),
            Resolver::Fn(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Resolver::Fn(_) => f.write_str("Fn"),
        }
    }
}

// ============================================================================
// Redirect targets
// ============================================================================

pub type RedirectFn =
    Arc<dyn Fn(ResolveContext) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync>;

/// Where a redirect route sends the user
///
/// A static target may reference captured parameters as `:name`; a relative
/// target (no leading `/`) is resolved against the enclosing route's path.
#[derive(Clone)]
pub enum RedirectTarget {
    Path(String),
    Resolve(RedirectFn),
}

impl RedirectTarget {
    pub fn resolve_with<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        RedirectTarget::Resolve(Arc::new(move |ctx: ResolveContext| f(ctx).boxed()))
    }
}

impl From<&str> for RedirectTarget {
    fn from(target: &str) -> Self {
        RedirectTarget::Path(target.to_string())
    }
}

impl From<String> for RedirectTarget {
    fn from(target: String) -> Self {
        RedirectTarget::Path(target)
    }
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Path(p) => f.debug_tuple("Path").field(p).finish(),
            RedirectTarget::Resolve(_) => f.write_str("Resolve"),
        }
    }
}

/// Substitutes `:name` and `:name<num>` placeholders with captured values
///
/// Placeholders without a matching parameter are left as-is.
///
/// ```
/// use rhtmx_navigator::route::substitute_params;
/// use rhtmx_navigator::{params, ParamValue};
///
/// let p = params([("id", ParamValue::Num(7))]);
/// assert_eq!(substitute_params("/users/:id<num>/edit", &p), "/users/7/edit");
/// assert_eq!(substitute_params("/users/:other", &p), "/users/:other");
/// ```
pub fn substitute_params(target: &str, params: &Params) -> String {
    target
        .split('/')
        .map(|seg| {
            seg.strip_prefix(':')
                .map(|name| name.strip_suffix("<num>").unwrap_or(name))
                .and_then(|name| params.get(name))
                .map(|value| value.to_string())
                .unwrap_or_else(|| seg.to_string())
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Route definitions
// ============================================================================

/// Optional behavior shared by every route variant
#[derive(Clone, Default)]
pub(crate) struct RouteHooks {
    pub(crate) name: Option<String>,
    pub(crate) on_leave: Option<GuardFn>,
    pub(crate) on_enter: Option<GuardFn>,
    pub(crate) resolves: Vec<(String, Resolver)>,
}

pub(crate) enum RouteVariant {
    Normal {
        path: String,
        component: ComponentSource,
    },
    Index {
        component: ComponentSource,
    },
    Redirect {
        path: String,
        redirect_to: RedirectTarget,
    },
    Nest {
        path: String,
        component: Option<ComponentSource>,
        redirect_child: Option<String>,
        children: Vec<RouteDefinition>,
    },
}

/// A declared route
///
/// Built with one of the variant constructors and refined with the
/// immutable builder methods.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::route::RouteDefinition;
///
/// let routes = vec![
///     RouteDefinition::route("/", "Home"),
///     RouteDefinition::nest("/users", vec![
///         RouteDefinition::index("UserList"),
///         RouteDefinition::route("/:id<num>", "UserDetail").with_name("user"),
///     ])
///     .with_component("UsersLayout"),
///     RouteDefinition::redirect("/people", "/users"),
/// ];
/// assert_eq!(routes.len(), 3);
/// ```
pub struct RouteDefinition {
    pub(crate) variant: RouteVariant,
    pub(crate) hooks: RouteHooks,
}

impl RouteDefinition {
    fn from_variant(variant: RouteVariant) -> Self {
        Self {
            variant,
            hooks: RouteHooks::default(),
        }
    }

    /// A leaf route rendering `component`
    pub fn route(path: impl Into<String>, component: impl Into<ComponentSource>) -> Self {
        Self::from_variant(RouteVariant::Normal {
            path: path.into(),
            component: component.into(),
        })
    }

    /// The route rendered when its parent nest matches exactly
    pub fn index(component: impl Into<ComponentSource>) -> Self {
        Self::from_variant(RouteVariant::Index {
            component: component.into(),
        })
    }

    pub fn redirect(path: impl Into<String>, redirect_to: impl Into<RedirectTarget>) -> Self {
        Self::from_variant(RouteVariant::Redirect {
            path: path.into(),
            redirect_to: redirect_to.into(),
        })
    }

    /// A route whose children match the remainder of the path
    ///
    /// Without a component the nest renders a bare nested outlet.
    pub fn nest(path: impl Into<String>, children: Vec<RouteDefinition>) -> Self {
        Self::from_variant(RouteVariant::Nest {
            path: path.into(),
            component: None,
            redirect_child: None,
            children,
        })
    }

    /// Replaces the component (no effect on redirect routes)
    pub fn with_component(mut self, component: impl Into<ComponentSource>) -> Self {
        let component = component.into();
        match &mut self.variant {
            RouteVariant::Normal { component: c, .. } | RouteVariant::Index { component: c } => {
                *c = component;
            }
            RouteVariant::Nest { component: c, .. } => *c = Some(component),
            RouteVariant::Redirect { .. } => {}
        }
        self
    }

    /// For a nest: when matched exactly, redirect to `<path>/<child>`
    pub fn with_redirect_child(mut self, child: impl Into<String>) -> Self {
        if let RouteVariant::Nest { redirect_child, .. } = &mut self.variant {
            *redirect_child = Some(child.into());
        }
        self
    }

    /// Names the route for [`Navigator::href`](crate::Navigator::href)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.hooks.name = Some(name.into());
        self
    }

    pub fn on_enter(mut self, guard: GuardFn) -> Self {
        self.hooks.on_enter = Some(guard);
        self
    }

    pub fn on_leave(mut self, guard: GuardFn) -> Self {
        self.hooks.on_leave = Some(guard);
        self
    }

    /// Adds a static resolve
    pub fn with_resolve(mut self, key: impl Into<String>, value: Value) -> Self {
        self.hooks.resolves.push((key.into(), Resolver::Value(value)));
        self
    }

    /// Adds an async resolver
    pub fn with_resolver<F, Fut>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.hooks.resolves.push((key.into(), Resolver::from_fn(f)));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.hooks.name.as_deref()
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RouteDefinition");
        match &self.variant {
            RouteVariant::Normal { path, component } => {
                s.field("kind", &"normal").field("path", path).field("component", component)
            }
            RouteVariant::Index { component } => {
                s.field("kind", &"index").field("component", component)
            }
            RouteVariant::Redirect { path, redirect_to } => s
                .field("kind", &"redirect")
                .field("path", path)
                .field("redirect_to", redirect_to),
            RouteVariant::Nest {
                path,
                component,
                redirect_child,
                children,
            } => s
                .field("kind", &"nest")
                .field("path", path)
                .field("component", component)
                .field("redirect_child", redirect_child)
                .field("children", children),
        };
        s.field("name", &self.hooks.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{params, ParamValue};
    use serde_json::json;

    #[test]
    fn test_with_component_on_nest() {
        let def = RouteDefinition::nest("/a", vec![]).with_component("Layout");
        match def.variant {
            RouteVariant::Nest { component: Some(ComponentSource::Ready(c)), .. } => {
                assert_eq!(c.name(), "Layout");
            }
            _ => panic!("expected a nest with a ready component"),
        }
    }

    #[test]
    fn test_redirect_child_ignored_outside_nest() {
        let def = RouteDefinition::route("/a", "A").with_redirect_child("b");
        assert!(matches!(def.variant, RouteVariant::Normal { .. }));
    }

    #[test]
    fn test_substitute_keeps_literals() {
        let p = params([("slug", ParamValue::from("intro"))]);
        assert_eq!(substitute_params("/docs/:slug", &p), "/docs/intro");
        assert_eq!(substitute_params("docs/:slug", &p), "docs/intro");
        assert_eq!(substitute_params("/", &p), "/");
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = Resolver::Value(json!({"title": "Home"}));
        let value = resolver.resolve(ResolveContext::default()).await.unwrap();
        assert_eq!(value["title"], "Home");
    }

    #[tokio::test]
    async fn test_fn_resolver_sees_params() {
        let resolver = Resolver::from_fn(|ctx: ResolveContext| async move {
            Ok(json!(ctx.params.get("id").and_then(|v| v.as_num())))
        });
        let ctx = ResolveContext {
            params: params([("id", ParamValue::Num(9))]),
            ..ResolveContext::default()
        };
        assert_eq!(resolver.resolve(ctx).await.unwrap(), json!(9));
    }

    #[test]
    fn test_guard_decision_from_bool() {
        assert_eq!(GuardDecision::from(true), GuardDecision::Allow);
        assert_eq!(GuardDecision::from(false), GuardDecision::Deny);
    }
}
