//! The `update_location` pipeline
//!
//! match → redirect → leave guards → enter guards → resolve → commit
//!
//! Each suspension point is followed by a generation check; a navigation
//! that is no longer the latest returns [`NavigationOutcome::Superseded`]
//! without touching any state. Commit happens under the state lock, and the
//! resulting view callbacks and reactive notifications run after it is
//! released.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::{try_join, try_join_all};
use tracing::{debug, error, info, warn};

use crate::config::UnmatchedPolicy;
use crate::error::NavigationError;
use crate::location::Location;
use crate::lock;
use crate::observable::ObservableMap;
use crate::outlet::{OutletContent, SharedView};
use crate::params::{Params, Query};
use crate::path::{join_base, normalize_path, split_href, split_segments, strip_base};
use crate::query::parse_query;
use crate::route::{
    match_routes, substitute_params, GuardDecision, GuardFn, MatchChain, MatchedRoute,
    RedirectTarget, ResolveContext, Resolves, RouteKind,
};

use super::{AfterHook, ChangeListener, NavigationOutcome, Navigator};

/// Length of the shared prefix of two chains
///
/// Elements are shared when they refer to the same compiled route. Unless
/// `reuse_nested` is set, the prefix ends right after the first shared
/// element whose params changed, so everything nested below it re-renders.
pub(crate) fn common_prefix(prev: &[MatchedRoute], next: &[MatchedRoute], reuse_nested: bool) -> usize {
    let mut common = 0;
    for (a, b) in prev.iter().zip(next) {
        if !a.same_route(b) {
            break;
        }
        common += 1;
        if !reuse_nested && a.params != b.params {
            break;
        }
    }
    common
}

/// Index of the first chain element that must be guarded and resolved again
///
/// That is the first shared element whose params changed, or `common` when
/// every shared element kept its params. A re-parameterized element keeps its
/// outlet and its reactive param map but its data is resolved again.
pub(crate) fn first_entered(prev: &[MatchedRoute], next: &[MatchedRoute], common: usize) -> usize {
    prev.iter()
        .zip(next)
        .take(common)
        .position(|(a, b)| a.params != b.params)
        .unwrap_or(common)
}

/// Effects of a commit, applied once the state lock is released
struct Commit {
    from: Location,
    to: Location,
    destroyed: Vec<SharedView>,
    released: Vec<Arc<ObservableMap>>,
    param_updates: Vec<(Arc<ObservableMap>, Params)>,
    render: Option<(SharedView, Option<OutletContent>)>,
    listeners: Vec<ChangeListener>,
    after_each: Vec<AfterHook>,
}

impl Navigator {
    /// Applies a new location
    ///
    /// `pathname` may include the base href; `search` replaces the query when
    /// given and keeps the current one otherwise.
    ///
    /// # Errors
    ///
    /// Resolver, component loader and redirect function failures. They are
    /// reported only while the navigation is still the latest, and the
    /// committed chain is never modified.
    pub async fn update_location(
        &self,
        pathname: &str,
        search: Option<&str>,
    ) -> Result<NavigationOutcome, NavigationError> {
        let generation = self.core.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let normalized = normalize_path(pathname);
        let local = strip_base(&normalized, &self.core.config.base_href).to_string();
        debug!(generation, pathname = %local, "navigation started");

        let from = lock(&self.core.state).location.clone();
        let raw_search = search.map(str::to_string).unwrap_or_else(|| from.search());
        let query = match search {
            Some(search) => parse_query(search),
            None => from.query.clone(),
        };

        let matched = match_routes(&local, self.core.routes.routes(), self.core.config.match_options());
        let unmatched = matched.is_none();
        let mut chain = match matched {
            Some(chain) => chain,
            None => {
                let err = NavigationError::NoRouteMatched { path: local.clone() };
                warn!(generation, error = %err, "navigation target unmatched");
                match self.core.config.unmatched {
                    UnmatchedPolicy::Keep => return Ok(NavigationOutcome::Unmatched),
                    UnmatchedPolicy::Clear => MatchChain::new(),
                }
            }
        };

        if let Some(terminal) = chain.last().cloned() {
            match terminal.route.kind() {
                RouteKind::Redirect => {
                    let target = match self.redirect_target(&terminal, &query).await {
                        _ if !self.is_current(generation) => {
                            return Ok(self.superseded(generation));
                        }
                        Ok(target) => target,
                        Err(err) => {
                            error!(generation, error = %err, "redirect resolution failed");
                            return Err(err);
                        }
                    };
                    return Ok(self.redirect(generation, &local, &target, &raw_search));
                }
                RouteKind::Nest => {
                    if let Some(child) = terminal.route.redirect_child() {
                        let target = if local == "/" {
                            format!("/{}", child)
                        } else {
                            format!("{}/{}", local, child)
                        };
                        return Ok(self.redirect(generation, &local, &target, &raw_search));
                    }
                    let index = terminal
                        .route
                        .children()
                        .first()
                        .filter(|child| child.kind() == RouteKind::Index);
                    if let Some(index) = index {
                        chain.push(MatchedRoute {
                            route: Arc::clone(index),
                            params: terminal.params.clone(),
                            start: split_segments(&local).len(),
                        });
                    }
                }
                RouteKind::Normal | RouteKind::Index => {}
            }
        }

        let common = common_prefix(
            &from.chain,
            &chain,
            self.core.config.reuse_nested_on_param_change,
        );
        let entered = first_entered(&from.chain, &chain, common);
        let chain_changed = entered < from.chain.len() || entered < chain.len();
        let to = Location::new(local, query, chain);

        let mut resolves: Vec<Resolves> = lock(&self.core.state)
            .resolves
            .iter()
            .take(entered)
            .cloned()
            .collect();

        if chain_changed {
            let mut leave: Vec<GuardFn> = lock(&self.core.before_each).clone();
            if let Some(on_leave) = from.chain.get(entered).and_then(|m| m.route.on_leave()) {
                leave.push(Arc::clone(on_leave));
            }
            if let Some(outcome) = self.run_guards(generation, leave, &from, &to).await {
                return Ok(outcome);
            }

            let enter: Vec<GuardFn> = to.chain[entered..]
                .iter()
                .filter_map(|m| m.route.on_enter().cloned())
                .collect();
            if let Some(outcome) = self.run_guards(generation, enter, &from, &to).await {
                return Ok(outcome);
            }

            for matched in &to.chain[entered..] {
                let parent = resolves.last().cloned().unwrap_or_default();
                match resolve_level(matched, &to.query, parent).await {
                    _ if !self.is_current(generation) => return Ok(self.superseded(generation)),
                    Ok(level) => resolves.push(level),
                    Err(err) => return Err(self.fail(generation, entered, err)),
                }
            }
        }

        let Some(commit) = self.commit(generation, common, from, to.clone(), resolves) else {
            return Ok(self.superseded(generation));
        };
        if !self.apply(generation, commit) {
            return Ok(self.superseded(generation));
        }

        if unmatched {
            Ok(NavigationOutcome::Unmatched)
        } else {
            debug!(generation, pathname = %to.pathname, "navigation committed");
            Ok(NavigationOutcome::Committed)
        }
    }

    async fn redirect_target(
        &self,
        terminal: &MatchedRoute,
        query: &Query,
    ) -> Result<String, NavigationError> {
        match terminal.route.redirect_to() {
            Some(RedirectTarget::Path(path)) => Ok(substitute_params(path, &terminal.params)),
            Some(RedirectTarget::Resolve(f)) => {
                let ctx = ResolveContext {
                    params: terminal.params.clone(),
                    query: query.clone(),
                    parent_resolves: Resolves::new(),
                };
                f(ctx).await.map_err(|source| NavigationError::RedirectResolve {
                    route: terminal.route.pattern().to_string(),
                    source,
                })
            }
            None => Ok("/".to_string()),
        }
    }

    /// Replaces history with `target` (an app-local href), keeping the
    /// current search unless the target carries its own
    fn redirect(&self, generation: u64, from: &str, target: &str, search: &str) -> NavigationOutcome {
        let (pathname, target_search) = split_href(target);
        let search = if target_search.is_empty() { search } else { target_search };

        let mut href = normalize_path(pathname).into_owned();
        if !search.is_empty() {
            href.push('?');
            href.push_str(search);
        }

        let full = join_base(&self.core.config.base_href, &href);
        info!(generation, from, to = %href, "redirecting");
        self.core.history.replace_state(&full);
        NavigationOutcome::Redirected(href)
    }

    /// Runs guards in order; returns the outcome if the navigation stops
    async fn run_guards(
        &self,
        generation: u64,
        guards: Vec<GuardFn>,
        from: &Location,
        to: &Location,
    ) -> Option<NavigationOutcome> {
        for guard in guards {
            let decision = guard(from.clone(), to.clone()).await;
            if !self.is_current(generation) {
                return Some(self.superseded(generation));
            }
            if decision == GuardDecision::Deny {
                return Some(self.deny(generation, from, to));
            }
        }
        None
    }

    /// Rolls the URL back to the committed location
    fn deny(&self, generation: u64, from: &Location, to: &Location) -> NavigationOutcome {
        info!(generation, from = %from.pathname, to = %to.pathname, "navigation denied by guard");
        if lock(&self.core.state).has_committed {
            let full = join_base(&self.core.config.base_href, &from.pathname);
            let search = from.search();
            let href = if search.is_empty() { full } else { format!("{}?{}", full, search) };
            self.core.history.replace_state(&href);
        }
        NavigationOutcome::Denied
    }

    fn superseded(&self, generation: u64) -> NavigationOutcome {
        debug!(
            generation,
            latest = self.core.generation.load(Ordering::SeqCst),
            "navigation superseded"
        );
        NavigationOutcome::Superseded
    }

    /// Reports a failure into the error slot of the outlet at chain index
    /// `index`
    fn fail(&self, generation: u64, index: usize, err: NavigationError) -> NavigationError {
        let view = lock(&self.core.state).outlets.get(index).cloned();
        let handled = view.is_some_and(|view| view.render_error(&err));
        if !handled {
            error!(generation, error = %err, "navigation failed");
        }
        err
    }

    /// Swaps in the new state; `None` if superseded
    fn commit(
        &self,
        generation: u64,
        common: usize,
        from: Location,
        to: Location,
        resolves: Vec<Resolves>,
    ) -> Option<Commit> {
        let mut state = lock(&self.core.state);
        if !self.is_current(generation) {
            return None;
        }

        let prev_len = state.location.chain.len();
        let destroyed: Vec<SharedView> = (common..prev_len)
            .rev()
            .filter_map(|index| state.outlets.get(index).cloned())
            .collect();
        state.outlets.split_off(common + 1);

        let released = if state.params.len() > to.chain.len() {
            state.params.split_off(to.chain.len())
        } else {
            Vec::new()
        };
        let param_updates = state
            .params
            .iter()
            .zip(&to.chain)
            .map(|(map, matched)| (Arc::clone(map), matched.params.clone()))
            .collect();
        let kept = state.params.len();
        for matched in &to.chain[kept..] {
            state
                .params
                .push(Arc::new(ObservableMap::with_values(matched.params.clone())));
        }

        state.location = to.clone();
        state.resolves = resolves;
        state.has_committed = true;

        let render = if to.chain.is_empty() {
            state.outlets.get(0).map(|view| (Arc::clone(view), None))
        } else if common < to.chain.len() {
            let content = state.content_at(common);
            state
                .outlets
                .get(common)
                .map(|view| (Arc::clone(view), content))
        } else {
            None
        };

        Some(Commit {
            from,
            to,
            destroyed,
            released,
            param_updates,
            render,
            listeners: lock(&self.core.listeners)
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect(),
            after_each: lock(&self.core.after_each).clone(),
        })
    }

    /// Runs the commit's effects; `false` if a newer navigation overtook it
    ///
    /// Outlets removed from the registry are always destroyed and dropped
    /// param maps always released. Every other effect group is skipped once
    /// the generation moved on. Destroy, reactive and render groups of
    /// different navigations never interleave.
    fn apply(&self, generation: u64, commit: Commit) -> bool {
        {
            let _effects = lock(&self.core.effects);
            commit.destroyed.iter().for_each(|view| view.destroy());
            commit.released.iter().for_each(|map| map.release());
            if !self.is_current(generation) {
                return false;
            }
            self.core.query.replace_all(&commit.to.query);
            for (map, params) in &commit.param_updates {
                map.replace_all(params);
            }
        }

        if !self.is_current(generation) {
            return false;
        }
        commit.listeners.iter().for_each(|listener| listener(&commit.to));

        if let Some((view, content)) = &commit.render {
            let _effects = lock(&self.core.effects);
            if !self.is_current(generation) {
                return false;
            }
            view.render(content.as_ref());
        }

        if !self.is_current(generation) {
            return false;
        }
        commit
            .after_each
            .iter()
            .for_each(|hook| hook(&commit.from, &commit.to));
        true
    }
}

/// Runs every resolver of one level plus its component loader concurrently
///
/// Returns the level's resolves merged over `parent`.
async fn resolve_level(
    matched: &MatchedRoute,
    query: &Query,
    parent: Resolves,
) -> Result<Resolves, NavigationError> {
    let ctx = ResolveContext {
        params: matched.params.clone(),
        query: query.clone(),
        parent_resolves: parent.clone(),
    };
    let pattern = matched.route.pattern().to_string();

    let resolvers = matched.route.resolvers().iter().map(|(key, resolver)| {
        let pending = resolver.resolve(ctx.clone());
        let key = key.clone();
        let route = pattern.clone();
        async move {
            match pending.await {
                Ok(value) => Ok((key, value)),
                Err(source) => Err(NavigationError::Resolve { route, key, source }),
            }
        }
    });

    let route = Arc::clone(&matched.route);
    let loader = async move {
        route
            .load_component()
            .await
            .map_err(|source| NavigationError::ComponentLoad {
                route: route.pattern().to_string(),
                source,
            })
    };

    let (values, _component) = try_join(try_join_all(resolvers), loader).await?;

    let mut merged = parent;
    merged.extend(values);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::route::{compile_routes, MatchOptions, RouteDefinition, RouteTree};

    fn tree() -> RouteTree {
        compile_routes(vec![RouteDefinition::nest(
            "/a/:id",
            vec![
                RouteDefinition::route("/x", "X"),
                RouteDefinition::route("/y", "Y"),
            ],
        )])
        .unwrap()
    }

    fn chain(tree: &RouteTree, path: &str) -> MatchChain {
        match_routes(path, tree.routes(), MatchOptions::default()).unwrap()
    }

    #[test]
    fn test_common_prefix_identical() {
        let tree = tree();
        let a = chain(&tree, "/a/1/x");
        assert_eq!(common_prefix(&a, &a.clone(), false), 2);
    }

    #[test]
    fn test_common_prefix_sibling_change() {
        let tree = tree();
        assert_eq!(common_prefix(&chain(&tree, "/a/1/x"), &chain(&tree, "/a/1/y"), false), 1);
    }

    #[test]
    fn test_common_prefix_param_change() {
        let tree = tree();
        let prev = chain(&tree, "/a/1/x");
        let next = chain(&tree, "/a/2/x");
        assert_eq!(common_prefix(&prev, &next, false), 1);
        assert_eq!(common_prefix(&prev, &next, true), 2);
        assert_eq!(next[0].params.get("id"), Some(&ParamValue::from("2")));
    }

    #[test]
    fn test_first_entered() {
        let tree = tree();
        let prev = chain(&tree, "/a/1/x");
        let same = chain(&tree, "/a/1/y");
        let moved = chain(&tree, "/a/2/x");
        assert_eq!(first_entered(&prev, &same, common_prefix(&prev, &same, false)), 1);
        assert_eq!(first_entered(&prev, &moved, common_prefix(&prev, &moved, false)), 0);
        assert_eq!(first_entered(&prev, &moved, common_prefix(&prev, &moved, true)), 0);
        assert_eq!(first_entered(&prev, &prev.clone(), 2), 2);
    }

    #[test]
    fn test_common_prefix_from_empty() {
        let tree = tree();
        assert_eq!(common_prefix(&[], &chain(&tree, "/a/1/x"), false), 0);
    }
}
