//! Navigation state machine
//!
//! A [`Navigator`] owns the compiled route tree and the navigation state:
//! the committed match chain, per-depth resolves, the reactive query map,
//! the stack of reactive per-depth parameter maps and the mounted outlets.
//! Every location change goes through [`Navigator::update_location`], which
//! matches, runs guards and resolvers, and commits atomically unless a newer
//! navigation started in the meantime.

mod destination;
mod transition;

pub use destination::Destination;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::NavigatorConfig;
use crate::error::{NavigationError, RouteError};
use crate::history::History;
use crate::location::Location;
use crate::lock;
use crate::observable::ObservableMap;
use crate::outlet::{OutletContent, OutletRegistry, SharedView};
use crate::params::Params;
use crate::path::{join_base, normalize_path, split_href};
use crate::route::{compile_routes, CompiledRoute, GuardFn, MatchChain, Resolves, RouteDefinition, RouteTree};

/// Listener notified after every committed navigation
pub type ChangeListener = Arc<dyn Fn(&Location) + Send + Sync>;

/// Hook run after every committed navigation with `(from, to)`
pub type AfterHook = Arc<dyn Fn(&Location, &Location) + Send + Sync>;

/// Handle returned by [`Navigator::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// How [`Navigator::navigate`] writes history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Overwrite the current entry instead of pushing a new one
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// How a navigation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The new chain (or query) was committed
    Committed,
    /// History was replaced with this app-local href
    Redirected(String),
    /// A guard refused; the URL was rolled back
    Denied,
    /// A newer navigation started; nothing was applied
    Superseded,
    /// No route matched the location
    Unmatched,
}

/// Committed navigation state
#[derive(Default)]
pub(crate) struct State {
    pub(crate) location: Location,
    /// Accumulated resolves per chain index (ancestors merged in)
    pub(crate) resolves: Vec<Resolves>,
    pub(crate) params: Vec<Arc<ObservableMap>>,
    pub(crate) outlets: OutletRegistry,
    pub(crate) has_committed: bool,
}

impl State {
    /// Content for the outlet rendering chain element `index`
    pub(crate) fn content_at(&self, index: usize) -> Option<OutletContent> {
        let matched = self.location.chain.get(index)?;
        Some(OutletContent {
            depth: index,
            route: Arc::clone(&matched.route),
            component: matched.route.component(),
            params: Arc::clone(self.params.get(index)?),
            resolves: self.resolves.get(index).cloned().unwrap_or_default(),
        })
    }
}

pub(crate) struct NavigationCore {
    pub(crate) config: NavigatorConfig,
    pub(crate) routes: RouteTree,
    pub(crate) history: Arc<dyn History>,
    pub(crate) generation: AtomicU64,
    pub(crate) state: Mutex<State>,
    pub(crate) query: Arc<ObservableMap>,
    pub(crate) listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
    pub(crate) before_each: Mutex<Vec<GuardFn>>,
    pub(crate) after_each: Mutex<Vec<AfterHook>>,
    /// Serializes the view and reactive effects of commits
    pub(crate) effects: Mutex<()>,
    next_listener: AtomicU64,
}

/// Client-side navigation engine
///
/// Cheap to clone; clones share the same state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rhtmx_navigator::history::MemoryHistory;
/// use rhtmx_navigator::route::RouteDefinition;
/// use rhtmx_navigator::{NavigateOptions, NavigationOutcome, Navigator, NavigatorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let navigator = Navigator::new(
///     vec![
///         RouteDefinition::route("/", "Home"),
///         RouteDefinition::route("/users/:id<num>", "User").with_name("user"),
///     ],
///     Arc::new(MemoryHistory::new("/")),
///     NavigatorConfig::default(),
/// )
/// .unwrap();
///
/// let outcome = navigator.navigate("/users/7", NavigateOptions::default()).await.unwrap();
/// assert_eq!(outcome, NavigationOutcome::Committed);
/// assert_eq!(navigator.current_route().unwrap().name(), Some("user"));
/// # }
/// ```
#[derive(Clone)]
pub struct Navigator {
    pub(crate) core: Arc<NavigationCore>,
}

impl Navigator {
    /// Compiles `routes` and creates a navigator
    ///
    /// No navigation happens until [`sync_from_history`](Self::sync_from_history),
    /// [`navigate`](Self::navigate) or [`update_location`](Self::update_location)
    /// is called.
    pub fn new(
        routes: Vec<RouteDefinition>,
        history: Arc<dyn History>,
        config: NavigatorConfig,
    ) -> Result<Self, RouteError> {
        let routes = compile_routes(routes)?;
        let config = NavigatorConfig {
            base_href: normalize_path(&config.base_href).into_owned(),
            ..config
        };
        debug!(routes = routes.len(), base_href = %config.base_href, "navigator created");

        Ok(Self {
            core: Arc::new(NavigationCore {
                config,
                routes,
                history,
                generation: AtomicU64::new(0),
                state: Mutex::new(State::default()),
                query: Arc::new(ObservableMap::new()),
                listeners: Mutex::new(Vec::new()),
                before_each: Mutex::new(Vec::new()),
                after_each: Mutex::new(Vec::new()),
                effects: Mutex::new(()),
                next_listener: AtomicU64::new(0),
            }),
        })
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.core.config
    }

    pub fn routes(&self) -> &RouteTree {
        &self.core.routes
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.core.history
    }

    // ========================================================================
    // Programmatic navigation
    // ========================================================================

    /// Navigates to an app-local href (base href not included)
    ///
    /// History is written synchronously before any guard or resolver runs;
    /// redirects are then followed up to `max_redirects`.
    pub async fn navigate(
        &self,
        href: &str,
        options: NavigateOptions,
    ) -> Result<NavigationOutcome, NavigationError> {
        let (pathname, search) = split_href(href);
        let mut full = join_base(&self.core.config.base_href, &normalize_path(pathname));
        if !search.is_empty() {
            full.push('?');
            full.push_str(search);
        }

        if options.replace {
            self.core.history.replace_state(&full);
        } else {
            self.core.history.push_state(&full);
        }

        self.sync_from_history().await
    }

    /// Applies the history's current location, following redirects
    pub async fn sync_from_history(&self) -> Result<NavigationOutcome, NavigationError> {
        let limit = self.core.config.max_redirects;
        let mut redirects = 0;

        loop {
            let pathname = self.core.history.current_pathname();
            let search = self.core.history.current_search();

            match self.update_location(&pathname, Some(&search)).await? {
                NavigationOutcome::Redirected(target) => {
                    redirects += 1;
                    if redirects > limit {
                        return Err(NavigationError::RedirectLoop {
                            path: target,
                            limit,
                        });
                    }
                }
                outcome => return Ok(outcome),
            }
        }
    }

    /// Moves `delta` entries through history, like the browser's `history.go`
    ///
    /// The move is applied by the [`listen`](Self::listen) task once the
    /// popstate event arrives. Returns `false` when history cannot move.
    pub fn go(&self, delta: isize) -> bool {
        self.core.history.go(delta)
    }

    /// Spawns a task applying every popstate event of the history
    ///
    /// The task ends when the history's popstate channel closes.
    pub fn listen(&self) -> JoinHandle<()> {
        let navigator = self.clone();
        let mut popstate = self.core.history.subscribe();

        tokio::spawn(async move {
            loop {
                match popstate.recv().await {
                    Ok(event) => {
                        debug!(pathname = %event.pathname, "popstate");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "popstate events dropped, syncing to latest");
                    }
                    Err(RecvError::Closed) => break,
                }
                if let Err(err) = navigator.sync_from_history().await {
                    warn!(error = %err, "popstate navigation failed");
                }
            }
        })
    }

    // ========================================================================
    // Outlets
    // ========================================================================

    /// Mounts an outlet at 1-based `depth` and renders the committed chain
    /// element for it, if any
    ///
    /// # Errors
    ///
    /// [`NavigationError::BadNesting`] when outlets are registered out of
    /// order.
    pub fn register_view(&self, view: SharedView, depth: usize) -> Result<(), NavigationError> {
        let content = {
            let mut state = lock(&self.core.state);
            state.outlets.register(Arc::clone(&view), depth)?;
            state.content_at(depth - 1)
        };

        if let Some(content) = content {
            view.render(Some(&content));
        }
        Ok(())
    }

    /// Unmounts the outlet at 1-based `depth` and every outlet below it
    pub fn deregister_view(&self, depth: usize) {
        let removed = lock(&self.core.state).outlets.deregister(depth);
        if !removed.is_empty() {
            debug!(depth, removed = removed.len(), "outlets deregistered");
        }
    }

    pub fn outlet_count(&self) -> usize {
        lock(&self.core.state).outlets.len()
    }

    // ========================================================================
    // Hooks and listeners
    // ========================================================================

    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Location) + Send + Sync + 'static,
    {
        let id = ListenerId(self.core.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.core.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns whether the listener existed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.core.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Adds a global guard run before every route change
    pub fn before_each(&self, guard: GuardFn) {
        lock(&self.core.before_each).push(guard);
    }

    /// Adds a global hook run after every committed navigation
    pub fn after_each<F>(&self, hook: F)
    where
        F: Fn(&Location, &Location) + Send + Sync + 'static,
    {
        lock(&self.core.after_each).push(Arc::new(hook));
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The committed location
    pub fn location(&self) -> Location {
        lock(&self.core.state).location.clone()
    }

    pub fn current_chain(&self) -> MatchChain {
        lock(&self.core.state).location.chain.clone()
    }

    /// Innermost committed route
    pub fn current_route(&self) -> Result<Arc<CompiledRoute>, NavigationError> {
        let state = lock(&self.core.state);
        state
            .location
            .route()
            .cloned()
            .ok_or_else(|| NavigationError::NoRouteMatched {
                path: state.location.pathname.clone(),
            })
    }

    /// Reactive query map
    pub fn query(&self) -> Arc<ObservableMap> {
        Arc::clone(&self.core.query)
    }

    /// Reactive parameters of chain element `index` (0 = outermost)
    pub fn params(&self, index: usize) -> Option<Arc<ObservableMap>> {
        lock(&self.core.state).params.get(index).cloned()
    }

    /// Resolved data of chain element `index`, ancestors merged in
    pub fn resolves(&self, index: usize) -> Option<Resolves> {
        lock(&self.core.state).resolves.get(index).cloned()
    }

    /// Whether a route named `name` is in the committed chain with every
    /// given parameter equal
    ///
    /// Used for active-link styling.
    pub fn is_active(&self, name: &str, params: &Params) -> bool {
        let state = lock(&self.core.state);
        state.location.chain.iter().any(|matched| {
            matched.route.name() == Some(name)
                && params.iter().all(|(k, v)| matched.params.get(k) == Some(v))
        })
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.core.generation.load(Ordering::SeqCst) == generation
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.core.state);
        f.debug_struct("Navigator")
            .field("base_href", &self.core.config.base_href)
            .field("location", &state.location.href())
            .field("chain", &state.location.chain.len())
            .field("outlets", &state.outlets.len())
            .field("generation", &self.core.generation.load(Ordering::SeqCst))
            .finish()
    }
}
