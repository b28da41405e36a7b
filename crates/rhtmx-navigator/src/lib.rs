//! # RHTMX Navigator
//!
//! A client-side navigation engine with support for:
//! - Literal, named (`/users/:name`), numeric (`/users/:id<num>`) and
//!   wildcard (`/docs/*`) segments
//! - Nested routes rendered into a tree of outlets, with index and redirect
//!   routes
//! - Async enter/leave guards and per-route data resolvers
//! - Reactive query and parameter maps, mutated key by key
//! - Stale-navigation cancellation: only the latest navigation commits
//!
//! ## Navigation Pipeline
//!
//! Every location change runs through the same steps:
//! 1. **Match** the pathname against the compiled route tree (first match wins)
//! 2. **Redirect** if the terminal route says so
//! 3. **Diff** the new chain against the committed one
//! 4. **Guard** the routes being left and entered (sequential)
//! 5. **Resolve** data and lazy components per level (concurrent)
//! 6. **Commit**: tear down stale outlets, update reactive state, render
//!
//! A generation counter is checked after every suspension point, so an
//! overtaken navigation never applies anything.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rhtmx_navigator::history::MemoryHistory;
//! use rhtmx_navigator::route::RouteDefinition;
//! use rhtmx_navigator::{Destination, Navigator, NavigatorConfig, ParamValue};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let navigator = Navigator::new(
//!     vec![RouteDefinition::nest(
//!         "/users",
//!         vec![
//!             RouteDefinition::index("UserList"),
//!             RouteDefinition::route("/:id<num>", "UserDetail").with_name("user"),
//!         ],
//!     )],
//!     Arc::new(MemoryHistory::new("/users/42")),
//!     NavigatorConfig::default(),
//! )
//! .unwrap();
//!
//! navigator.sync_from_history().await.unwrap();
//! let depth1 = navigator.params(1).unwrap();
//! assert_eq!(depth1.get("id"), Some(ParamValue::Num(42)));
//!
//! let href = navigator.href(&Destination::named("user").param("id", 7u64)).unwrap();
//! assert_eq!(href, "/users/7");
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
pub mod error;
pub mod history;
pub mod location;
pub mod navigator;
pub mod observable;
pub mod outlet;
pub mod params;
pub mod path;
pub mod query;
pub mod route;

pub use config::{NavigatorConfig, UnmatchedPolicy};
pub use error::{NavigationError, RouteError};
pub use history::{History, MemoryHistory, PopState};
pub use location::Location;
pub use navigator::{
    AfterHook, ChangeListener, Destination, ListenerId, NavigateOptions, NavigationOutcome,
    Navigator,
};
pub use observable::{ObservableMap, SubscriptionId};
pub use outlet::{OutletContent, OutletView, SharedView};
pub use params::{params, ParamValue, Params, Query};
pub use path::normalize_path;
pub use query::{encode_query, parse_query};
pub use route::{GuardDecision, RouteDefinition};

/// Locks a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
