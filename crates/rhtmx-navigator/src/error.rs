//! Error taxonomy for route compilation and navigation

use thiserror::Error;

/// Route tree compilation failures
///
/// All of these are fatal: a route tree that fails to compile aborts
/// navigator construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("more than one index route under `{parent}`")]
    DuplicateIndexRoute { parent: String },

    #[error("route name `{name}` is declared more than once")]
    DuplicateRouteName { name: String },
}

/// Runtime navigation failures
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Outlets must register top-down and contiguously
    #[error("outlet registered at depth {depth} while {registered} outlet(s) are mounted")]
    BadNesting { depth: usize, registered: usize },

    #[error("no route matched `{path}`")]
    NoRouteMatched { path: String },

    #[error("resolver `{key}` of route `{route}` failed")]
    Resolve {
        route: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("component loader of route `{route}` failed")]
    ComponentLoad {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("redirect resolution of route `{route}` failed")]
    RedirectResolve {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("navigation to `{path}` exceeded {limit} redirects")]
    RedirectLoop { path: String, limit: usize },

    #[error("no route is named `{name}`")]
    UnknownRouteName { name: String },

    #[error("route `{route}` requires parameter `{param}`")]
    MissingParam { route: String, param: String },
}

impl NavigationError {
    /// Whether this error indicates a programming bug rather than a
    /// recoverable navigation condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, NavigationError::BadNesting { .. })
    }
}
