//! Outlet registry
//!
//! Outlets are the mount points of nested views. Depth `1` is the outermost
//! outlet, rendering the first element of the match chain; depth `n` renders
//! element `n - 1`. Outlets must register top-down and contiguously.

use std::fmt;
use std::sync::Arc;

use crate::error::NavigationError;
use crate::observable::ObservableMap;
use crate::route::{CompiledRoute, Resolves, SharedComponent};

/// What an outlet is asked to render
#[derive(Clone)]
pub struct OutletContent {
    /// Index in the match chain (0 = outermost)
    pub depth: usize,
    pub route: Arc<CompiledRoute>,
    /// `None` for a component-less nest: render a bare nested outlet
    pub component: Option<SharedComponent>,
    /// Reactive parameters for this depth (merged with ancestors)
    pub params: Arc<ObservableMap>,
    pub resolves: Resolves,
}

impl fmt::Debug for OutletContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutletContent")
            .field("depth", &self.depth)
            .field("route", &self.route.pattern())
            .field("component", &self.component.as_ref().map(|c| c.name().to_string()))
            .field("params", &self.params.snapshot())
            .field("resolves", &self.resolves)
            .finish()
    }
}

/// A mounted view slot, implemented by the host UI layer
pub trait OutletView: Send + Sync {
    /// Renders `content`, or a placeholder when `None`
    fn render(&self, content: Option<&OutletContent>);

    /// Called when the outlet's route is left
    fn destroy(&self) {}

    /// Renders a navigation error; returns `false` if the view has no error
    /// slot
    fn render_error(&self, _error: &NavigationError) -> bool {
        false
    }
}

pub type SharedView = Arc<dyn OutletView>;

/// Mounted outlets, outermost first
#[derive(Default)]
pub struct OutletRegistry {
    views: Vec<SharedView>,
}

impl OutletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Outlet rendering chain element `index`
    pub fn get(&self, index: usize) -> Option<&SharedView> {
        self.views.get(index)
    }

    /// Mounts `view` at 1-based `depth`
    ///
    /// # Errors
    ///
    /// [`NavigationError::BadNesting`] unless exactly `depth - 1` outlets are
    /// already mounted.
    pub fn register(&mut self, view: SharedView, depth: usize) -> Result<(), NavigationError> {
        if depth == 0 || depth - 1 != self.views.len() {
            return Err(NavigationError::BadNesting {
                depth,
                registered: self.views.len(),
            });
        }
        self.views.push(view);
        Ok(())
    }

    /// Unmounts the outlet at 1-based `depth` and everything below it
    ///
    /// Returns the removed outlets; a no-op when fewer are mounted.
    pub fn deregister(&mut self, depth: usize) -> Vec<SharedView> {
        self.split_off(depth.saturating_sub(1))
    }

    /// Removes outlets from chain index `index` onward
    pub(crate) fn split_off(&mut self, index: usize) -> Vec<SharedView> {
        if index >= self.views.len() {
            return Vec::new();
        }
        self.views.split_off(index)
    }
}

impl fmt::Debug for OutletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutletRegistry")
            .field("mounted", &self.views.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl OutletView for Noop {
        fn render(&self, _content: Option<&OutletContent>) {}
    }

    fn view() -> SharedView {
        Arc::new(Noop)
    }

    #[test]
    fn test_contiguous_registration() {
        let mut registry = OutletRegistry::new();
        registry.register(view(), 1).unwrap();
        registry.register(view(), 2).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_out_of_order_registration() {
        let mut registry = OutletRegistry::new();
        let err = registry.register(view(), 2).unwrap_err();
        assert!(matches!(err, NavigationError::BadNesting { depth: 2, registered: 0 }));
        assert!(err.is_fatal());

        assert!(registry.register(view(), 0).is_err());
    }

    #[test]
    fn test_deregister_truncates() {
        let mut registry = OutletRegistry::new();
        (1..=3).for_each(|d| registry.register(view(), d).unwrap());

        assert_eq!(registry.deregister(2).len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.deregister(5).is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_error_slot_is_absent() {
        let err = NavigationError::NoRouteMatched { path: "/x".into() };
        assert!(!Noop.render_error(&err));
    }
}
