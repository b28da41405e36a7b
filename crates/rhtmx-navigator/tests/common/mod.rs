//! Recording test doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rhtmx_navigator::route::RouteDefinition;
use rhtmx_navigator::{
    MemoryHistory, NavigationError, Navigator, NavigatorConfig, OutletContent, OutletView,
};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn clear(log: &Log) {
    log.lock().unwrap().clear();
}

/// Outlet appending `render[depth] Component`, `destroy[depth]` and
/// `error[depth] message` entries to a shared log
pub struct RecordingOutlet {
    pub depth: usize,
    pub log: Log,
    pub error_slot: bool,
}

impl OutletView for RecordingOutlet {
    fn render(&self, content: Option<&OutletContent>) {
        let name = match content {
            Some(content) => content
                .component
                .as_ref()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<outlet>".to_string()),
            None => "<none>".to_string(),
        };
        self.log
            .lock()
            .unwrap()
            .push(format!("render[{}] {}", self.depth, name));
    }

    fn destroy(&self) {
        self.log.lock().unwrap().push(format!("destroy[{}]", self.depth));
    }

    fn render_error(&self, error: &NavigationError) -> bool {
        if self.error_slot {
            self.log
                .lock()
                .unwrap()
                .push(format!("error[{}] {}", self.depth, error));
        }
        self.error_slot
    }
}

pub struct Harness {
    pub navigator: Navigator,
    pub history: Arc<MemoryHistory>,
    pub log: Log,
}

impl Harness {
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        Self::with_config(routes, NavigatorConfig::default())
    }

    pub fn with_config(routes: Vec<RouteDefinition>, config: NavigatorConfig) -> Self {
        let history = Arc::new(MemoryHistory::new(config.base_href.clone()));
        let navigator = Navigator::new(routes, history.clone(), config).unwrap();
        Self {
            navigator,
            history,
            log: new_log(),
        }
    }

    /// Registers a recording outlet at 1-based `depth`
    pub fn mount(&self, depth: usize) {
        self.mount_with(depth, false);
    }

    pub fn mount_with(&self, depth: usize, error_slot: bool) {
        let outlet = Arc::new(RecordingOutlet {
            depth,
            log: Arc::clone(&self.log),
            error_slot,
        });
        self.navigator.register_view(outlet, depth).unwrap();
    }

    pub fn log(&self) -> Vec<String> {
        entries(&self.log)
    }

    pub fn clear_log(&self) {
        clear(&self.log);
    }

    /// Pattern of the innermost committed route
    pub fn current_pattern(&self) -> Option<String> {
        self.navigator
            .current_route()
            .ok()
            .map(|r| r.pattern().to_string())
    }
}
