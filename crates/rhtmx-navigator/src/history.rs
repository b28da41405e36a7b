//! History adapter
//!
//! The navigator reads and writes the location through the [`History`]
//! trait and learns about back/forward navigation from its popstate
//! channel. [`MemoryHistory`] keeps the entry stack in memory, which is what
//! tests and non-browser hosts use.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use crate::lock;
use crate::path::split_href;

const POPSTATE_CAPACITY: usize = 16;

/// Location reached through back/forward navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopState {
    pub pathname: String,
    /// Search string without the `?`
    pub search: String,
}

/// Browser-history-like location store
pub trait History: Send + Sync {
    fn current_pathname(&self) -> String;

    /// Search string without the `?`
    fn current_search(&self) -> String;

    /// Adds an entry, discarding any forward entries
    fn push_state(&self, href: &str);

    /// Overwrites the current entry
    fn replace_state(&self, href: &str);

    fn subscribe(&self) -> broadcast::Receiver<PopState>;

    /// Moves `delta` entries through the history and emits a [`PopState`]
    ///
    /// Returns `false` when the move is impossible.
    fn go(&self, delta: isize) -> bool;

    /// Current pathname plus `?search` when present
    fn current_href(&self) -> String {
        let search = self.current_search();
        if search.is_empty() {
            self.current_pathname()
        } else {
            format!("{}?{}", self.current_pathname(), search)
        }
    }
}

struct Entries {
    stack: Vec<String>,
    index: usize,
}

/// In-memory [`History`]
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::history::{History, MemoryHistory};
///
/// let history = MemoryHistory::new("/");
/// history.push_state("/users?page=2");
/// assert_eq!(history.current_pathname(), "/users");
/// assert_eq!(history.current_search(), "page=2");
///
/// assert!(history.back());
/// assert_eq!(history.current_pathname(), "/");
/// ```
pub struct MemoryHistory {
    entries: Mutex<Entries>,
    popstate: broadcast::Sender<PopState>,
}

impl MemoryHistory {
    pub fn new(initial_href: impl Into<String>) -> Self {
        let (popstate, _) = broadcast::channel(POPSTATE_CAPACITY);
        Self {
            entries: Mutex::new(Entries {
                stack: vec![initial_href.into()],
                index: 0,
            }),
            popstate,
        }
    }

    /// Every entry, oldest first
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).stack.clone()
    }

    pub fn index(&self) -> usize {
        lock(&self.entries).index
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn current_entry(&self) -> String {
        let entries = lock(&self.entries);
        entries.stack.get(entries.index).cloned().unwrap_or_default()
    }
}

impl History for MemoryHistory {
    fn current_pathname(&self) -> String {
        let href = self.current_entry();
        let (pathname, _) = split_href(&href);
        if pathname.is_empty() {
            "/".to_string()
        } else {
            pathname.to_string()
        }
    }

    fn current_search(&self) -> String {
        let href = self.current_entry();
        split_href(&href).1.to_string()
    }

    fn push_state(&self, href: &str) {
        let mut entries = lock(&self.entries);
        let keep = entries.index + 1;
        entries.stack.truncate(keep);
        entries.stack.push(href.to_string());
        entries.index = keep;
    }

    fn replace_state(&self, href: &str) {
        let mut entries = lock(&self.entries);
        let index = entries.index;
        if let Some(entry) = entries.stack.get_mut(index) {
            *entry = href.to_string();
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<PopState> {
        self.popstate.subscribe()
    }

    /// Emits nothing when the target is out of range or `delta` is zero.
    fn go(&self, delta: isize) -> bool {
        let href = {
            let mut entries = lock(&self.entries);
            let target = entries.index.checked_add_signed(delta);
            match target {
                Some(t) if delta != 0 && t < entries.stack.len() => {
                    entries.index = t;
                    entries.stack[t].clone()
                }
                _ => return false,
            }
        };

        let (pathname, search) = split_href(&href);
        let event = PopState {
            pathname: pathname.to_string(),
            search: search.to_string(),
        };
        if self.popstate.send(event).is_err() {
            debug!(href = %href, "popstate emitted with no listener");
        }
        true
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = lock(&self.entries);
        f.debug_struct("MemoryHistory")
            .field("stack", &entries.stack)
            .field("index", &entries.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_discards_forward_entries() {
        let history = MemoryHistory::new("/");
        history.push_state("/a");
        history.push_state("/b");
        assert!(history.back());
        history.push_state("/c");
        assert_eq!(history.entries(), vec!["/", "/a", "/c"]);
        assert!(!history.forward());
    }

    #[test]
    fn test_replace_keeps_length() {
        let history = MemoryHistory::new("/");
        history.push_state("/a");
        history.replace_state("/b?x=1");
        assert_eq!(history.entries(), vec!["/", "/b?x=1"]);
        assert_eq!(history.current_href(), "/b?x=1");
    }

    #[test]
    fn test_go_bounds() {
        let history = MemoryHistory::new("/");
        assert!(!history.go(-1));
        assert!(!history.go(0));
        history.push_state("/a");
        assert!(!history.go(2));
        assert!(history.go(-1));
        assert_eq!(history.index(), 0);
    }

    #[tokio::test]
    async fn test_popstate_emitted() {
        let history = MemoryHistory::new("/start");
        let mut rx = history.subscribe();
        history.push_state("/next?q=1");
        history.back();
        history.forward();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.pathname, "/start");
        assert_eq!(
            second,
            PopState {
                pathname: "/next".into(),
                search: "q=1".into()
            }
        );
    }
}
