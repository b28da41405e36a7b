//! Observer-pattern map for fine-grained reactive updates
//!
//! The navigator keeps the query map and one parameter map per nesting depth
//! in [`ObservableMap`]s. Views subscribe to the keys they care about and
//! are notified on every individual key mutation, without the navigator
//! knowing anything about the rendering technology.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::lock;
use crate::params::{ParamValue, Params};

/// Callback invoked with the mutated key and its new value (`None` when the
/// key was removed)
pub type ChangeCallback = Arc<dyn Fn(&str, Option<&ParamValue>) + Send + Sync>;

/// Handle returned by [`ObservableMap::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    key: Option<String>,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    values: Params,
    subscribers: Vec<Subscriber>,
}

/// Key/value map whose mutations notify per-key subscribers
///
/// Callbacks run after the internal lock is released, so a callback may read
/// (or even mutate) the map it observes.
#[derive(Default)]
pub struct ObservableMap {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
}

impl ObservableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map pre-filled with `values` (no notifications)
    pub fn with_values(values: Params) -> Self {
        Self {
            inner: Mutex::new(Inner {
                values,
                subscribers: Vec::new(),
            }),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<ParamValue> {
        lock(&self.inner).values.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.inner).values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).values.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).values.is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Params {
        lock(&self.inner).values.clone()
    }

    /// Sets `key` to `value`, notifying subscribers only if the value changed
    ///
    /// Returns whether the map changed.
    pub fn set(&self, key: &str, value: ParamValue) -> bool {
        let callbacks = {
            let mut inner = lock(&self.inner);
            if inner.values.get(key) == Some(&value) {
                return false;
            }
            inner.values.insert(key.to_string(), value.clone());
            interested(&inner.subscribers, key)
        };
        callbacks.iter().for_each(|cb| cb(key, Some(&value)));
        true
    }

    /// Removes `key`, notifying subscribers if it was present
    pub fn remove(&self, key: &str) -> Option<ParamValue> {
        let (old, callbacks) = {
            let mut inner = lock(&self.inner);
            let old = inner.values.remove(key)?;
            (old, interested(&inner.subscribers, key))
        };
        callbacks.iter().for_each(|cb| cb(key, None));
        Some(old)
    }

    /// Brings the map in line with `next` one key at a time
    ///
    /// Keys absent from `next` are removed first, then changed and new keys
    /// are set. Every individual mutation is observable. Returns the number
    /// of mutations.
    pub fn replace_all(&self, next: &Params) -> usize {
        let stale: Vec<String> = {
            let inner = lock(&self.inner);
            inner
                .values
                .keys()
                .filter(|k| !next.contains_key(*k))
                .cloned()
                .collect()
        };

        let removed = stale.iter().filter(|k| self.remove(k).is_some()).count();
        let updated = next
            .iter()
            .filter(|(k, v)| self.set(k, (*v).clone()))
            .count();
        removed + updated
    }

    /// Subscribes to mutations of a single key
    pub fn subscribe<F>(&self, key: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&str, Option<&ParamValue>) + Send + Sync + 'static,
    {
        self.add_subscriber(Some(key.to_string()), Arc::new(callback))
    }

    /// Subscribes to mutations of every key
    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str, Option<&ParamValue>) + Send + Sync + 'static,
    {
        self.add_subscriber(None, Arc::new(callback))
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Drops every subscriber; used when the map is discarded by the navigator
    pub fn release(&self) {
        lock(&self.inner).subscribers.clear();
    }

    fn add_subscriber(&self, key: Option<String>, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner).subscribers.push(Subscriber { id, key, callback });
        id
    }
}

impl std::fmt::Debug for ObservableMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ObservableMap")
            .field("values", &inner.values)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

fn interested(subscribers: &[Subscriber], key: &str) -> Vec<ChangeCallback> {
    subscribers
        .iter()
        .filter(|s| s.key.as_deref().map_or(true, |k| k == key))
        .map(|s| Arc::clone(&s.callback))
        .collect()
}

impl From<BTreeMap<String, ParamValue>> for ObservableMap {
    fn from(values: BTreeMap<String, ParamValue>) -> Self {
        Self::with_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;
    use std::sync::Mutex as StdMutex;

    fn recorder() -> (Arc<StdMutex<Vec<String>>>, impl Fn(&str, Option<&ParamValue>) + Send + Sync) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cb = move |k: &str, v: Option<&ParamValue>| {
            let entry = match v {
                Some(v) => format!("{}={}", k, v),
                None => format!("-{}", k),
            };
            sink.lock().unwrap().push(entry);
        };
        (log, cb)
    }

    #[test]
    fn test_only_interested_subscribers_notified() {
        let map = ObservableMap::new();
        let (ids, on_id) = recorder();
        let (names, on_name) = recorder();
        map.subscribe("id", on_id);
        map.subscribe("name", on_name);

        map.set("id", ParamValue::Num(1));

        assert_eq!(*ids.lock().unwrap(), vec!["id=1"]);
        assert!(names.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unchanged_value_is_silent() {
        let map = ObservableMap::new();
        let (log, cb) = recorder();
        map.subscribe_all(cb);

        assert!(map.set("a", ParamValue::Num(1)));
        assert!(!map.set("a", ParamValue::Num(1)));

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_replace_all_diffs_key_by_key() {
        let map = ObservableMap::with_values(params([
            ("keep", ParamValue::Num(1)),
            ("change", ParamValue::Num(1)),
            ("drop", ParamValue::Num(1)),
        ]));
        let (log, cb) = recorder();
        map.subscribe_all(cb);

        let next = params([
            ("keep", ParamValue::Num(1)),
            ("change", ParamValue::Num(2)),
            ("add", "x".into()),
        ]);
        assert_eq!(map.replace_all(&next), 3);

        assert_eq!(*log.lock().unwrap(), vec!["-drop", "add=x", "change=2"]);
        assert_eq!(map.snapshot(), next);
    }

    #[test]
    fn test_callback_may_read_map() {
        let map = Arc::new(ObservableMap::new());
        let seen = Arc::new(StdMutex::new(None));
        {
            let map2 = Arc::clone(&map);
            let seen = Arc::clone(&seen);
            map.subscribe("a", move |_, _| {
                *seen.lock().unwrap() = map2.get("a");
            });
        }
        map.set("a", ParamValue::Num(5));
        assert_eq!(*seen.lock().unwrap(), Some(ParamValue::Num(5)));
    }

    #[test]
    fn test_unsubscribe_and_release() {
        let map = ObservableMap::new();
        let (log, cb) = recorder();
        let id = map.subscribe_all(cb);
        assert!(map.unsubscribe(id));
        assert!(!map.unsubscribe(id));
        map.set("a", ParamValue::Num(1));
        assert!(log.lock().unwrap().is_empty());

        map.subscribe("a", |_, _| {});
        map.release();
        assert_eq!(map.subscriber_count(), 0);
    }
}
