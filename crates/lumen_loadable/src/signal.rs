//! Reactive loadable state
//!
//! [`LoadableSignal`] wraps a `Signal<Loadable<T>>` with the transitions a
//! loader goes through, keeping the previous value while a reload runs.

use std::error::Error as StdError;

use lumen_core::{Derived, Signal, Store};

use crate::loadable::Loadable;

/// A signal holding a [`Loadable`]
pub struct LoadableSignal<T> {
    signal: Signal<Loadable<T>>,
}

impl<T> Clone for LoadableSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> std::fmt::Debug for LoadableSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LoadableSignal").field(&self.signal).finish()
    }
}

impl<T: Clone + PartialEq + 'static> LoadableSignal<T> {
    /// Create an idle loadable
    pub fn new() -> Self {
        Self {
            signal: Signal::new(Loadable::Idle),
        }
    }

    pub fn with_label(self, label: &str) -> Self {
        Self {
            signal: self.signal.with_label(label),
        }
    }

    /// The underlying signal
    pub fn signal(&self) -> &Signal<Loadable<T>> {
        &self.signal
    }

    pub fn get(&self, store: &Store) -> Loadable<T> {
        store.get(&self.signal)
    }

    /// Mark a load as started, keeping the last known value
    pub fn start_loading(&self, store: &Store) {
        store.update(&self.signal, |current| {
            Loadable::Loading(current.value().cloned())
        });
    }

    pub fn resolve(&self, store: &Store, value: T) {
        store.set(&self.signal, Loadable::Loaded(value));
    }

    pub fn reject<E>(&self, store: &Store, error: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        tracing::debug!(error = %error, "load failed");
        store.set(&self.signal, Loadable::error(error));
    }

    /// Apply the outcome of a load
    pub fn settle<E>(&self, store: &Store, result: Result<T, E>)
    where
        E: StdError + Send + Sync + 'static,
    {
        match result {
            Ok(value) => self.resolve(store, value),
            Err(error) => self.reject(store, error),
        }
    }

    /// Back to idle
    pub fn reset(&self, store: &Store) {
        store.set(&self.signal, Loadable::Idle);
    }

    /// A derived loadable with the value converted by `f`
    pub fn map<U, F>(&self, f: F) -> Derived<Loadable<U>>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let signal = self.signal.clone();
        Derived::new(move |get| get.get(&signal).as_ref().map_value(&f))
    }
}

impl<T: Clone + PartialEq + 'static> Default for LoadableSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadable::LoadFailure;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_load_cycle() {
        let store = Store::new();
        let user = LoadableSignal::<String>::new();
        assert!(user.get(&store).is_idle());

        user.start_loading(&store);
        assert_eq!(user.get(&store), Loadable::Loading(None));

        user.resolve(&store, "ada".to_string());
        assert_eq!(user.get(&store), Loadable::Loaded("ada".to_string()));

        user.start_loading(&store);
        assert_eq!(user.get(&store), Loadable::Loading(Some("ada".to_string())));
    }

    #[test]
    fn test_settle_error() {
        let store = Store::new();
        let count = LoadableSignal::<u32>::new();

        count.settle(&store, Err(LoadFailure::new("timeout")));
        let state = count.get(&store);
        assert!(state.is_error());
        assert_eq!(state.load_error().unwrap().to_string(), "timeout");

        count.reset(&store);
        assert!(count.get(&store).is_idle());
    }

    #[test]
    fn test_map_tracks_signal() {
        let store = Store::new();
        let raw = LoadableSignal::<String>::new();
        let parsed = raw.map(|s| s.parse::<i32>().unwrap_or_default());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = store.subscribe(&parsed, {
            let seen = seen.clone();
            let store = store.clone();
            let parsed = parsed.clone();
            move || seen.borrow_mut().push(store.get(&parsed))
        });

        raw.start_loading(&store);
        raw.resolve(&store, "127".to_string());

        assert_eq!(
            *seen.borrow(),
            vec![Loadable::Loading(None), Loadable::Loaded(127)]
        );
        sub.unsubscribe();
    }
}
