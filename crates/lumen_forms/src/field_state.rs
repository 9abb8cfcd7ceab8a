//! Per-field state
//!
//! Tracks a small value (touched, disabled, dirty...) for every field of a
//! form without listing the fields up front. A [`PerFieldState`] is either a
//! single value applying to a whole subtree, or a nested map with an
//! optional default for children that have no entry of their own.

use rustc_hash::FxHashMap;

use lumen_core::{Derived, Signal, Store};

use crate::path::{FieldPath, PathSegment};

/// State for a subtree of fields
#[derive(Clone, Debug, PartialEq)]
pub enum PerFieldState<T> {
    /// Applies to the field and everything below it
    Value(T),
    /// Per-child state
    Nested {
        default: Option<Box<PerFieldState<T>>>,
        fields: FxHashMap<PathSegment, PerFieldState<T>>,
    },
}

impl<T> PerFieldState<T> {
    /// The state governing `path`
    ///
    /// A child without its own entry falls back to the nested default.
    pub fn walk(&self, path: &FieldPath) -> Option<&PerFieldState<T>> {
        path.into_iter()
            .try_fold(self, |state, segment| match state {
                PerFieldState::Value(_) => Some(state),
                PerFieldState::Nested { default, fields } => {
                    fields.get(segment).or(default.as_deref())
                }
            })
    }

    /// The value of this subtree, following nested defaults
    pub fn resolve(&self) -> Option<&T> {
        match self {
            PerFieldState::Value(value) => Some(value),
            PerFieldState::Nested { default, .. } => default.as_deref()?.resolve(),
        }
    }

    /// Resolved value at `path`
    pub fn get(&self, path: &FieldPath) -> Option<&T> {
        self.walk(path)?.resolve()
    }
}

impl<T: Clone> PerFieldState<T> {
    /// Replace the state at `path` with `f` of the state currently there
    ///
    /// Writing below a plain value turns it into a nested node that keeps
    /// the old value as its default, so sibling fields are unaffected.
    pub fn update<F>(&mut self, path: &FieldPath, f: F)
    where
        F: FnOnce(Option<PerFieldState<T>>) -> PerFieldState<T>,
    {
        let current = std::mem::replace(self, PerFieldState::empty());
        *self = Self::updated(Some(current), path.segments(), f);
    }

    /// Set a single value at `path`
    pub fn set(&mut self, path: &FieldPath, value: T) {
        self.update(path, |_| PerFieldState::Value(value));
    }

    fn empty() -> Self {
        PerFieldState::Nested {
            default: None,
            fields: FxHashMap::default(),
        }
    }

    fn updated<F>(state: Option<Self>, path: &[PathSegment], f: F) -> Self
    where
        F: FnOnce(Option<PerFieldState<T>>) -> PerFieldState<T>,
    {
        let Some((head, rest)) = path.split_first() else {
            return f(state);
        };

        match state {
            Some(PerFieldState::Nested {
                default,
                mut fields,
            }) => {
                let child = fields
                    .remove(head)
                    .or_else(|| default.as_deref().cloned());
                fields.insert(head.clone(), Self::updated(child, rest, f));
                PerFieldState::Nested { default, fields }
            }
            leaf => {
                let default = leaf.clone().map(Box::new);
                let mut fields = FxHashMap::default();
                fields.insert(head.clone(), Self::updated(leaf, rest, f));
                PerFieldState::Nested { default, fields }
            }
        }
    }
}

impl<T: Default> Default for PerFieldState<T> {
    fn default() -> Self {
        PerFieldState::Value(T::default())
    }
}

impl<T> From<T> for PerFieldState<T> {
    fn from(value: T) -> Self {
        PerFieldState::Value(value)
    }
}

// ============================================================================
// Reactive access
// ============================================================================

/// The resolved state of one field as a derived value
pub fn field_state<T>(state: &Signal<PerFieldState<T>>, path: FieldPath) -> Derived<Option<T>>
where
    T: Clone + PartialEq + 'static,
{
    let state = state.clone();
    Derived::new(move |get| get.get(&state).get(&path).cloned())
}

/// Set the state of one field
pub fn set_field_state<T>(store: &Store, state: &Signal<PerFieldState<T>>, path: &FieldPath, value: T)
where
    T: Clone + PartialEq + 'static,
{
    store.update(state, |current| {
        let mut next = current.clone();
        next.set(path, value);
        next
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_value_applies_to_subtree() {
        let state = PerFieldState::Value(false);
        assert_eq!(state.get(&path("a.b.0")), Some(&false));
        assert_eq!(state.get(&FieldPath::root()), Some(&false));
    }

    #[test]
    fn test_set_keeps_siblings() {
        let mut state = PerFieldState::Value(false);
        state.set(&path("name"), true);

        assert_eq!(state.get(&path("name")), Some(&true));
        assert_eq!(state.get(&path("email")), Some(&false));
        assert_eq!(state.resolve(), Some(&false));
    }

    #[test]
    fn test_nested_set() {
        let mut state = PerFieldState::Value(0u8);
        state.set(&path("items.1.type"), 3);

        assert_eq!(state.get(&path("items.1.type")), Some(&3));
        assert_eq!(state.get(&path("items.1.count")), Some(&0));
        assert_eq!(state.get(&path("items.0.type")), Some(&0));
        assert_eq!(state.get(&path("title")), Some(&0));
    }

    #[test]
    fn test_overwrite_existing_child() {
        let mut state = PerFieldState::Value("a");
        state.set(&path("x"), "b");
        state.set(&path("x"), "c");
        state.set(&path("x.y"), "d");

        assert_eq!(state.get(&path("x")), Some(&"c"));
        assert_eq!(state.get(&path("x.y")), Some(&"d"));
        assert_eq!(state.get(&path("x.z")), Some(&"c"));
    }

    #[test]
    fn test_missing_without_default() {
        let mut state = PerFieldState::<bool>::empty();
        assert_eq!(state.get(&path("a")), None);
        assert!(state.walk(&path("a")).is_none());

        state.set(&path("a"), true);
        assert_eq!(state.get(&path("a")), Some(&true));
        assert_eq!(state.get(&path("b")), None);
        assert_eq!(state.resolve(), None);
    }

    #[test]
    fn test_update_receives_current() {
        let mut state = PerFieldState::Value(1u32);
        state.update(&path("count"), |current| {
            let base = current.and_then(|s| s.resolve().copied()).unwrap_or_default();
            PerFieldState::Value(base + 10)
        });
        assert_eq!(state.get(&path("count")), Some(&11));
    }

    #[test]
    fn test_set_root_replaces_everything() {
        let mut state = PerFieldState::Value(false);
        state.set(&path("a"), true);
        state.set(&FieldPath::root(), true);
        assert_eq!(state, PerFieldState::Value(true));
    }

    #[test]
    fn test_reactive_field_state() {
        let store = Store::new();
        let touched = Signal::new(PerFieldState::Value(false));
        let name = field_state(&touched, path("name"));
        let email = field_state(&touched, path("email"));

        assert_eq!(store.get(&name), Some(false));
        set_field_state(&store, &touched, &path("name"), true);
        assert_eq!(store.get(&name), Some(true));
        assert_eq!(store.get(&email), Some(false));
    }
}
