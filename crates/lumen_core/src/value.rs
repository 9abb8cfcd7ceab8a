//! Atom-or-value inputs
//!
//! Many APIs accept either a reactive source or a plain value (a field that
//! is disabled "always" vs. disabled "while this signal is true").
//! [`SourceOrValue`] abstracts over both so callers read it uniformly.

use std::fmt;
use std::rc::Rc;

use crate::atom::{Derived, Signal, Source};
use crate::reactive::{Getter, Store};

type ReadFn<T> = Rc<dyn Fn(&Getter<'_>) -> T>;
type PeekFn<T> = Rc<dyn Fn(&Store) -> T>;

/// Either a reactive source or a static value
pub enum SourceOrValue<T> {
    /// A static value that never changes
    Value(T),
    /// A value read from a signal or derived value
    Source { read: ReadFn<T>, peek: PeekFn<T> },
}

impl<T: Clone + 'static> SourceOrValue<T> {
    /// Wrap any reactive source
    pub fn source<S: Source<T>>(source: S) -> Self {
        let for_peek = source.clone();
        SourceOrValue::Source {
            read: Rc::new(move |get: &Getter<'_>| get.get(&source)),
            peek: Rc::new(move |store: &Store| store.get(&for_peek)),
        }
    }

    /// Read the current value, tracking the source as a dependency
    pub fn current(&self, get: &Getter<'_>) -> T {
        match self {
            SourceOrValue::Value(value) => value.clone(),
            SourceOrValue::Source { read, .. } => read(get),
        }
    }

    /// Read the current value directly from a store
    pub fn current_in(&self, store: &Store) -> T {
        match self {
            SourceOrValue::Value(value) => value.clone(),
            SourceOrValue::Source { peek, .. } => peek(store),
        }
    }

    /// Check if this is a static value (never changes)
    pub fn is_static(&self) -> bool {
        matches!(self, SourceOrValue::Value(_))
    }
}

impl<T: Clone> Clone for SourceOrValue<T> {
    fn clone(&self) -> Self {
        match self {
            SourceOrValue::Value(value) => SourceOrValue::Value(value.clone()),
            SourceOrValue::Source { read, peek } => SourceOrValue::Source {
                read: read.clone(),
                peek: peek.clone(),
            },
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SourceOrValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            SourceOrValue::Source { .. } => f.write_str("Source(..)"),
        }
    }
}

impl<T: Clone + 'static> From<Signal<T>> for SourceOrValue<T> {
    fn from(signal: Signal<T>) -> Self {
        SourceOrValue::source(signal)
    }
}

impl<T: Clone + 'static> From<Derived<T>> for SourceOrValue<T> {
    fn from(derived: Derived<T>) -> Self {
        SourceOrValue::source(derived)
    }
}
