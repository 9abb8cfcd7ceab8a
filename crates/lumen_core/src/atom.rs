//! Atom definitions
//!
//! Atoms are store-independent descriptions of reactive state. A [`Signal`]
//! holds a writable primitive value; a [`Derived`] computes its value from
//! other atoms through a [`Getter`]. The values themselves live in a
//! [`Store`], so the same atom can be read from several independent stores.
//!
//! ```rust
//! use lumen_core::{Derived, Signal, Store};
//!
//! let count = Signal::new(2i32);
//! let doubled = Derived::new({
//!     let count = count.clone();
//!     move |get| get.get(&count) * 2
//! });
//!
//! let store = Store::new();
//! assert_eq!(store.get(&doubled), 4);
//! store.set(&count, 5);
//! assert_eq!(store.get(&doubled), 10);
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::reactive::{Getter, Store};

/// Unique identifier for an atom definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomKey(u64);

impl AtomKey {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        AtomKey(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Convert to raw u64 (for logging and debugging)
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Callback run when an atom loses its last subscriber or dependent
pub type OnUnmount = Box<dyn FnOnce(&Store)>;

/// Callback run when an atom gains its first subscriber or dependent
pub type OnMount = Rc<dyn Fn(&Store) -> Option<OnUnmount>>;

pub(crate) type ErasedValue = Rc<dyn Any>;
pub(crate) type ErasedCompute = Rc<dyn Fn(&Getter<'_>) -> ErasedValue>;

#[derive(Clone)]
pub(crate) enum AtomKind {
    Signal { initial: ErasedValue },
    Derived { compute: ErasedCompute },
}

#[derive(Clone)]
pub(crate) struct AtomDef {
    pub(crate) key: AtomKey,
    pub(crate) label: Option<Rc<str>>,
    pub(crate) kind: AtomKind,
    pub(crate) same: fn(&dyn Any, &dyn Any) -> bool,
    pub(crate) on_mount: Option<OnMount>,
}

fn same_value<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Type-erased handle to an atom definition
///
/// Every [`Source`] exposes one of these; the store uses it to find the
/// atom's initial value, compute function and lifecycle hook.
#[derive(Clone)]
pub struct AnyAtom(Rc<AtomDef>);

impl AnyAtom {
    fn new<T: PartialEq + 'static>(kind: AtomKind) -> Self {
        AnyAtom(Rc::new(AtomDef {
            key: AtomKey::next(),
            label: None,
            kind,
            same: same_value::<T>,
            on_mount: None,
        }))
    }

    pub fn key(&self) -> AtomKey {
        self.0.key
    }

    /// Debug label, if one was assigned
    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }

    pub(crate) fn def(&self) -> &AtomDef {
        &self.0
    }

    pub(crate) fn downgrade(&self) -> WeakAtom {
        WeakAtom(Rc::downgrade(&self.0))
    }

    // Editing a shared definition forks it into a new atom with its own key.
    fn edit(&mut self) -> &mut AtomDef {
        if Rc::get_mut(&mut self.0).is_none() {
            self.0 = Rc::new(AtomDef {
                key: AtomKey::next(),
                ..(*self.0).clone()
            });
        }
        Rc::make_mut(&mut self.0)
    }
}

/// Non-owning reference a store keeps to each atom it has seen
#[derive(Clone)]
pub(crate) struct WeakAtom(Weak<AtomDef>);

impl WeakAtom {
    pub(crate) fn upgrade(&self) -> Option<AnyAtom> {
        self.0.upgrade().map(AnyAtom)
    }

    /// Check if every handle to the atom is gone
    pub(crate) fn is_dropped(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl fmt::Debug for AnyAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyAtom")
            .field("key", &self.0.key)
            .field("label", &self.0.label)
            .finish()
    }
}

/// Anything that can be read from a store: signals and derived values
pub trait Source<T>: Clone + 'static {
    fn atom(&self) -> &AnyAtom;

    fn key(&self) -> AtomKey {
        self.atom().key()
    }
}

/// A writable primitive atom (cheap to clone)
pub struct Signal<T> {
    atom: AnyAtom,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            atom: self.atom.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.atom).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a new signal with an initial value
    pub fn new(initial: T) -> Self {
        let initial: ErasedValue = Rc::new(initial);
        Self {
            atom: AnyAtom::new::<T>(AtomKind::Signal { initial }),
            _marker: PhantomData,
        }
    }

    /// Attach a debug label
    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.atom.edit().label = Some(label.into());
        self
    }

    /// Run `hook` when the signal is mounted in a store
    ///
    /// The hook may return a callback that runs when the signal is unmounted.
    pub fn with_on_mount<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Store) -> Option<OnUnmount> + 'static,
    {
        self.atom.edit().on_mount = Some(Rc::new(hook));
        self
    }
}

impl<T: 'static> Source<T> for Signal<T> {
    fn atom(&self) -> &AnyAtom {
        &self.atom
    }
}

/// A derived (computed) atom
///
/// The compute function records every atom it reads through the [`Getter`];
/// the store recomputes the value when one of those dependencies changes.
pub struct Derived<T> {
    atom: AnyAtom,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            atom: self.atom.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Derived").field(&self.atom).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// Create a derived value from a compute function
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&Getter<'_>) -> T + 'static,
    {
        let compute: ErasedCompute = Rc::new(move |get: &Getter<'_>| -> ErasedValue {
            Rc::new(compute(get))
        });
        Self {
            atom: AnyAtom::new::<T>(AtomKind::Derived { compute }),
            _marker: PhantomData,
        }
    }

    /// Attach a debug label
    pub fn with_label(mut self, label: impl Into<Rc<str>>) -> Self {
        self.atom.edit().label = Some(label.into());
        self
    }

    /// Run `hook` when the derived value is mounted in a store
    pub fn with_on_mount<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Store) -> Option<OnUnmount> + 'static,
    {
        self.atom.edit().on_mount = Some(Rc::new(hook));
        self
    }
}

impl<T: 'static> Source<T> for Derived<T> {
    fn atom(&self) -> &AnyAtom {
        &self.atom
    }
}
