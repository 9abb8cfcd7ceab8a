//! Fine-grained reactive store
//!
//! Inspired by Jotai/SolidJS atoms with automatic dependency tracking.
//! This implements a push-pull hybrid:
//! - Writes to a [`Signal`] push recomputation to *mounted* dependents and
//!   then notify their listeners
//! - Derived values that nobody subscribes to are pulled lazily; a read
//!   validates the versions of the recorded dependencies and recomputes only
//!   when one of them moved
//!
//! # Mounting
//!
//! An atom is *mounted* while it has at least one listener or one mounted
//! dependent. Mounting is transitive: subscribing to a derived value mounts
//! everything it currently reads. Atoms may carry an `on_mount` hook that
//! runs on the first mount and may return an `on_unmount` callback that runs
//! when the last listener/dependent goes away.
//!
//! The store holds atoms weakly. Once every handle to an unmounted atom is
//! dropped its cached state is released by [`Store::prune`], which also runs
//! on its own as the store grows.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use lumen_core::{Derived, Signal, Store};
//!
//! let store = Store::new();
//! let count = Signal::new(0i32);
//! let parity = Derived::new({
//!     let count = count.clone();
//!     move |get| get.get(&count) % 2 == 0
//! });
//!
//! let calls = Rc::new(Cell::new(0));
//! let subscription = store.subscribe(&parity, {
//!     let calls = calls.clone();
//!     move || calls.set(calls.get() + 1)
//! });
//!
//! store.set(&count, 2); // still even: no notification
//! store.set(&count, 3);
//! assert_eq!(calls.get(), 1);
//!
//! subscription.unsubscribe();
//! ```
//!
//! The store is single-threaded. No internal borrow is held while user code
//! (compute functions, listeners, lifecycle hooks) runs, so all of them may
//! read from and write to the store again.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use smallvec::{smallvec, SmallVec};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::atom::{
    AnyAtom, AtomKey, AtomKind, ErasedCompute, ErasedValue, OnUnmount, Signal, Source, WeakAtom,
};
use crate::error::{Result, StoreError};

new_key_type! {
    /// Unique identifier for a subscription listener
    pub struct ListenerId;
}

type Listener = Rc<dyn Fn()>;
type Dependencies = SmallVec<[(AtomKey, u64); 4]>;
type Keys = SmallVec<[AtomKey; 4]>;

/// Node count below which the store never prunes
const PRUNE_THRESHOLD: usize = 64;

/// Internal per-store state of one atom
struct Node {
    /// Only mounting keeps the atom alive
    atom: WeakAtom,
    /// Current value (always present for signals, cached for derived values)
    value: Option<ErasedValue>,
    /// Bumped every time the value actually changes
    version: u64,
    /// Atoms read by the last computation, with the version observed
    dependencies: Dependencies,
    mounted: Option<Mounted>,
}

impl Node {
    fn new(atom: &AnyAtom) -> Self {
        let value = match &atom.def().kind {
            AtomKind::Signal { initial } => Some(initial.clone()),
            AtomKind::Derived { .. } => None,
        };
        Self {
            atom: atom.downgrade(),
            value,
            version: 0,
            dependencies: SmallVec::new(),
            mounted: None,
        }
    }

    fn dependency_keys(&self) -> Keys {
        self.dependencies.iter().map(|&(key, _)| key).collect()
    }
}

struct Mounted {
    atom: AnyAtom,
    listeners: SlotMap<ListenerId, Listener>,
    /// Mounted atoms that read this one
    dependents: FxHashSet<AtomKey>,
    on_unmount: Option<OnUnmount>,
}

impl Mounted {
    fn new(atom: &AnyAtom) -> Self {
        Self {
            atom: atom.clone(),
            listeners: SlotMap::with_key(),
            dependents: FxHashSet::default(),
            on_unmount: None,
        }
    }

    fn is_idle(&self) -> bool {
        self.listeners.is_empty() && self.dependents.is_empty()
    }
}

#[derive(Default)]
struct StoreInner {
    nodes: RefCell<FxHashMap<AtomKey, Node>>,
    /// Node count that triggers the next prune
    prune_at: Cell<usize>,
}

/// Read access handed to derived compute functions
///
/// Every atom read through a `Getter` is recorded as a dependency of the
/// computation currently running.
pub struct Getter<'a> {
    store: &'a Store,
    dependencies: RefCell<Dependencies>,
}

impl<'a> Getter<'a> {
    fn new(store: &'a Store) -> Self {
        Self {
            store,
            dependencies: RefCell::new(SmallVec::new()),
        }
    }

    /// Read an atom and record it as a dependency
    ///
    /// # Panics
    ///
    /// Panics if the stored value does not match the source's type, which
    /// cannot happen through the typed [`Signal`]/[`Derived`](crate::Derived) API.
    pub fn get<T, S>(&self, source: &S) -> T
    where
        T: Clone + 'static,
        S: Source<T>,
    {
        let (value, version) = self.store.read_node(source.atom());
        self.track(source.key(), version);
        match downcast(source.key(), &value) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// The store this computation runs against
    pub fn store(&self) -> &'a Store {
        self.store
    }

    fn track(&self, key: AtomKey, version: u64) {
        let mut deps = self.dependencies.borrow_mut();
        match deps.iter_mut().find(|(dep, _)| *dep == key) {
            Some(entry) => entry.1 = version,
            None => deps.push((key, version)),
        }
    }

    fn into_dependencies(self) -> Dependencies {
        self.dependencies.into_inner()
    }
}

fn downcast<T: Clone + 'static>(key: AtomKey, value: &ErasedValue) -> Result<T> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or(StoreError::TypeMismatch {
            key,
            expected: std::any::type_name::<T>(),
        })
}

/// A store holding the values of atoms (cheap to clone, clones share state)
#[derive(Clone, Default)]
pub struct Store {
    inner: Rc<StoreInner>,
}

/// A weak handle to a store
///
/// Held by long-lived callbacks (frame callbacks, subscriptions) so they
/// don't keep the store alive.
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }

    /// Check if the store is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Check if this handle points at `store`
    pub fn refers_to(&self, store: &Store) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&store.inner))
    }
}

/// Handle returned by [`Store::subscribe`]
///
/// The subscription stays active until [`Subscription::unsubscribe`] is
/// called; dropping the handle does not unsubscribe.
#[must_use = "a subscription keeps its atom mounted until `unsubscribe` is called"]
pub struct Subscription {
    store: WeakStore,
    key: AtomKey,
    id: ListenerId,
}

impl Subscription {
    /// The atom this subscription listens to
    pub fn key(&self) -> AtomKey {
        self.key
    }

    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.remove_listener(self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Store {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Check whether two handles refer to the same store
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // READ / WRITE
    // =========================================================================

    /// Get the current value of a signal or derived value
    ///
    /// # Panics
    ///
    /// Panics on a type mismatch, see [`Getter::get`].
    pub fn get<T, S>(&self, source: &S) -> T
    where
        T: Clone + 'static,
        S: Source<T>,
    {
        match self.try_get(source) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the current value, reporting a type mismatch as an error
    pub fn try_get<T, S>(&self, source: &S) -> Result<T>
    where
        T: Clone + 'static,
        S: Source<T>,
    {
        self.maybe_prune();
        let (value, _) = self.read_node(source.atom());
        downcast(source.key(), &value)
    }

    /// Set the value of a signal, triggering reactive updates
    ///
    /// Setting a value equal to the current one is a no-op.
    pub fn set<T: Clone + PartialEq + 'static>(&self, signal: &Signal<T>, value: T) {
        self.write(signal.atom(), Rc::new(value));
    }

    /// Update a signal using a function of its current value
    pub fn update<T, F>(&self, signal: &Signal<T>, f: F)
    where
        T: Clone + PartialEq + 'static,
        F: FnOnce(&T) -> T,
    {
        let current = self.get(signal);
        self.set(signal, f(&current));
    }

    /// Get the version of an atom (for change detection)
    ///
    /// Returns `None` if the atom was never touched in this store.
    pub fn version<T, S: Source<T>>(&self, source: &S) -> Option<u64> {
        self.inner
            .nodes
            .borrow()
            .get(&source.key())
            .map(|node| node.version)
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to changes of an atom
    ///
    /// The listener is not called on registration, only after the value
    /// changed. The first subscription mounts the atom (and transitively its
    /// dependencies).
    pub fn subscribe<T, S, F>(&self, source: &S, listener: F) -> Subscription
    where
        S: Source<T>,
        F: Fn() + 'static,
    {
        let atom = source.atom().clone();
        let key = atom.key();
        self.mount(&atom);

        let id = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let node = nodes.entry(key).or_insert_with(|| Node::new(&atom));
            node.mounted
                .get_or_insert_with(|| Mounted::new(&atom))
                .listeners
                .insert(Rc::new(listener))
        };

        Subscription {
            store: self.downgrade(),
            key,
            id,
        }
    }

    /// Check if an atom is currently mounted in this store
    pub fn is_mounted<T, S: Source<T>>(&self, source: &S) -> bool {
        self.is_key_mounted(source.key())
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn is_key_mounted(&self, key: AtomKey) -> bool {
        self.inner
            .nodes
            .borrow()
            .get(&key)
            .is_some_and(|node| node.mounted.is_some())
    }

    fn atom_for(&self, key: AtomKey) -> Option<AnyAtom> {
        self.inner
            .nodes
            .borrow()
            .get(&key)
            .and_then(|node| match &node.mounted {
                Some(mounted) => Some(mounted.atom.clone()),
                None => node.atom.upgrade(),
            })
    }

    /// Read an atom, recomputing a derived value if its dependencies moved
    pub(crate) fn read_node(&self, atom: &AnyAtom) -> (ErasedValue, u64) {
        let compute = match &atom.def().kind {
            AtomKind::Signal { initial } => {
                let mut nodes = self.inner.nodes.borrow_mut();
                let node = nodes.entry(atom.key()).or_insert_with(|| Node::new(atom));
                let value = node.value.get_or_insert_with(|| initial.clone()).clone();
                return (value, node.version);
            }
            AtomKind::Derived { compute } => compute.clone(),
        };

        if let Some(cached) = self.validate(atom.key()) {
            return cached;
        }
        self.recompute(atom, &compute)
    }

    /// Return the cached value if every recorded dependency is unchanged
    fn validate(&self, key: AtomKey) -> Option<(ErasedValue, u64)> {
        let (value, version, dependencies) = {
            let nodes = self.inner.nodes.borrow();
            let node = nodes.get(&key)?;
            let value = node.value.clone()?;
            let dependencies = node
                .dependencies
                .iter()
                .map(|&(dep, seen)| Some((nodes.get(&dep)?.atom.upgrade()?, seen)))
                .collect::<Option<SmallVec<[(AnyAtom, u64); 4]>>>()?;
            (value, node.version, dependencies)
        };

        for (dep, seen) in dependencies {
            let (_, current) = self.read_node(&dep);
            if current != seen {
                return None;
            }
        }
        Some((value, version))
    }

    fn recompute(&self, atom: &AnyAtom, compute: &ErasedCompute) -> (ErasedValue, u64) {
        let key = atom.key();
        let getter = Getter::new(self);
        let computed = compute(&getter);
        let dependencies = getter.into_dependencies();

        let (value, version, added, removed) = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let node = nodes.entry(key).or_insert_with(|| Node::new(atom));
            let same = atom.def().same;

            let value = match &node.value {
                Some(old) if same(&**old, &*computed) => old.clone(),
                _ => {
                    node.value = Some(computed.clone());
                    node.version += 1;
                    computed
                }
            };

            let (added, removed) = if node.mounted.is_some() {
                diff_dependencies(&node.dependencies, &dependencies)
            } else {
                (Keys::new(), Keys::new())
            };
            node.dependencies = dependencies;
            (value, node.version, added, removed)
        };

        for dep in added {
            self.attach(dep, key);
        }
        for dep in removed {
            self.detach(dep, key);
        }
        (value, version)
    }

    fn write(&self, atom: &AnyAtom, value: ErasedValue) {
        self.maybe_prune();
        let key = atom.key();
        let changed = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let node = nodes.entry(key).or_insert_with(|| Node::new(atom));
            let same = atom.def().same;
            match &node.value {
                Some(old) if same(&**old, &*value) => false,
                _ => {
                    node.value = Some(value);
                    node.version += 1;
                    true
                }
            }
        };

        if changed {
            self.propagate(key);
        }
    }

    /// Recompute mounted dependents in topological order, then notify
    /// listeners of every atom whose value changed
    fn propagate(&self, origin: AtomKey) {
        let order = self.mounted_dependents(origin);
        let before: SmallVec<[u64; 8]> = {
            let nodes = self.inner.nodes.borrow();
            order
                .iter()
                .map(|key| nodes.get(key).map_or(0, |node| node.version))
                .collect()
        };

        let mut changed: SmallVec<[AtomKey; 8]> = smallvec![origin];
        for (&key, version) in order.iter().zip(before) {
            if !self.is_key_mounted(key) {
                continue;
            }
            let Some(atom) = self.atom_for(key) else {
                continue;
            };
            let (_, current) = self.read_node(&atom);
            if current != version {
                changed.push(key);
            }
        }

        let listeners: Vec<Listener> = {
            let nodes = self.inner.nodes.borrow();
            changed
                .iter()
                .filter_map(|key| nodes.get(key)?.mounted.as_ref())
                .flat_map(|mounted| mounted.listeners.values().cloned())
                .collect()
        };
        for listener in listeners {
            listener();
        }
    }

    fn mounted_dependents(&self, origin: AtomKey) -> Vec<AtomKey> {
        fn visit(
            nodes: &FxHashMap<AtomKey, Node>,
            key: AtomKey,
            visited: &mut FxHashSet<AtomKey>,
            order: &mut Vec<AtomKey>,
        ) {
            if let Some(mounted) = nodes.get(&key).and_then(|node| node.mounted.as_ref()) {
                for &dependent in &mounted.dependents {
                    if visited.insert(dependent) {
                        visit(nodes, dependent, visited, order);
                    }
                }
            }
            order.push(key);
        }

        let nodes = self.inner.nodes.borrow();
        let mut visited = FxHashSet::default();
        visited.insert(origin);
        let mut order = Vec::new();
        visit(&nodes, origin, &mut visited, &mut order);

        // Post-order finishes with the origin itself
        order.pop();
        order.reverse();
        order
    }

    fn mount(&self, atom: &AnyAtom) {
        let key = atom.key();
        if self.is_key_mounted(key) {
            return;
        }
        self.read_node(atom);

        let dependencies = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let node = nodes.entry(key).or_insert_with(|| Node::new(atom));
            if node.mounted.is_some() {
                return;
            }
            node.mounted = Some(Mounted::new(atom));
            node.dependency_keys()
        };
        tracing::trace!(atom = key.to_raw(), label = ?atom.label(), "mount");

        for dep in dependencies {
            self.attach(dep, key);
        }

        if let Some(hook) = atom.def().on_mount.clone() {
            if let Some(on_unmount) = hook(self) {
                let orphaned = {
                    let mut nodes = self.inner.nodes.borrow_mut();
                    match nodes.get_mut(&key).and_then(|node| node.mounted.as_mut()) {
                        Some(mounted) => {
                            mounted.on_unmount = Some(on_unmount);
                            None
                        }
                        None => Some(on_unmount),
                    }
                };
                // Unmounted again while the hook ran
                if let Some(on_unmount) = orphaned {
                    on_unmount(self);
                }
            }
        }
    }

    fn attach(&self, dep: AtomKey, dependent: AtomKey) {
        let Some(atom) = self.atom_for(dep) else {
            return;
        };
        self.mount(&atom);
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(mounted) = nodes.get_mut(&dep).and_then(|node| node.mounted.as_mut()) {
            mounted.dependents.insert(dependent);
        }
    }

    fn detach(&self, dep: AtomKey, dependent: AtomKey) {
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let Some(mounted) = nodes.get_mut(&dep).and_then(|node| node.mounted.as_mut()) {
                mounted.dependents.remove(&dependent);
            }
        }
        self.maybe_unmount(dep);
    }

    fn remove_listener(&self, key: AtomKey, id: ListenerId) {
        let removed = {
            let mut nodes = self.inner.nodes.borrow_mut();
            nodes
                .get_mut(&key)
                .and_then(|node| node.mounted.as_mut())
                .and_then(|mounted| mounted.listeners.remove(id))
        };
        drop(removed);
        self.maybe_unmount(key);
    }

    fn maybe_unmount(&self, key: AtomKey) {
        let (mut mounted, dependencies) = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let Some(node) = nodes.get_mut(&key) else {
                return;
            };
            if !node.mounted.as_ref().is_some_and(Mounted::is_idle) {
                return;
            }
            let Some(mounted) = node.mounted.take() else {
                return;
            };
            (mounted, node.dependency_keys())
        };
        tracing::trace!(atom = key.to_raw(), "unmount");

        if let Some(on_unmount) = mounted.on_unmount.take() {
            on_unmount(self);
        }
        for dep in dependencies {
            self.detach(dep, key);
        }
        // May release the last handle to the atom
        drop(mounted);
    }

    fn maybe_prune(&self) {
        let len = self.inner.nodes.borrow().len();
        if len >= self.inner.prune_at.get().max(PRUNE_THRESHOLD) {
            self.prune();
        }
    }

    /// Release the state of atoms that are unmounted and whose handles were
    /// all dropped
    ///
    /// Runs automatically as the store grows. Returns the number of atoms
    /// released.
    pub fn prune(&self) -> usize {
        let (released, remaining) = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let dead: Vec<AtomKey> = nodes
                .iter()
                .filter(|(_, node)| node.mounted.is_none() && node.atom.is_dropped())
                .map(|(&key, _)| key)
                .collect();
            let released: Vec<Node> = dead.iter().filter_map(|key| nodes.remove(key)).collect();
            (released, nodes.len())
        };
        self.inner.prune_at.set(remaining * 2);

        let count = released.len();
        if count > 0 {
            tracing::trace!(released = count, remaining, "pruned store");
        }
        // Cached values are dropped with no borrow held
        drop(released);
        count
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        let nodes = self.inner.nodes.borrow();
        let mounted = nodes.values().filter_map(|node| node.mounted.as_ref());
        StoreStats {
            atom_count: nodes.len(),
            mounted_count: mounted.clone().count(),
            listener_count: mounted.map(|m| m.listeners.len()).sum(),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("stats", &self.stats()).finish()
    }
}

fn diff_dependencies(old: &Dependencies, new: &Dependencies) -> (Keys, Keys) {
    let added = new
        .iter()
        .filter(|(key, _)| !old.iter().any(|(k, _)| k == key))
        .map(|&(key, _)| key)
        .collect();
    let removed = old
        .iter()
        .filter(|(key, _)| !new.iter().any(|(k, _)| k == key))
        .map(|&(key, _)| key)
        .collect();
    (added, removed)
}

/// Statistics about a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub atom_count: usize,
    pub mounted_count: usize,
    pub listener_count: usize,
}
