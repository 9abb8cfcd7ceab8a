//! Lumen Core Runtime
//!
//! This crate provides the reactive foundation shared by the other Lumen
//! crates:
//!
//! - **Atoms**: store-independent [`Signal`] and [`Derived`] definitions
//! - **Store**: per-instance values, dependency tracking and change propagation
//! - **Subscriptions**: listeners with transitive mount/unmount lifecycle hooks
//! - **Atom-or-value inputs**: [`SourceOrValue`] for APIs that accept both
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{Derived, Signal, Store};
//!
//! let store = Store::new();
//!
//! // Create a signal
//! let count = Signal::new(0i32);
//!
//! // Create a derived value
//! let doubled = Derived::new({
//!     let count = count.clone();
//!     move |get| get.get(&count) * 2
//! });
//!
//! // Update the signal
//! store.set(&count, 5);
//! assert_eq!(store.get(&doubled), 10);
//! ```

pub mod atom;
pub mod error;
pub mod reactive;
pub mod value;

pub use atom::{AnyAtom, AtomKey, Derived, OnMount, OnUnmount, Signal, Source};
pub use error::{Result, StoreError};
pub use reactive::{Getter, ListenerId, Store, StoreStats, Subscription, WeakStore};
pub use value::SourceOrValue;
