//! Lumen Loadable
//!
//! [`Loadable`] describes a value that is produced asynchronously: idle,
//! loading (optionally with the previous value), loaded, or failed.
//! [`LoadableSignal`] stores one in a [`lumen_core::Store`].
//!
//! ```rust
//! use lumen_loadable::Loadable;
//!
//! let state = Loadable::Loading(Some("127"));
//! let parsed = state.map_value(|s| s.parse::<i32>().unwrap());
//! assert_eq!(parsed, Loadable::Loading(Some(127)));
//! assert_eq!(parsed.value(), Some(&127));
//! ```

pub mod loadable;
pub mod signal;

pub use loadable::{LoadError, LoadFailure, Loadable, LoadableMapper};
pub use signal::LoadableSignal;
