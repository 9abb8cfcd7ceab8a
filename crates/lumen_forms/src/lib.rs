//! Lumen Forms
//!
//! Form state on top of the [`lumen_core`] store:
//!
//! - **Paths**: [`FieldPath`] addresses a field inside a JSON form value
//! - **Lenses**: read and write one field of a form signal
//! - **Mappings**: [`FieldMapping`] edits a stored value in another shape,
//!   such as an integer as text
//! - **Field state**: [`PerFieldState`] tracks touched/disabled-style flags
//!   for every field with subtree defaults
//! - **Errors**: [`FieldErrors`] keyed by path, and [`ErrorsDisplay`] for
//!   when to show them
//!
//! ```rust
//! use lumen_core::Store;
//! use lumen_forms::{field_value, form_signal, set_field_value, FieldPath};
//! use serde_json::json;
//!
//! let store = Store::new();
//! let form = form_signal(json!({ "bio": { "age": 36 } }));
//! let path: FieldPath = "bio.age".parse().unwrap();
//! let age = field_value(&form, path.clone());
//!
//! set_field_value(&store, &form, &path, json!(37)).unwrap();
//! assert_eq!(store.get(&age), json!(37));
//! ```

pub mod error;
pub mod errors;
pub mod field_state;
pub mod mapping;
pub mod path;
pub mod strategy;
pub mod value_path;

pub use error::{FormError, Result};
pub use errors::{field_errors, FieldErrors, FieldIssue};
pub use field_state::{field_state, set_field_state, PerFieldState};
pub use mapping::{mapping, FieldMapping, FnMapping, IntegerMapping, MappedField, MappedSignal};
pub use path::{FieldPath, PathSegment};
pub use strategy::{ErrorsDisplay, ErrorsStrategy, FieldEvent, FormEvent, UnknownStrategy};
pub use value_path::{
    field_value, form_signal, set_field_serialized, set_field_value, set_value_at,
    typed_value_at, update_field_value, update_value_at, value_at, FormData,
};
