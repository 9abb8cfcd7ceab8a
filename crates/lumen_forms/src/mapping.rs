//! Field mappings
//!
//! A [`FieldMapping`] converts between the value a form stores and the value
//! a control edits, such as an integer shown in a text input. Converting an
//! edit back may fail; a failed conversion leaves the stored value as it is.
//!
//! ```rust
//! use lumen_core::Store;
//! use lumen_forms::{form_signal, IntegerMapping, MappedField};
//! use serde_json::json;
//!
//! let store = Store::new();
//! let form = form_signal(json!({ "age": 36 }));
//! let age = MappedField::new(&form, "age".parse().unwrap(), IntegerMapping);
//!
//! assert_eq!(age.get(&store), Some("36".to_string()));
//! assert!(age.set(&store, "37".into()).unwrap());
//! assert!(!age.set(&store, "thirty".into()).unwrap());
//! assert_eq!(store.get(&form)["age"], json!(37));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use lumen_core::{Derived, Signal, Store};

use crate::error::Result;
use crate::path::FieldPath;
use crate::value_path::{set_field_serialized, typed_value_at, FormData};

/// Two-way conversion between a stored value and its edited form
pub trait FieldMapping {
    /// What the form stores
    type Value;
    /// What the control edits
    type FormValue;

    fn to_form(&self, value: &Self::Value) -> Self::FormValue;

    /// Convert an edit back, or `None` to keep the stored value
    fn from_form(&self, value: &Self::FormValue) -> Option<Self::Value>;
}

/// Integers edited as text
///
/// Text that does not parse as an integer is ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegerMapping;

impl FieldMapping for IntegerMapping {
    type Value = i64;
    type FormValue = String;

    fn to_form(&self, value: &i64) -> String {
        value.to_string()
    }

    fn from_form(&self, value: &String) -> Option<i64> {
        value.trim().parse().ok()
    }
}

/// A mapping made of two closures, see [`mapping`]
pub struct FnMapping<T, U, F, G> {
    to_form: F,
    from_form: G,
    _marker: PhantomData<fn(T) -> U>,
}

/// Build a mapping from a pair of conversion closures
pub fn mapping<T, U, F, G>(to_form: F, from_form: G) -> FnMapping<T, U, F, G>
where
    F: Fn(&T) -> U,
    G: Fn(&U) -> Option<T>,
{
    FnMapping {
        to_form,
        from_form,
        _marker: PhantomData,
    }
}

impl<T, U, F, G> FieldMapping for FnMapping<T, U, F, G>
where
    F: Fn(&T) -> U,
    G: Fn(&U) -> Option<T>,
{
    type Value = T;
    type FormValue = U;

    fn to_form(&self, value: &T) -> U {
        (self.to_form)(value)
    }

    fn from_form(&self, value: &U) -> Option<T> {
        (self.from_form)(value)
    }
}

impl<T, U, F, G> fmt::Debug for FnMapping<T, U, F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnMapping(..)")
    }
}

// ============================================================================
// Mapped signal
// ============================================================================

/// A signal seen through a mapping
pub struct MappedSignal<M: FieldMapping> {
    source: Signal<M::Value>,
    mapping: Rc<M>,
    value: Derived<M::FormValue>,
}

impl<M> MappedSignal<M>
where
    M: FieldMapping + 'static,
    M::Value: Clone + PartialEq + 'static,
    M::FormValue: Clone + PartialEq + 'static,
{
    pub fn new(source: &Signal<M::Value>, mapping: M) -> Self {
        let mapping = Rc::new(mapping);
        let value = Derived::new({
            let source = source.clone();
            let mapping = mapping.clone();
            move |get| mapping.to_form(&get.get(&source))
        });
        Self {
            source: source.clone(),
            mapping,
            value,
        }
    }

    /// The mapped value, for subscribing or reading in derived values
    pub fn value(&self) -> &Derived<M::FormValue> {
        &self.value
    }

    pub fn get(&self, store: &Store) -> M::FormValue {
        store.get(&self.value)
    }

    /// Write an edit through the mapping
    ///
    /// Returns `false` if the mapping rejected the edit.
    pub fn set(&self, store: &Store, value: M::FormValue) -> bool {
        match self.mapping.from_form(&value) {
            Some(next) => {
                store.set(&self.source, next);
                true
            }
            None => false,
        }
    }

    /// Write an edit computed from the current mapped value
    pub fn update<F>(&self, store: &Store, f: F) -> bool
    where
        F: FnOnce(M::FormValue) -> M::FormValue,
    {
        let current = self.mapping.to_form(&store.get(&self.source));
        self.set(store, f(current))
    }
}

impl<M: FieldMapping> Clone for MappedSignal<M> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            mapping: self.mapping.clone(),
            value: self.value.clone(),
        }
    }
}

impl<M: FieldMapping> fmt::Debug for MappedSignal<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedSignal")
            .field("source", &self.source)
            .finish()
    }
}

// ============================================================================
// Mapped form field
// ============================================================================

/// One field of a form seen through a mapping
///
/// The stored value is read from the form by deserializing the JSON at the
/// field's path; a field that is missing or of the wrong shape reads `None`.
pub struct MappedField<M: FieldMapping> {
    form: Signal<FormData>,
    path: FieldPath,
    mapping: Rc<M>,
    value: Derived<Option<M::FormValue>>,
}

impl<M> MappedField<M>
where
    M: FieldMapping + 'static,
    M::Value: Serialize + DeserializeOwned,
    M::FormValue: Clone + PartialEq + 'static,
{
    pub fn new(form: &Signal<FormData>, path: FieldPath, mapping: M) -> Self {
        let mapping = Rc::new(mapping);
        let value = Derived::new({
            let form = form.clone();
            let path = path.clone();
            let mapping = mapping.clone();
            move |get| {
                let data = get.get(&form);
                typed_value_at::<M::Value>(&data, &path)
                    .ok()
                    .map(|value| mapping.to_form(&value))
            }
        })
        .with_label(format!("mapped:{path}"));

        Self {
            form: form.clone(),
            path,
            mapping,
            value,
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// The mapped value, for subscribing or reading in derived values
    pub fn value(&self) -> &Derived<Option<M::FormValue>> {
        &self.value
    }

    pub fn get(&self, store: &Store) -> Option<M::FormValue> {
        store.get(&self.value)
    }

    /// Write an edit through the mapping
    ///
    /// Returns `Ok(false)` if the mapping rejected the edit, in which case
    /// the form is not written.
    pub fn set(&self, store: &Store, value: M::FormValue) -> Result<bool> {
        let Some(next) = self.mapping.from_form(&value) else {
            tracing::trace!(path = %self.path, "mapped edit rejected");
            return Ok(false);
        };
        set_field_serialized(store, &self.form, &self.path, &next)?;
        Ok(true)
    }

    /// Write an edit computed from the current mapped value
    pub fn update<F>(&self, store: &Store, f: F) -> Result<bool>
    where
        F: FnOnce(Option<M::FormValue>) -> M::FormValue,
    {
        let current = self.get(store);
        self.set(store, f(current))
    }
}

impl<M: FieldMapping> Clone for MappedField<M> {
    fn clone(&self) -> Self {
        Self {
            form: self.form.clone(),
            path: self.path.clone(),
            mapping: self.mapping.clone(),
            value: self.value.clone(),
        }
    }
}

impl<M: FieldMapping> fmt::Debug for MappedField<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedField")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_path::form_signal;
    use serde_json::json;
    use std::cell::RefCell;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_integer_mapping() {
        assert_eq!(IntegerMapping.to_form(&42), "42");
        assert_eq!(IntegerMapping.from_form(&" 7 ".to_string()), Some(7));
        assert_eq!(IntegerMapping.from_form(&"seven".to_string()), None);
        assert_eq!(IntegerMapping.from_form(&String::new()), None);
    }

    #[test]
    fn test_mapped_signal_reads_and_writes() {
        let store = Store::new();
        let count = Signal::new(3i64);
        let text = MappedSignal::new(&count, IntegerMapping);

        assert_eq!(text.get(&store), "3");
        assert!(text.set(&store, "12".to_string()));
        assert_eq!(store.get(&count), 12);
        assert_eq!(text.get(&store), "12");
    }

    #[test]
    fn test_mapped_signal_rejected_edit_keeps_value() {
        let store = Store::new();
        let count = Signal::new(3i64);
        let text = MappedSignal::new(&count, IntegerMapping);

        let notified = Rc::new(RefCell::new(0));
        let sub = store.subscribe(&count, {
            let notified = notified.clone();
            move || *notified.borrow_mut() += 1
        });

        assert!(!text.set(&store, "3x".to_string()));
        assert!(!text.update(&store, |current| format!("{current}.5")));
        assert_eq!(store.get(&count), 3);
        assert_eq!(*notified.borrow(), 0);

        assert!(text.update(&store, |current| format!("{current}0")));
        assert_eq!(store.get(&count), 30);
        assert_eq!(*notified.borrow(), 1);
        sub.unsubscribe();
    }

    #[test]
    fn test_closure_mapping() {
        let store = Store::new();
        let name = Signal::new("ada".to_string());
        let shouted = MappedSignal::new(
            &name,
            mapping(|v: &String| v.to_uppercase(), |v: &String| Some(v.clone())),
        );

        assert_eq!(shouted.get(&store), "ADA");
        shouted.set(&store, "Grace".to_string());
        assert_eq!(store.get(&name), "Grace");
        assert_eq!(shouted.get(&store), "GRACE");
    }

    #[test]
    fn test_mapped_field() {
        let store = Store::new();
        let form = form_signal(json!({ "bio": { "age": 36 } }));
        let age = MappedField::new(&form, path("bio.age"), IntegerMapping);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = store.subscribe(age.value(), {
            let seen = seen.clone();
            let store = store.clone();
            let age = age.clone();
            move || seen.borrow_mut().push(age.get(&store))
        });

        assert_eq!(age.get(&store), Some("36".to_string()));
        assert!(age.set(&store, "40".to_string()).unwrap());
        assert!(!age.set(&store, "forty".to_string()).unwrap());
        assert_eq!(store.get(&form)["bio"]["age"], json!(40));
        assert_eq!(*seen.borrow(), vec![Some("40".to_string())]);
        sub.unsubscribe();
    }

    #[test]
    fn test_mapped_field_missing_or_mistyped() {
        let store = Store::new();
        let form = form_signal(json!({ "name": "Ada", "bio": {} }));

        let name = MappedField::new(&form, path("name"), IntegerMapping);
        assert_eq!(name.get(&store), None);

        let age = MappedField::new(&form, path("bio.age"), IntegerMapping);
        assert_eq!(age.get(&store), None);
        assert!(age
            .update(&store, |current| {
                assert_eq!(current, None);
                "1".to_string()
            })
            .unwrap());
        assert_eq!(age.get(&store), Some("1".to_string()));

        let nested = MappedField::new(&form, path("missing.age"), IntegerMapping);
        assert!(nested.set(&store, "2".to_string()).is_err());
    }
}
