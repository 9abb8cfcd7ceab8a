//! Path lenses over JSON form values
//!
//! Plain functions read and write a [`Value`] at a [`FieldPath`]; the
//! reactive helpers expose one field of a form signal as its own derived
//! value and write it back through the form.
//!
//! A form signal holds a [`FormData`], a shared `Value`, so reading it
//! from every field lens does not copy the whole form.

use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use lumen_core::{Derived, Signal, Store};

use crate::error::{FormError, Result};
use crate::path::{FieldPath, PathSegment};

/// The value at `path`, if present
pub fn value_at<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.into_iter()
        .try_fold(value, |current, segment| child(current, segment))
}

fn child<'a>(value: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
        (Value::Object(map), PathSegment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

/// Deserialize the value at `path`
pub fn typed_value_at<T: DeserializeOwned>(value: &Value, path: &FieldPath) -> Result<T> {
    let found = value_at(value, path).ok_or_else(|| FormError::PathNotFound(path.clone()))?;
    Ok(T::deserialize(found)?)
}

/// Replace the value at `path`
///
/// Every parent must exist. The last segment may add a new object key or
/// append to an array (index equal to its length).
pub fn set_value_at(root: &mut Value, path: &FieldPath, new_value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = new_value;
        return Ok(());
    };

    let mut parent = root;
    for (depth, segment) in parents.iter().enumerate() {
        parent = match child_mut(parent, segment) {
            Some(next) => next,
            None => return Err(FormError::PathNotFound(path.prefix(depth + 1))),
        };
    }

    match (parent, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), new_value);
        }
        (Value::Object(map), PathSegment::Index(index)) => {
            map.insert(index.to_string(), new_value);
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            if *index < len {
                items[*index] = new_value;
            } else if *index == len {
                items.push(new_value);
            } else {
                return Err(FormError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                    len,
                });
            }
        }
        (Value::Array(_), PathSegment::Key(_)) => {
            return Err(FormError::PathNotFound(path.clone()));
        }
        _ => return Err(FormError::NotAContainer(path.prefix(parents.len()))),
    }
    Ok(())
}

/// Replace the value at `path` with `f` of the current one
///
/// A missing field is passed to `f` as `null`.
pub fn update_value_at<F>(root: &mut Value, path: &FieldPath, f: F) -> Result<()>
where
    F: FnOnce(&Value) -> Value,
{
    let next = match value_at(root, path) {
        Some(current) => f(current),
        None => f(&Value::Null),
    };
    set_value_at(root, path, next)
}

// ============================================================================
// Reactive lenses
// ============================================================================

/// The value held by a form signal
pub type FormData = Rc<Value>;

/// Create a form signal holding `initial`
pub fn form_signal(initial: Value) -> Signal<FormData> {
    Signal::new(Rc::new(initial))
}

/// One field of a form as a derived value
///
/// Reads `null` while the field does not exist.
pub fn field_value(form: &Signal<FormData>, path: FieldPath) -> Derived<Value> {
    let label = format!("field:{path}");
    let form = form.clone();
    Derived::new(move |get| {
        let value = get.get(&form);
        value_at(&value, &path).cloned().unwrap_or(Value::Null)
    })
    .with_label(label)
}

/// Write one field of a form
pub fn set_field_value(
    store: &Store,
    form: &Signal<FormData>,
    path: &FieldPath,
    value: Value,
) -> Result<()> {
    let mut next = Value::clone(&store.get(form));
    set_value_at(&mut next, path, value)?;
    tracing::trace!(path = %path, "field value set");
    store.set(form, Rc::new(next));
    Ok(())
}

/// Update one field of a form from its current value
pub fn update_field_value<F>(
    store: &Store,
    form: &Signal<FormData>,
    path: &FieldPath,
    f: F,
) -> Result<()>
where
    F: FnOnce(&Value) -> Value,
{
    let mut next = Value::clone(&store.get(form));
    update_value_at(&mut next, path, f)?;
    store.set(form, Rc::new(next));
    Ok(())
}

/// Serialize `value` into one field of a form
pub fn set_field_serialized<T: Serialize>(
    store: &Store,
    form: &Signal<FormData>,
    path: &FieldPath,
    value: &T,
) -> Result<()> {
    set_field_value(store, form, path, serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn sample() -> Value {
        json!({
            "name": "Ada",
            "bio": { "age": 36 },
            "items": [{ "type": "book" }, { "type": "pen" }]
        })
    }

    #[test]
    fn test_value_at() {
        let form = sample();
        assert_eq!(value_at(&form, &path("name")), Some(&json!("Ada")));
        assert_eq!(value_at(&form, &path("bio.age")), Some(&json!(36)));
        assert_eq!(value_at(&form, &path("items.1.type")), Some(&json!("pen")));
        assert_eq!(value_at(&form, &FieldPath::root()), Some(&form));
        assert_eq!(value_at(&form, &path("items.5")), None);
        assert_eq!(value_at(&form, &path("name.first")), None);
    }

    #[test]
    fn test_typed_value_at() {
        let form = sample();
        let age: u32 = typed_value_at(&form, &path("bio.age")).unwrap();
        assert_eq!(age, 36);

        assert!(matches!(
            typed_value_at::<u32>(&form, &path("bio.height")),
            Err(FormError::PathNotFound(_))
        ));
        assert!(matches!(
            typed_value_at::<u32>(&form, &path("name")),
            Err(FormError::Json(_))
        ));
    }

    #[test]
    fn test_set_value_at() {
        let mut form = sample();
        set_value_at(&mut form, &path("bio.age"), json!(37)).unwrap();
        set_value_at(&mut form, &path("bio.city"), json!("London")).unwrap();
        set_value_at(&mut form, &path("items.2"), json!({ "type": "ink" })).unwrap();

        assert_eq!(form["bio"], json!({ "age": 37, "city": "London" }));
        assert_eq!(form["items"][2]["type"], json!("ink"));
    }

    #[test]
    fn test_set_value_at_root() {
        let mut form = sample();
        set_value_at(&mut form, &FieldPath::root(), json!(null)).unwrap();
        assert_eq!(form, Value::Null);
    }

    #[test]
    fn test_set_value_at_errors() {
        let mut form = sample();
        assert!(matches!(
            set_value_at(&mut form, &path("missing.child"), json!(1)),
            Err(FormError::PathNotFound(p)) if p.to_string() == "missing"
        ));
        assert!(matches!(
            set_value_at(&mut form, &path("name.first"), json!(1)),
            Err(FormError::NotAContainer(p)) if p.to_string() == "name"
        ));
        assert!(matches!(
            set_value_at(&mut form, &path("items.9"), json!(1)),
            Err(FormError::IndexOutOfBounds { index: 9, len: 2, .. })
        ));
        assert_eq!(form, sample());
    }

    #[test]
    fn test_update_value_at() {
        let mut form = sample();
        update_value_at(&mut form, &path("bio.age"), |age| {
            json!(age.as_u64().unwrap_or_default() + 1)
        })
        .unwrap();
        update_value_at(&mut form, &path("bio.nickname"), |current| {
            assert!(current.is_null());
            json!("A")
        })
        .unwrap();
        assert_eq!(form["bio"], json!({ "age": 37, "nickname": "A" }));
    }

    #[test]
    fn test_field_value_tracks_form() {
        let store = Store::new();
        let form = form_signal(sample());
        let name = field_value(&form, path("name"));
        let age = field_value(&form, path("bio.age"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = store.subscribe(&name, {
            let seen = seen.clone();
            let store = store.clone();
            let name = name.clone();
            move || seen.borrow_mut().push(store.get(&name))
        });

        set_field_value(&store, &form, &path("bio.age"), json!(40)).unwrap();
        assert_eq!(store.get(&age), json!(40));
        assert!(seen.borrow().is_empty());

        set_field_value(&store, &form, &path("name"), json!("Grace")).unwrap();
        assert_eq!(*seen.borrow(), vec![json!("Grace")]);
        sub.unsubscribe();
    }

    #[test]
    fn test_field_value_missing_is_null() {
        let store = Store::new();
        let form = form_signal(json!({}));
        let field = field_value(&form, path("a.b"));
        assert_eq!(store.get(&field), Value::Null);
    }

    #[test]
    fn test_set_field_serialized() {
        #[derive(Serialize)]
        struct Item {
            r#type: &'static str,
        }

        let store = Store::new();
        let form = form_signal(sample());
        set_field_serialized(&store, &form, &path("items.0"), &Item { r#type: "lamp" }).unwrap();
        update_field_value(&store, &form, &path("name"), |_| json!("Lin")).unwrap();

        let value = store.get(&form);
        assert_eq!(value["items"][0], json!({ "type": "lamp" }));
        assert_eq!(value["name"], json!("Lin"));
    }

    #[test]
    fn test_rejected_write_keeps_form() {
        let store = Store::new();
        let form = form_signal(sample());
        let before = store.get(&form);

        assert!(set_field_value(&store, &form, &path("items.9"), json!(1)).is_err());
        assert!(Rc::ptr_eq(&before, &store.get(&form)));

        set_field_value(&store, &form, &path("name"), json!("Grace")).unwrap();
        assert!(!Rc::ptr_eq(&before, &store.get(&form)));
        assert_eq!(before["name"], json!("Ada"));
    }
}
