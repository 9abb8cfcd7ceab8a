//! Validation issues keyed by field path

use std::fmt;

use serde::{Deserialize, Serialize};

use lumen_core::{Derived, Source};
use lumen_loadable::Loadable;

use crate::path::FieldPath;

/// One validation message for one field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub path: FieldPath,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every validation issue of a form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    issues: Vec<FieldIssue>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: FieldPath, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            path,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldIssue> {
        self.issues.iter()
    }

    /// Issues for `path` and every field below it
    pub fn errors_at(&self, path: &FieldPath) -> FieldErrors {
        self.issues
            .iter()
            .filter(|issue| issue.path.starts_with(path))
            .cloned()
            .collect()
    }

    /// Check if `path` or a field below it has an issue
    pub fn has_errors_at(&self, path: &FieldPath) -> bool {
        self.issues.iter().any(|issue| issue.path.starts_with(path))
    }
}

impl FromIterator<FieldIssue> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldIssue>>(iter: I) -> Self {
        Self {
            issues: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldIssue;
    type IntoIter = std::slice::Iter<'a, FieldIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

/// The issues of one field, following the loading state of the form errors
pub fn field_errors<S>(errors: &S, path: FieldPath) -> Derived<Loadable<FieldErrors>>
where
    S: Source<Loadable<FieldErrors>>,
{
    let errors = errors.clone();
    Derived::new(move |get| get.get(&errors).map_value(|all| all.errors_at(&path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Signal, Store};

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn sample() -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.push(path("name"), "required");
        errors.push(path("items.0.type"), "unknown type");
        errors.push(path("items.1.count"), "must be positive");
        errors
    }

    #[test]
    fn test_errors_at() {
        let errors = sample();
        assert_eq!(errors.errors_at(&path("name")).len(), 1);
        assert_eq!(errors.errors_at(&path("items")).len(), 2);
        assert!(errors.errors_at(&path("email")).is_empty());
        assert_eq!(errors.errors_at(&FieldPath::root()), errors);
        assert!(errors.has_errors_at(&path("items.1")));
        assert!(!errors.has_errors_at(&path("items.2")));
    }

    #[test]
    fn test_display() {
        let errors = sample();
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(rendered[0], "name: required");

        let mut root = FieldErrors::new();
        root.push(FieldPath::root(), "form is empty");
        assert_eq!(root.iter().next().unwrap().to_string(), "form is empty");
    }

    #[test]
    fn test_serde() {
        let mut errors = FieldErrors::new();
        errors.push(path("items.0"), "bad");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "path": ["items", 0], "message": "bad" }])
        );
    }

    #[test]
    fn test_reactive_field_errors() {
        let store = Store::new();
        let errors = Signal::new(Loadable::<FieldErrors>::Idle);
        let name_errors = field_errors(&errors, path("name"));

        assert!(store.get(&name_errors).is_idle());

        store.set(&errors, Loadable::Loading(None));
        assert!(store.get(&name_errors).is_loading());

        store.set(&errors, Loadable::Loaded(sample()));
        let loaded = store.get(&name_errors);
        assert_eq!(loaded.value().map(FieldErrors::len), Some(1));
    }
}
