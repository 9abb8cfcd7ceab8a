//! The `Loadable` state type

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Shared, type-erased load error
pub type LoadError = Arc<dyn StdError + Send + Sync>;

/// A load failure described only by a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadFailure {
    message: String,
}

impl LoadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// State of a value that is produced asynchronously
///
/// `Loading` may carry the previous value so consumers can keep showing it
/// while a reload is in progress.
#[derive(Clone, Debug)]
pub enum Loadable<T> {
    /// Nothing requested yet
    Idle,
    /// A load is in progress
    Loading(Option<T>),
    /// The load finished
    Loaded(T),
    /// The load failed
    Error(Option<LoadError>),
}

/// One arm per [`Loadable`] state, used by [`Loadable::map_loadable`]
///
/// `idle` defaults to `loading(None)`.
pub trait LoadableMapper<T> {
    type Output;

    fn idle(&mut self) -> Self::Output {
        self.loading(None)
    }

    fn loading(&mut self, previous: Option<T>) -> Self::Output;

    fn loaded(&mut self, value: T) -> Self::Output;

    fn error(&mut self, error: Option<LoadError>) -> Self::Output;
}

impl<T> Loadable<T> {
    /// A failed load carrying `error`
    pub fn error(error: impl StdError + Send + Sync + 'static) -> Self {
        Loadable::Error(Some(Arc::new(error)))
    }

    /// A failed load described by a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self::error(LoadFailure::new(message))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Loadable::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading(_))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Loadable::Loaded(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Loadable::Error(_))
    }

    /// The loaded value, or the previous value of a reload in progress
    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(value) | Loadable::Loading(Some(value)) => Some(value),
            _ => None,
        }
    }

    /// The error of a failed load, if one was recorded
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            Loadable::Error(error) => error.as_ref(),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Loadable<&T> {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading(previous) => Loadable::Loading(previous.as_ref()),
            Loadable::Loaded(value) => Loadable::Loaded(value),
            Loadable::Error(error) => Loadable::Error(error.clone()),
        }
    }

    /// Fold the state into a single value
    pub fn map_loadable<M: LoadableMapper<T>>(self, mut mapper: M) -> M::Output {
        match self {
            Loadable::Loading(previous) => mapper.loading(previous),
            Loadable::Idle => mapper.idle(),
            Loadable::Error(error) => mapper.error(error),
            Loadable::Loaded(value) => mapper.loaded(value),
        }
    }

    /// Convert the carried value, keeping the state
    pub fn map_value<U, F>(self, f: F) -> Loadable<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading(previous) => Loadable::Loading(previous.map(f)),
            Loadable::Loaded(value) => Loadable::Loaded(f(value)),
            Loadable::Error(error) => Loadable::Error(error),
        }
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T, E> From<Result<T, E>> for Loadable<T>
where
    E: StdError + Send + Sync + 'static,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Loadable::Loaded(value),
            Err(error) => Loadable::error(error),
        }
    }
}

/// Errors are equal when they are the same shared error
impl<T: PartialEq> PartialEq for Loadable<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Loadable::Idle, Loadable::Idle) => true,
            (Loadable::Loading(a), Loadable::Loading(b)) => a == b,
            (Loadable::Loaded(a), Loadable::Loaded(b)) => a == b,
            (Loadable::Error(a), Loadable::Error(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Loadable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loadable::Idle => f.write_str("idle"),
            Loadable::Loading(None) => f.write_str("loading"),
            Loadable::Loading(Some(previous)) => write!(f, "loading ({previous})"),
            Loadable::Loaded(value) => write!(f, "loaded {value}"),
            Loadable::Error(None) => f.write_str("error"),
            Loadable::Error(Some(error)) => write!(f, "error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Describe {
        with_idle: bool,
    }

    impl LoadableMapper<&'static str> for Describe {
        type Output = String;

        fn idle(&mut self) -> String {
            if self.with_idle {
                "idle".to_string()
            } else {
                self.loading(None)
            }
        }

        fn loading(&mut self, previous: Option<&'static str>) -> String {
            match previous {
                Some(value) => format!("loading {value}"),
                None => "loading (no value)".to_string(),
            }
        }

        fn loaded(&mut self, value: &'static str) -> String {
            format!("loaded {value}")
        }

        fn error(&mut self, error: Option<LoadError>) -> String {
            match error {
                Some(error) => format!("error {error}"),
                None => "error (no value)".to_string(),
            }
        }
    }

    struct NoIdle;

    impl LoadableMapper<i32> for NoIdle {
        type Output = &'static str;

        fn loading(&mut self, _: Option<i32>) -> &'static str {
            "loading"
        }

        fn loaded(&mut self, _: i32) -> &'static str {
            "loaded"
        }

        fn error(&mut self, _: Option<LoadError>) -> &'static str {
            "error"
        }
    }

    #[test]
    fn test_map_loadable_without_idle_arm() {
        let mapper = Describe { with_idle: false };
        assert_eq!(Loadable::Idle.map_loadable(mapper), "loading (no value)");
        assert_eq!(Loadable::<i32>::Idle.map_loadable(NoIdle), "loading");
    }

    #[test]
    fn test_map_loadable_every_state() {
        let describe = || Describe { with_idle: true };
        assert_eq!(Loadable::Idle.map_loadable(describe()), "idle");
        assert_eq!(
            Loadable::Loading(Some("127")).map_loadable(describe()),
            "loading 127"
        );
        assert_eq!(
            Loadable::Loading(None).map_loadable(describe()),
            "loading (no value)"
        );
        assert_eq!(Loadable::Loaded("127").map_loadable(describe()), "loaded 127");
        assert_eq!(
            Loadable::<&str>::Error(None).map_loadable(describe()),
            "error (no value)"
        );
        assert_eq!(
            Loadable::<&str>::failure("foobar").map_loadable(describe()),
            "error foobar"
        );
    }

    #[test]
    fn test_map_value_preserves_state() {
        let parse = |s: &str| s.parse::<i32>().unwrap();

        assert_eq!(Loadable::<&str>::Idle.map_value(parse), Loadable::Idle);
        assert_eq!(Loadable::Loaded("127").map_value(parse), Loadable::Loaded(127));
        assert_eq!(
            Loadable::Loading(Some("127")).map_value(parse),
            Loadable::Loading(Some(127))
        );
        assert_eq!(
            Loadable::<&str>::Loading(None).map_value(parse),
            Loadable::Loading(None)
        );
        assert_eq!(
            Loadable::<&str>::Error(None).map_value(parse),
            Loadable::Error(None)
        );
    }

    #[test]
    fn test_map_value_keeps_error() {
        let failed = Loadable::<&str>::failure("foobar");
        let error = failed.load_error().cloned().unwrap();
        let mapped = failed.map_value(|s| s.len());
        assert!(Arc::ptr_eq(mapped.load_error().unwrap(), &error));
        assert_eq!(error.to_string(), "foobar");
    }

    #[test]
    fn test_value() {
        assert_eq!(Loadable::Loaded(1).value(), Some(&1));
        assert_eq!(Loadable::Loading(Some(2)).value(), Some(&2));
        assert_eq!(Loadable::<i32>::Loading(None).value(), None);
        assert_eq!(Loadable::<i32>::Idle.value(), None);
    }

    #[test]
    fn test_predicates() {
        assert!(Loadable::<i32>::default().is_idle());
        assert!(Loadable::<i32>::Loading(None).is_loading());
        assert!(Loadable::Loaded(1).is_loaded());
        assert!(Loadable::<i32>::Error(None).is_error());
    }

    #[test]
    fn test_from_result() {
        let ok: Result<i32, LoadFailure> = Ok(5);
        assert_eq!(Loadable::from(ok), Loadable::Loaded(5));

        let err: Result<i32, LoadFailure> = Err(LoadFailure::new("nope"));
        let loadable = Loadable::from(err);
        assert!(loadable.is_error());
        assert_eq!(loadable.to_string(), "error: nope");
    }

    #[test]
    fn test_errors_compare_by_identity() {
        let a = Loadable::<i32>::failure("same");
        let b = Loadable::<i32>::failure("same");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
