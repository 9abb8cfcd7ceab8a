//! When to show validation errors
//!
//! A form uses one [`ErrorsStrategy`] until it is first submitted and
//! another one afterwards. [`ErrorsDisplay`] tracks the submission and
//! answers, for each field or form event, whether a field should refresh
//! its displayed errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Events that refresh displayed errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorsStrategy {
    /// Every change of the field's value
    OnChange,
    /// The field losing focus
    OnBlur,
    /// Form submission
    #[default]
    OnSubmit,
    /// Change or blur
    OnTouched,
    /// Change, blur or submission
    All,
}

/// Events raised by a single field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldEvent {
    Change,
    Blur,
}

/// Events raised by the form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormEvent {
    Submit,
    /// Refresh every field regardless of strategy
    UpdateAllErrors,
}

impl ErrorsStrategy {
    pub fn on_field_event(self, event: FieldEvent) -> bool {
        match (self, event) {
            (ErrorsStrategy::OnChange, FieldEvent::Change) => true,
            (ErrorsStrategy::OnBlur, FieldEvent::Blur) => true,
            (ErrorsStrategy::OnTouched | ErrorsStrategy::All, _) => true,
            _ => false,
        }
    }

    pub fn on_submit(self) -> bool {
        matches!(self, ErrorsStrategy::OnSubmit | ErrorsStrategy::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorsStrategy::OnChange => "onChange",
            ErrorsStrategy::OnBlur => "onBlur",
            ErrorsStrategy::OnSubmit => "onSubmit",
            ErrorsStrategy::OnTouched => "onTouched",
            ErrorsStrategy::All => "all",
        }
    }
}

impl fmt::Display for ErrorsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown strategy name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error strategy `{0}`")]
pub struct UnknownStrategy(pub String);

impl FromStr for ErrorsStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onChange" => Ok(ErrorsStrategy::OnChange),
            "onBlur" => Ok(ErrorsStrategy::OnBlur),
            "onSubmit" => Ok(ErrorsStrategy::OnSubmit),
            "onTouched" => Ok(ErrorsStrategy::OnTouched),
            "all" => Ok(ErrorsStrategy::All),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Pre- and post-submit strategies of one form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorsDisplay {
    pre_submit: ErrorsStrategy,
    post_submit: ErrorsStrategy,
    submitted: bool,
}

impl ErrorsDisplay {
    pub fn new(pre_submit: ErrorsStrategy, post_submit: ErrorsStrategy) -> Self {
        Self {
            pre_submit,
            post_submit,
            submitted: false,
        }
    }

    /// The strategy in effect right now
    pub fn active(&self) -> ErrorsStrategy {
        if self.submitted {
            self.post_submit
        } else {
            self.pre_submit
        }
    }

    pub fn has_submitted(&self) -> bool {
        self.submitted
    }

    /// Check if a field event should refresh that field's errors
    pub fn on_field_event(&self, event: FieldEvent) -> bool {
        self.active().on_field_event(event)
    }

    /// Check if a form event should refresh the fields' errors
    ///
    /// The first submission is judged by the pre-submit strategy, then
    /// switches the form to the post-submit strategy.
    pub fn on_form_event(&mut self, event: FormEvent) -> bool {
        match event {
            FormEvent::UpdateAllErrors => true,
            FormEvent::Submit => {
                let refresh = self.active().on_submit();
                if !self.submitted {
                    tracing::debug!(
                        from = %self.pre_submit,
                        to = %self.post_submit,
                        "form submitted, switching error strategy"
                    );
                    self.submitted = true;
                }
                refresh
            }
        }
    }

    /// Forget the submission
    pub fn reset(&mut self) {
        self.submitted = false;
    }
}

impl Default for ErrorsDisplay {
    fn default() -> Self {
        Self::new(ErrorsStrategy::OnSubmit, ErrorsStrategy::OnBlur)
    }
}
