//! The tagged output union held by every pane output slot.
//!
//! # Design
//!
//! A pane's output is always in exactly one of four states: it has not run
//! yet (or an input is unavailable), it is mid-run, it produced a value, or
//! it failed. Payloads are dynamically typed ([`Value`]); the engine never
//! inspects them, it only moves them between slots and callables.
//!
//! Change detection downstream is by *identity*, not structure: replacing a
//! slot's `Output` notifies observers, mutating a payload behind its `Rc`
//! never does. [`Value`] payloads therefore compare with [`Rc::ptr_eq`].

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;

/// Dynamically typed payload produced by evaluations and supplied as
/// globals. Cheap to clone; identity-comparable with [`Rc::ptr_eq`].
pub type Value = Rc<dyn Any>;

/// The state of one pane output at one instant.
#[derive(Clone)]
pub enum Output {
    /// Not evaluated yet, or an upstream input is unavailable.
    Waiting,
    /// A run is in flight and has not settled within one scheduling turn.
    /// Advisory only; never a correctness gate.
    Running,
    /// The most recent run produced this payload.
    Value(Value),
    /// The most recent attributed run failed.
    Error(EvalError),
}

/// Discriminant of an [`Output`], for logging and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Waiting,
    Running,
    Value,
    Error,
}

impl Output {
    /// Discriminant of this output.
    #[must_use]
    pub fn kind(&self) -> OutputKind {
        match self {
            Output::Waiting => OutputKind::Waiting,
            Output::Running => OutputKind::Running,
            Output::Value(_) => OutputKind::Value,
            Output::Error(_) => OutputKind::Error,
        }
    }

    /// True when this output holds a value payload.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Output::Value(_))
    }

    /// The value payload, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The failure payload, if any.
    #[must_use]
    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Output::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Waiting => f.write_str("Waiting"),
            Output::Running => f.write_str("Running"),
            Output::Value(_) => f.write_str("Value(..)"),
            Output::Error(e) => write!(f, "Error({e})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Output::Waiting.kind(), OutputKind::Waiting);
        assert_eq!(Output::Running.kind(), OutputKind::Running);
        assert_eq!(Output::Value(Rc::new(1i64)).kind(), OutputKind::Value);
        assert_eq!(
            Output::Error(EvalError::new("boom")).kind(),
            OutputKind::Error
        );
    }

    #[test]
    fn value_accessors() {
        let out = Output::Value(Rc::new(7i64));
        assert!(out.is_value());
        let payload = out.as_value().unwrap();
        assert_eq!(*payload.downcast_ref::<i64>().unwrap(), 7);
        assert!(out.as_error().is_none());
    }

    #[test]
    fn payload_identity_survives_clone() {
        let payload: Value = Rc::new("shared".to_string());
        let out = Output::Value(Rc::clone(&payload));
        let cloned = out.clone();
        assert!(Rc::ptr_eq(cloned.as_value().unwrap(), &payload));
    }

    #[test]
    fn debug_format_names_variant() {
        assert_eq!(format!("{:?}", Output::Waiting), "Waiting");
        let dbg = format!("{:?}", Output::Error(EvalError::new("nope")));
        assert!(dbg.contains("nope"));
    }
}
