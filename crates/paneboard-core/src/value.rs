//! Invocable payloads of a State pane's setter slot.
//!
//! A State pane exposes two slots: its value and a setter. The setter is
//! itself a [`Value`] payload so evaluated bodies can receive it as a named
//! input and call it like any other value. Dispatch between "literal new
//! value" and "updater function of the current value" is by downcast:
//! passing a [`ValueUpdater`] to the setter applies it to the current value,
//! anything else replaces the value wholesale.

use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;
use crate::output::Value;

/// The invocable stored in a State pane's setter slot.
///
/// Calling [`set`](Self::set) commits new state transactionally, independent
/// of the dependency graph; downstream panes bound to the value slot re-run
/// exactly as if the value had changed through normal propagation.
#[derive(Clone)]
pub struct StateSetter {
    commit: Rc<dyn Fn(Value)>,
}

impl StateSetter {
    /// Wrap the engine-provided commit closure.
    pub fn new(commit: Rc<dyn Fn(Value)>) -> Self {
        Self { commit }
    }

    /// Commit `value` as the new state. A [`ValueUpdater`] payload is
    /// applied to the current value instead of being stored literally; an
    /// updater failure is swallowed and the state is left unchanged.
    pub fn set(&self, value: Value) {
        (self.commit)(value);
    }
}

impl fmt::Debug for StateSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter").finish_non_exhaustive()
    }
}

/// A function of the current state, recognised by [`StateSetter::set`].
///
/// Receives `Some(current)` when the value slot holds a value, `None`
/// otherwise.
#[derive(Clone)]
pub struct ValueUpdater {
    apply: Rc<dyn Fn(Option<Value>) -> Result<Value, EvalError>>,
}

impl ValueUpdater {
    pub fn new(apply: impl Fn(Option<Value>) -> Result<Value, EvalError> + 'static) -> Self {
        Self {
            apply: Rc::new(apply),
        }
    }

    /// Compute the next state from the current one.
    pub fn apply(&self, current: Option<Value>) -> Result<Value, EvalError> {
        (self.apply)(current)
    }
}

impl fmt::Debug for ValueUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueUpdater").finish_non_exhaustive()
    }
}
