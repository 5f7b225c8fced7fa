//! State panes: a value slot paired with an imperative setter slot.
//!
//! The setter commits new state transactionally, independent of the
//! dependency graph - downstream panes bound to the value slot re-run
//! exactly as if the value had changed through normal propagation. An
//! updater function that fails is swallowed and the slot keeps its prior
//! value; the failure is surfaced nowhere.

use std::rc::Rc;

use paneboard_core::{ExpressionEvaluator, Output, StatePane, StateSetter, Value, ValueUpdater};

use crate::slot::OutputSlot;
use crate::txn::Transaction;

/// Allocate the two slots of a State pane: `[value, setter]`.
///
/// A non-blank initial expression is evaluated synchronously with no
/// bindings; its failure seeds the value slot with `Error` rather than
/// failing construction.
pub(crate) fn state_slots(
    config: &StatePane,
    evaluator: &dyn ExpressionEvaluator,
) -> Vec<OutputSlot> {
    let initial = if config.initial_expression.trim().is_empty() {
        Output::Waiting
    } else {
        match evaluator.eval_now(&config.initial_expression) {
            Ok(value) => Output::Value(value),
            Err(error) => Output::Error(error),
        }
    };

    let value_slot = OutputSlot::new(initial);
    let setter = make_setter(value_slot.clone());
    let setter_slot = OutputSlot::new(Output::Value(Rc::new(setter)));
    vec![value_slot, setter_slot]
}

/// Build the setter payload committing into `value_slot`.
pub(crate) fn make_setter(value_slot: OutputSlot) -> StateSetter {
    StateSetter::new(Rc::new(move |incoming: Value| {
        let next = match incoming.downcast_ref::<ValueUpdater>().cloned() {
            Some(updater) => {
                let current = value_slot.read().as_value().cloned();
                match updater.apply(current) {
                    Ok(value) => value,
                    Err(_) => return,
                }
            }
            None => incoming,
        };
        Transaction::run(|| value_slot.write(Output::Value(next)));
    }))
}
