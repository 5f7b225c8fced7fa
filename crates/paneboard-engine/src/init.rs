//! Slot allocation per pane variant.
//!
//! Builds the whole store before anything starts observing or executing.
//! Construction is all-or-nothing: an unsupported variant or a duplicate id
//! fails the build and no tasks have been spawned yet.

use std::rc::Rc;

use paneboard_core::{ConfigError, ExpressionEvaluator, Output, Pane, PaneKind};

use crate::slot::OutputSlot;
use crate::state;
use crate::store::PaneStore;

pub(crate) fn build_store(
    panes: &[Pane],
    evaluator: &dyn ExpressionEvaluator,
) -> Result<PaneStore, ConfigError> {
    let mut store = PaneStore::new();
    for pane in panes {
        let slots = match &pane.kind {
            PaneKind::Evaluate(_) | PaneKind::Import(_) => {
                vec![OutputSlot::new(Output::Waiting)]
            }
            PaneKind::InputText { text } => {
                vec![OutputSlot::new(Output::Value(Rc::new(text.clone())))]
            }
            PaneKind::State(config) => state::state_slots(config, evaluator),
            kind @ (PaneKind::EvaluateGlobal { .. }
            | PaneKind::EvaluateTemplate { .. }
            | PaneKind::EnvironmentVariable { .. }) => {
                return Err(ConfigError::UnsupportedPaneType {
                    pane: pane.id.clone(),
                    kind: kind.name(),
                });
            }
        };
        if !store.insert(pane.id.clone(), slots) {
            return Err(ConfigError::DuplicatePaneId {
                pane: pane.id.clone(),
            });
        }
    }
    Ok(store)
}
