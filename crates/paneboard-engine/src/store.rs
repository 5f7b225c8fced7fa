//! The pane store: pane identity to its ordered output slots.
//!
//! Built once at initialization, mutated afterward only through slot
//! writes. Most pane types expose one slot; State panes expose exactly two
//! (value and setter).

use ahash::AHashMap;

use paneboard_core::{OutputRef, PaneId, QueryError};

use crate::slot::OutputSlot;

pub(crate) struct PaneStore {
    slots: AHashMap<PaneId, Vec<OutputSlot>>,
}

impl PaneStore {
    pub(crate) fn new() -> Self {
        Self {
            slots: AHashMap::new(),
        }
    }

    /// Register a pane's slots. Returns false when the id is already taken.
    pub(crate) fn insert(&mut self, pane: PaneId, slots: Vec<OutputSlot>) -> bool {
        if self.slots.contains_key(&pane) {
            return false;
        }
        self.slots.insert(pane, slots);
        true
    }

    pub(crate) fn slot(&self, pane: &PaneId, output: usize) -> Option<OutputSlot> {
        self.slots.get(pane)?.get(output).cloned()
    }

    pub(crate) fn resolve(&self, source: &OutputRef) -> Option<OutputSlot> {
        self.slot(&source.pane, source.output)
    }

    pub(crate) fn contains(&self, source: &OutputRef) -> bool {
        self.resolve(source).is_some()
    }

    /// Lookup for the query surface, distinguishing unknown panes from
    /// out-of-range output indices.
    pub(crate) fn lookup(&self, pane: &PaneId, output: usize) -> Result<OutputSlot, QueryError> {
        let slots = self
            .slots
            .get(pane)
            .ok_or_else(|| QueryError::UnknownPane(pane.clone()))?;
        slots.get(output).cloned().ok_or_else(|| QueryError::NoSuchOutput {
            pane: pane.clone(),
            output,
        })
    }
}

impl std::fmt::Debug for PaneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaneStore")
            .field("panes", &self.slots.len())
            .finish()
    }
}
