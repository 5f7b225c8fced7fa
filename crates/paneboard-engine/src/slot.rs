//! The output slot: one reactively observable output cell.
//!
//! # Design
//!
//! [`OutputSlot`] wraps an [`Output`] in shared, reference-counted storage.
//! Change detection is by *identity* of the stored `Rc<Output>`, never by
//! structural comparison: every [`write`](OutputSlot::write) of a freshly
//! built output notifies subscribers, re-writing the same shared output is
//! a no-op, and mutating a payload in place behind its `Rc` never notifies.
//!
//! Notifications respect the open [`Transaction`](crate::txn::Transaction):
//! inside a transaction they are deferred (keyed per listener, latest value
//! wins) and fire after commit; outside one they fire immediately.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 per committed change.
//! 2. Subscribers are notified in registration order.
//! 3. Dead subscribers (dropped [`SlotSubscription`] guards) are pruned
//!    lazily during notification.
//! 4. A slot lives for the engine instance's lifetime; slots are never
//!    removed individually.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug_span;
use web_time::Instant;

use paneboard_core::Output;

use crate::txn;

/// A subscriber callback, stored strong in the guard and weak in the slot.
type ListenerRc = Rc<dyn Fn(&Output)>;
type ListenerWeak = Weak<dyn Fn(&Output)>;

struct SlotInner {
    value: Rc<Output>,
    version: u64,
    /// Weak references; dead entries are pruned on notify.
    subscribers: Vec<ListenerWeak>,
}

/// A shared, version-tracked output cell with change notification.
///
/// Cloning an `OutputSlot` creates a new handle to the **same** cell - both
/// handles see the same output and share subscribers.
pub struct OutputSlot {
    inner: Rc<RefCell<SlotInner>>,
}

// Manual Clone: shares the same Rc.
impl Clone for OutputSlot {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for OutputSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("OutputSlot")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl OutputSlot {
    /// Create a slot holding `initial` at version 0 with no subscribers.
    #[must_use]
    pub fn new(initial: Output) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SlotInner {
                value: Rc::new(initial),
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Snapshot of the current output. No side effect, no subscription.
    #[must_use]
    pub fn read(&self) -> Output {
        (*self.inner.borrow().value).clone()
    }

    /// The identity-bearing cell itself. Re-writing this exact `Rc` via
    /// [`write_shared`](Self::write_shared) will not notify.
    #[must_use]
    pub fn read_shared(&self) -> Rc<Output> {
        Rc::clone(&self.inner.borrow().value)
    }

    /// Replace the output with a freshly built one. Always a change by
    /// identity, so subscribers are always notified (post-commit when a
    /// transaction is open).
    pub fn write(&self, next: Output) {
        self.write_shared(Rc::new(next));
    }

    /// Replace the output with a shared one. A no-op when `next` is the
    /// very cell already stored (identity equality); notifies otherwise.
    pub fn write_shared(&self, next: Rc<Output>) {
        {
            let mut inner = self.inner.borrow_mut();
            if Rc::ptr_eq(&inner.value, &next) {
                return;
            }
            inner.value = next;
            inner.version += 1;
        }
        self.notify();
    }

    /// Subscribe to committed changes. The listener receives the new output
    /// once per committed change, starting from the next change (not the
    /// current value).
    ///
    /// Returns a [`SlotSubscription`] guard; dropping it unsubscribes
    /// synchronously.
    pub fn subscribe(&self, listener: impl Fn(&Output) + 'static) -> SlotSubscription {
        let strong: ListenerRc = Rc::new(listener);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        SlotSubscription { _guard: strong }
    }

    /// Version of the current output. Increments by 1 per committed change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered subscribers (dead ones included until pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Notify live subscribers and prune dead ones, deferring through the
    /// open transaction when there is one.
    fn notify(&self) {
        // Collect live callbacks first, to avoid holding the borrow while
        // they run.
        let callbacks: Vec<ListenerRc> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(|w| w.upgrade()).collect()
        };

        if callbacks.is_empty() {
            return;
        }

        if txn::in_transaction() {
            txn::note_slot_changed();
            for cb in callbacks {
                let key = Rc::as_ptr(&cb) as *const () as usize;
                let source = self.clone();
                txn::defer_or_run_keyed(key, move || {
                    let latest = source.read();
                    cb(&latest);
                });
            }
            return;
        }

        let listeners_notified = callbacks.len() as u64;
        let value = self.read();
        let start = Instant::now();
        let _span = debug_span!(
            "paneboard.commit",
            slots_changed = 1_u64,
            listeners_notified,
            duration_us = tracing::field::Empty
        )
        .entered();

        for cb in &callbacks {
            cb(&value);
        }

        tracing::Span::current().record("duration_us", start.elapsed().as_micros() as u64);
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the guard drops the strong reference to the callback, so the
/// weak entry in the slot's subscriber list stops upgrading and the
/// callback never fires again.
pub struct SlotSubscription {
    _guard: ListenerRc,
}

impl std::fmt::Debug for SlotSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotSubscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
