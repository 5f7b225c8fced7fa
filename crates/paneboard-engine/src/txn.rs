//! Transactional batching of slot notifications.
//!
//! A write to an [`OutputSlot`](crate::slot::OutputSlot) inside an open
//! [`Transaction`] updates the slot immediately but defers listener
//! notification until the outermost transaction commits. A batch of changes
//! (an input slot and a downstream pane both recomputed in response to one
//! upstream change, say) is therefore observed by subscribers only after
//! the whole batch settles, never as a torn intermediate graph state.
//!
//! # Invariants
//!
//! 1. Nested transactions are supported: only the outermost commit flushes.
//! 2. Within a transaction, `read()` always returns the latest written
//!    value; only notifications are deferred.
//! 3. Deferred notifications are keyed per listener: the latest value wins,
//!    and a listener fires at most once per commit, in first-enqueue order.
//!
//! # Failure Modes
//!
//! - **Listener panics during commit**: remaining listeners still fire; the
//!   first panic is re-raised once all have been attempted.

use std::cell::RefCell;
use tracing::{debug, debug_span};
use web_time::Instant;

type DeferredNotify = Box<dyn FnOnce()>;

/// Deferred listener call, keyed for in-transaction coalescing.
struct DeferredEntry {
    key: usize,
    notify: DeferredNotify,
}

struct TxnContext {
    /// Nesting depth. Only commit when this reaches 0.
    depth: u32,
    deferred: Vec<DeferredEntry>,
    /// Distinct slot commits coalesced into this transaction.
    slots_changed: u64,
}

thread_local! {
    static TXN_CTX: RefCell<Option<TxnContext>> = const { RefCell::new(None) };
}

/// Returns true if a transaction is open on this thread.
pub fn in_transaction() -> bool {
    TXN_CTX.with(|ctx| ctx.borrow().is_some())
}

/// Enqueue a deferred notification keyed by `key`, or run it immediately
/// when no transaction is open.
///
/// If the key is already queued in the open transaction, the previous
/// callback is replaced so the latest one wins while keeping the original
/// queue position. Returns `true` if deferred.
pub(crate) fn defer_or_run_keyed(key: usize, f: impl FnOnce() + 'static) -> bool {
    TXN_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        if let Some(ref mut txn) = *guard {
            if let Some(entry) = txn.deferred.iter_mut().find(|entry| entry.key == key) {
                entry.notify = Box::new(f);
            } else {
                txn.deferred.push(DeferredEntry {
                    key,
                    notify: Box::new(f),
                });
            }
            true
        } else {
            drop(guard); // Release borrow before calling f.
            f();
            false
        }
    })
}

/// Record one slot commit while a transaction is open.
pub(crate) fn note_slot_changed() {
    TXN_CTX.with(|ctx| {
        if let Some(ref mut txn) = *ctx.borrow_mut() {
            txn.slots_changed = txn.slots_changed.saturating_add(1);
        }
    });
}

/// Flush all deferred notifications. Called by the outermost `Transaction`
/// on drop.
fn commit() {
    let (slots_changed, deferred): (u64, Vec<DeferredNotify>) = TXN_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        if let Some(ref mut txn) = *guard {
            let slots = txn.slots_changed;
            txn.slots_changed = 0;
            let deferred = std::mem::take(&mut txn.deferred)
                .into_iter()
                .map(|entry| entry.notify)
                .collect();
            (slots, deferred)
        } else {
            (0, Vec::new())
        }
    });

    if deferred.is_empty() {
        return;
    }

    let listeners_notified = deferred.len() as u64;
    let start = Instant::now();
    let _span = debug_span!(
        "paneboard.commit",
        slots_changed,
        listeners_notified,
        duration_us = tracing::field::Empty
    )
    .entered();

    // Run the notifications outside the borrow. A panicking listener must
    // not starve the rest.
    let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
    for notify in deferred {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(notify));
        if let Err(payload) = result
            && first_panic.is_none()
        {
            first_panic = Some(payload);
        }
    }

    let duration_us = start.elapsed().as_micros() as u64;
    tracing::Span::current().record("duration_us", duration_us);
    debug!(
        target: "paneboard.txn",
        slots_changed,
        listeners_notified,
        duration_us,
        "transaction committed"
    );

    if let Some(payload) = first_panic {
        std::panic::resume_unwind(payload);
    }
}

/// RAII commit scope.
///
/// While a `Transaction` is alive, slot notifications are deferred. When
/// the outermost `Transaction` drops, all deferred notifications fire.
pub struct Transaction {
    /// Whether this scope is the outermost (responsible for commit).
    is_root: bool,
}

impl Transaction {
    /// Open a transaction. Nested calls increment the depth; only the
    /// outermost scope commits.
    #[must_use]
    pub fn begin() -> Self {
        let is_root = TXN_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match *guard {
                Some(ref mut txn) => {
                    txn.depth += 1;
                    false
                }
                None => {
                    *guard = Some(TxnContext {
                        depth: 1,
                        deferred: Vec::new(),
                        slots_changed: 0,
                    });
                    true
                }
            }
        });
        Self { is_root }
    }

    /// Run `f` inside a transaction and commit on the way out.
    pub fn run<R>(f: impl FnOnce() -> R) -> R {
        let _txn = Transaction::begin();
        f()
    }

    /// Number of deferred notifications queued in the open transaction.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        TXN_CTX.with(|ctx| ctx.borrow().as_ref().map_or(0, |t| t.deferred.len()))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let should_commit = TXN_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            if let Some(ref mut txn) = *guard {
                txn.depth -= 1;
                txn.depth == 0
            } else {
                false
            }
        });

        if should_commit {
            commit();
            TXN_CTX.with(|ctx| {
                *ctx.borrow_mut() = None;
            });
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("is_root", &self.is_root)
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
