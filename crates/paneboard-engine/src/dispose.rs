//! Disposal signalling for standing computations.
//!
//! A [`DisposeSource`] is the control side held by the engine; cloneable
//! [`DisposeToken`]s are handed to standing tasks and in-flight run
//! continuations. Disposal is logical only: nothing is forcibly aborted,
//! tasks observe the flag and let their remaining work no-op. Dropping the
//! source does **not** dispose - teardown is always explicit.

use std::cell::Cell;
use std::rc::Rc;

use tokio::sync::Notify;

struct DisposeInner {
    disposed: Cell<bool>,
    notify: Notify,
}

/// Control handle that requests disposal.
pub(crate) struct DisposeSource {
    inner: Rc<DisposeInner>,
}

impl DisposeSource {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(DisposeInner {
                disposed: Cell::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// A token observing this source's state.
    pub(crate) fn token(&self) -> DisposeToken {
        DisposeToken {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Request disposal. Idempotent; wakes every waiting task.
    pub(crate) fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.notify.notify_waiters();
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

/// Cloneable view of a [`DisposeSource`].
#[derive(Clone)]
pub(crate) struct DisposeToken {
    inner: Rc<DisposeInner>,
}

impl DisposeToken {
    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Complete once disposal has been requested.
    pub(crate) async fn disposed(&self) {
        while !self.inner.disposed.get() {
            let notified = self.inner.notify.notified();
            if self.inner.disposed.get() {
                break;
            }
            notified.await;
        }
    }
}
