//! Run-lifecycle observability: monotonic counters and structured events.
//!
//! Counters are process-wide and observability-only; no engine behavior
//! reads them back. Structured events go to the `paneboard.run` and
//! `paneboard.import` targets for dashboards and capture in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use paneboard_core::{EvalError, PaneId};

static RUNS_STARTED_TOTAL: AtomicU64 = AtomicU64::new(0);
static STALE_FAILURES_DROPPED_TOTAL: AtomicU64 = AtomicU64::new(0);
static IMPORTS_STARTED_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total run executions started (monotonic counter).
#[must_use]
pub fn runs_started_total() -> u64 {
    RUNS_STARTED_TOTAL.load(Ordering::Relaxed)
}

/// Total failing runs dropped because a newer run had superseded them.
#[must_use]
pub fn stale_failures_dropped_total() -> u64 {
    STALE_FAILURES_DROPPED_TOTAL.load(Ordering::Relaxed)
}

/// Total import resolutions started (monotonic counter).
#[must_use]
pub fn imports_started_total() -> u64 {
    IMPORTS_STARTED_TOTAL.load(Ordering::Relaxed)
}

pub(crate) fn record_run_start(pane: &PaneId, run: u64) {
    RUNS_STARTED_TOTAL.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "paneboard.run",
        pane = %pane,
        run = run,
        "run started"
    );
}

pub(crate) fn record_stale_failure_dropped(pane: &PaneId, run: u64, error: &EvalError) {
    STALE_FAILURES_DROPPED_TOTAL.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "paneboard.run",
        pane = %pane,
        run = run,
        error = %error,
        "stale run failure dropped"
    );
}

pub(crate) fn record_import_start(pane: &PaneId) {
    IMPORTS_STARTED_TOTAL.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        target: "paneboard.import",
        pane = %pane,
        "import started"
    );
}

pub(crate) fn warn_import_failure(pane: &PaneId, error: &EvalError) {
    tracing::warn!(
        target: "paneboard.import",
        pane = %pane,
        error = %error,
        "import failed"
    );
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64 as TestCounter;
    use std::sync::{Arc, Mutex};

    /// Minimal subscriber capturing event targets and levels.
    struct EventCapture {
        next_id: TestCounter,
        events: Arc<Mutex<Vec<(tracing::Level, String)>>>,
    }

    impl tracing::Subscriber for EventCapture {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _attrs: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
        }

        fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}

        fn event(&self, event: &tracing::Event<'_>) {
            self.events.lock().unwrap().push((
                *event.metadata().level(),
                event.metadata().target().to_string(),
            ));
        }

        fn enter(&self, _span: &tracing::span::Id) {}

        fn exit(&self, _span: &tracing::span::Id) {}
    }

    fn capture_events(run: impl FnOnce()) -> Vec<(tracing::Level, String)> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = EventCapture {
            next_id: TestCounter::new(1),
            events: Arc::clone(&events),
        };
        let _guard = tracing::subscriber::set_default(subscriber);
        run();
        let captured = events.lock().unwrap().clone();
        captured
    }

    #[test]
    fn run_start_increments_counter_and_emits_event() {
        let before = runs_started_total();
        let events = capture_events(|| {
            record_run_start(&PaneId::from("a"), 3);
        });
        assert!(runs_started_total() > before);
        assert!(
            events
                .iter()
                .any(|(level, target)| *level == tracing::Level::DEBUG && target == "paneboard.run")
        );
    }

    #[test]
    fn stale_failure_counter_is_monotonic() {
        let before = stale_failures_dropped_total();
        record_stale_failure_dropped(&PaneId::from("b"), 7, &EvalError::new("late"));
        record_stale_failure_dropped(&PaneId::from("b"), 8, &EvalError::new("later"));
        assert!(stale_failures_dropped_total() >= before + 2);
    }

    #[test]
    fn import_failure_emits_warn_event() {
        let events = capture_events(|| {
            record_import_start(&PaneId::from("dep"));
            warn_import_failure(&PaneId::from("dep"), &EvalError::new("404"));
        });
        assert!(
            events
                .iter()
                .any(|(level, target)| *level == tracing::Level::WARN
                    && target == "paneboard.import")
        );
    }
}
