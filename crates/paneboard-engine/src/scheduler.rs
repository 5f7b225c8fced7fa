//! The run scheduler: a standing computation per evaluatable pane.
//!
//! # Design
//!
//! Each Evaluate pane gets one standing task. The pane body is compiled
//! once; after that, every execution reads its named inputs, subscribes to
//! exactly the slots it actually read (the read set), and - when every
//! input holds a value - invokes the compiled callable as a separately
//! spawned continuation. Any committed change to a read-set slot wakes the
//! standing task for a re-execution; wake-ups from one commit coalesce.
//!
//! Executions may overlap: a new execution starts while an older
//! continuation is still suspended. A monotonic run counter identifies the
//! most recently started run. Staleness gates *failure* reports only -
//! a superseded run that eventually succeeds still writes its value, and a
//! run's external side effects cannot be undone. Cancellation is logical:
//! disposal stops the standing task and turns writes from in-flight
//! continuations into no-ops.
//!
//! # Invariants
//!
//! 1. The read set equals the slots read during the most recent execution's
//!    synchronous prefix; inputs after the first unready one are neither
//!    read nor subscribed.
//! 2. A pane never subscribes to its own output slot.
//! 3. The run counter increments exactly once per execution and is never
//!    exposed.

use std::cell::Cell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tokio::sync::mpsc;

use paneboard_core::{
    CompileRequest, CompiledBody, ConfigError, EvalError, EvalMode, EvaluatePane,
    ExpressionEvaluator, Output, OutputRef, PaneId, SourceTransformer, Value,
};

use crate::dispose::DisposeToken;
use crate::metrics;
use crate::slot::{OutputSlot, SlotSubscription};
use crate::store::PaneStore;
use crate::txn::Transaction;

/// A declared input that participates in the callable's parameter list.
#[derive(Debug)]
pub(crate) struct NamedInput {
    pub(crate) name: String,
    pub(crate) source: Option<OutputRef>,
}

/// Partition and validate a pane's declared inputs.
///
/// Every input must carry a source binding and every binding must resolve
/// to a slot that already exists in the store; both checks fail
/// construction before anything starts observing.
pub(crate) fn validate_inputs(
    pane: &PaneId,
    config: &EvaluatePane,
    store: &PaneStore,
) -> Result<Vec<NamedInput>, ConfigError> {
    let mut named = Vec::new();
    for input in &config.inputs {
        let Some(source) = &input.source else {
            return Err(ConfigError::MissingInputSource {
                pane: pane.clone(),
                input: input.id.clone(),
            });
        };
        if !store.contains(source) {
            return Err(ConfigError::UnknownInputSource {
                pane: pane.clone(),
                source_pane: source.pane.clone(),
                output: source.output,
            });
        }
        if let Some(name) = &input.name {
            named.push(NamedInput {
                name: name.clone(),
                source: Some(source.clone()),
            });
        }
    }
    Ok(named)
}

/// Everything the standing task needs, gathered at construction.
pub(crate) struct EvaluatorSpec {
    pub(crate) pane: PaneId,
    pub(crate) config: EvaluatePane,
    pub(crate) named: Vec<NamedInput>,
    pub(crate) out: OutputSlot,
    pub(crate) store: Rc<PaneStore>,
    pub(crate) globals: Rc<Vec<(String, Value)>>,
    pub(crate) evaluator: Rc<dyn ExpressionEvaluator>,
    pub(crate) transformer: Option<Rc<dyn SourceTransformer>>,
    pub(crate) disposal: DisposeToken,
}

/// Spawn the setup task: compile once, then run the standing computation.
///
/// A transform or compile failure surfaces as `Error` on the pane's slot
/// and the standing computation never starts.
pub(crate) fn spawn_evaluator(spec: EvaluatorSpec) {
    tokio::task::spawn_local(async move {
        let EvaluatorSpec {
            pane,
            config,
            named,
            out,
            store,
            globals,
            evaluator,
            transformer,
            disposal,
        } = spec;

        let body = match compile(
            &config,
            &named,
            &globals,
            evaluator.as_ref(),
            transformer.as_deref(),
        )
        .await
        {
            Ok(body) => body,
            Err(error) => {
                if !disposal.is_disposed() {
                    tracing::warn!(
                        target: "paneboard.run",
                        pane = %pane,
                        error = %error,
                        "pane body failed to compile"
                    );
                    Transaction::run(|| out.write(Output::Error(error)));
                }
                return;
            }
        };
        if disposal.is_disposed() {
            return;
        }

        let global_values = globals.iter().map(|(_, value)| Rc::clone(value)).collect();
        let state = Rc::new(RunState {
            pane,
            out,
            store,
            named,
            global_values,
            body,
            counter: Cell::new(0),
            disposal,
        });
        drive(state).await;
    });
}

async fn compile(
    config: &EvaluatePane,
    named: &[NamedInput],
    globals: &[(String, Value)],
    evaluator: &dyn ExpressionEvaluator,
    transformer: Option<&dyn SourceTransformer>,
) -> Result<CompiledBody, EvalError> {
    // Text panes resolve to their raw source; the evaluator is never
    // consulted.
    if config.mode == EvalMode::Text {
        let text: Value = Rc::new(config.source.clone());
        let body: CompiledBody = Rc::new(
            move |_args: Vec<Value>| -> LocalBoxFuture<'static, Result<Value, EvalError>> {
                let text = Rc::clone(&text);
                Box::pin(async move { Ok(text) })
            },
        );
        return Ok(body);
    }

    let source = if config.transforms.is_empty() {
        config.source.clone()
    } else {
        match transformer {
            Some(t) => t.transform(&config.source, &config.transforms)?,
            None => return Err(EvalError::new("no source transformer configured")),
        }
    };

    let named_idents: Vec<String> = named.iter().map(|input| input.name.clone()).collect();
    let global_idents: Vec<String> = globals.iter().map(|(name, _)| name.clone()).collect();
    evaluator
        .compile(CompileRequest {
            source: &source,
            mode: config.mode,
            named_inputs: &named_idents,
            globals: &global_idents,
        })
        .await
}

struct RunState {
    pane: PaneId,
    out: OutputSlot,
    store: Rc<PaneStore>,
    named: Vec<NamedInput>,
    global_values: Vec<Value>,
    body: CompiledBody,
    counter: Cell<u64>,
    disposal: DisposeToken,
}

/// The standing computation: execute, then wait for a read-set wake-up.
async fn drive(state: Rc<RunState>) {
    let (wake_tx, mut wake_rx) = mpsc::unbounded_channel::<()>();
    let mut read_subs: Vec<SlotSubscription> = Vec::new();
    let disposal = state.disposal.clone();

    loop {
        if disposal.is_disposed() {
            break;
        }
        execute(&state, &wake_tx, &mut read_subs);
        tokio::select! {
            _ = disposal.disposed() => break,
            wake = wake_rx.recv() => {
                if wake.is_none() {
                    break;
                }
                // One committed transaction may touch several read slots;
                // coalesce into a single re-execution.
                while wake_rx.try_recv().is_ok() {}
            }
        }
    }
}

/// One execution's synchronous prefix: bump the run counter, rebuild the
/// read set, resolve inputs, and - when all hold values - spawn the
/// continuation.
fn execute(
    state: &Rc<RunState>,
    wake_tx: &mpsc::UnboundedSender<()>,
    read_subs: &mut Vec<SlotSubscription>,
) {
    let this_run = state.counter.get() + 1;
    state.counter.set(this_run);
    metrics::record_run_start(&state.pane, this_run);
    let _span = tracing::debug_span!("pane.run", pane = %state.pane, run = this_run).entered();

    read_subs.clear();
    let mut args: Vec<Value> = state.global_values.clone();
    for input in &state.named {
        // An unconnected input stalls the run without touching the slot.
        // Setup validation rejects the shape, so this is unreachable
        // through the public constructor; the not-yet-ready case below
        // writes Waiting instead.
        let Some(source) = &input.source else {
            return;
        };
        let Some(slot) = state.store.resolve(source) else {
            return;
        };
        read_subs.push(slot.subscribe({
            let wake = wake_tx.clone();
            move |_| {
                let _ = wake.send(());
            }
        }));
        match slot.read() {
            Output::Value(value) => args.push(value),
            _ => {
                Transaction::run(|| state.out.write(Output::Waiting));
                return;
            }
        }
    }

    let call = (state.body)(args);
    tokio::task::spawn_local(finish_run(Rc::clone(state), this_run, call));
}

/// Await one invocation and write its outcome.
async fn finish_run(
    state: Rc<RunState>,
    this_run: u64,
    call: LocalBoxFuture<'static, Result<Value, EvalError>>,
) {
    let settled = Cell::new(false);
    let (result, ()) = tokio::join!(
        async {
            let result = call.await;
            settled.set(true);
            result
        },
        async {
            // One scheduling turn later: a still-pending call whose run is
            // still current surfaces the advisory Running state.
            tokio::task::yield_now().await;
            if !settled.get() && this_run == state.counter.get() && !state.disposal.is_disposed() {
                Transaction::run(|| state.out.write(Output::Running));
            }
        },
    );

    if state.disposal.is_disposed() {
        tracing::debug!(
            target: "paneboard.run",
            pane = %state.pane,
            run = this_run,
            "write after disposal ignored"
        );
        return;
    }

    match result {
        // Success writes are not gated on the run counter; only failures
        // are. A superseded run that eventually succeeds still overwrites
        // newer output.
        Ok(value) => Transaction::run(|| state.out.write(Output::Value(value))),
        Err(error) => {
            if this_run == state.counter.get() {
                Transaction::run(|| state.out.write(Output::Error(error)));
            } else {
                metrics::record_stale_failure_dropped(&state.pane, this_run, &error);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
