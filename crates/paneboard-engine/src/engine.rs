//! The public engine surface: construction, queries, subscription,
//! imperative value injection, and teardown.
//!
//! An [`Engine`] owns one canvas worth of output slots and standing
//! computations. Instances are independent - there is no process-wide
//! state beyond observability counters - and any number can coexist.
//!
//! The engine must be constructed and driven inside a
//! [`tokio::task::LocalSet`] on a current-thread runtime: construction
//! spawns the standing tasks with `spawn_local`.

use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::debug;

use paneboard_core::{
    ConfigError, ExpressionEvaluator, ModuleLoader, Output, Pane, PaneId, PaneKind, QueryError,
    SourceTransformer, Value,
};

use crate::dispose::DisposeSource;
use crate::import;
use crate::init;
use crate::scheduler;
use crate::slot::SlotSubscription;
use crate::store::PaneStore;
use crate::txn::Transaction;

/// Construction options: the collaborators and the global bindings handed
/// to every compiled body.
pub struct EngineOptions {
    /// Global bindings, passed to bodies by reference identity in
    /// declaration order, ahead of named-input values.
    pub globals: Vec<(String, Value)>,
    pub evaluator: Rc<dyn ExpressionEvaluator>,
    pub transformer: Option<Rc<dyn SourceTransformer>>,
    pub loader: Option<Rc<dyn ModuleLoader>>,
}

impl EngineOptions {
    pub fn new(evaluator: Rc<dyn ExpressionEvaluator>) -> Self {
        Self {
            globals: Vec::new(),
            evaluator,
            transformer: None,
            loader: None,
        }
    }

    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.push((name.into(), value));
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Rc<dyn SourceTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Rc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("globals", &self.globals.len())
            .field("has_transformer", &self.transformer.is_some())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

/// One canvas worth of slots and standing computations.
pub struct Engine {
    store: Rc<PaneStore>,
    dispose: DisposeSource,
}

impl Engine {
    /// Build the store, validate the whole configuration, then start the
    /// standing computations and import tasks.
    ///
    /// Fails fatally - with nothing spawned and nothing observable - if any
    /// Evaluate pane has an input with no source binding or a binding to a
    /// nonexistent slot, if any pane has an unsupported variant, on
    /// duplicate pane ids, or when a declared transform/module has no
    /// matching collaborator.
    pub fn new(panes: Vec<Pane>, options: EngineOptions) -> Result<Self, ConfigError> {
        let store = init::build_store(&panes, options.evaluator.as_ref())?;

        // Validate every pane before spawning anything: construction is
        // all-or-nothing.
        let mut named_by_pane = Vec::with_capacity(panes.len());
        for pane in &panes {
            let named = match &pane.kind {
                PaneKind::Evaluate(config) => {
                    if !config.transforms.is_empty() && options.transformer.is_none() {
                        return Err(ConfigError::MissingTransformer {
                            pane: pane.id.clone(),
                        });
                    }
                    Some(scheduler::validate_inputs(&pane.id, config, &store)?)
                }
                PaneKind::Import(config) => {
                    if config.module.is_some() && options.loader.is_none() {
                        return Err(ConfigError::MissingLoader {
                            pane: pane.id.clone(),
                        });
                    }
                    None
                }
                _ => None,
            };
            named_by_pane.push(named);
        }

        let store = Rc::new(store);
        let dispose = DisposeSource::new();
        let globals = Rc::new(options.globals);
        let pane_count = panes.len();

        for (pane, named) in panes.into_iter().zip(named_by_pane) {
            let Some(out) = store.slot(&pane.id, 0) else {
                continue;
            };
            match pane.kind {
                PaneKind::Evaluate(config) => {
                    scheduler::spawn_evaluator(scheduler::EvaluatorSpec {
                        pane: pane.id,
                        config,
                        named: named.unwrap_or_default(),
                        out,
                        store: Rc::clone(&store),
                        globals: Rc::clone(&globals),
                        evaluator: Rc::clone(&options.evaluator),
                        transformer: options.transformer.clone(),
                        disposal: dispose.token(),
                    });
                }
                PaneKind::Import(config) => {
                    import::spawn_import(
                        pane.id,
                        config,
                        out,
                        options.loader.clone(),
                        dispose.token(),
                    );
                }
                _ => {}
            }
        }

        debug!(target: "paneboard.engine", panes = pane_count, "engine constructed");
        Ok(Self { store, dispose })
    }

    /// Synchronous snapshot of one output. No subscription is created;
    /// repeated reads with no intervening writes return identical outputs.
    pub fn output(&self, pane: &PaneId, output: usize) -> Result<Output, QueryError> {
        Ok(self.store.lookup(pane, output)?.read())
    }

    /// The output's value payload: immediately when the slot already holds
    /// a value, otherwise once it first transitions to one.
    ///
    /// Never resolves if the slot settles into a permanent error or
    /// waiting state; there is no timeout.
    pub async fn value(&self, pane: &PaneId, output: usize) -> Result<Value, QueryError> {
        let slot = self.store.lookup(pane, output)?;
        if let Output::Value(value) = slot.read() {
            return Ok(value);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let _sub = slot.subscribe(move |out| {
            if let Output::Value(value) = out {
                let _ = tx.send(Rc::clone(value));
            }
        });
        match rx.recv().await {
            Some(value) => Ok(value),
            // The sender lives inside the guard held above, so the channel
            // cannot close while we wait; stay pending regardless, per the
            // contract for permanently non-value slots.
            None => std::future::pending().await,
        }
    }

    /// Observe every committed change of one output, starting from the
    /// next change after subscription (not the current value). Dropping
    /// the returned guard unsubscribes immediately.
    pub fn subscribe(
        &self,
        pane: &PaneId,
        output: usize,
        listener: impl Fn(&Output) + 'static,
    ) -> Result<SlotSubscription, QueryError> {
        Ok(self.store.lookup(pane, output)?.subscribe(listener))
    }

    /// Transactional literal overwrite of one output, equivalent to
    /// invoking a State pane's setter with a literal. Downstream panes
    /// bound to the slot re-run as for any other change.
    pub fn set_value(&self, pane: &PaneId, output: usize, value: Value) -> Result<(), QueryError> {
        let slot = self.store.lookup(pane, output)?;
        Transaction::run(|| slot.write(Output::Value(value)));
        Ok(())
    }

    /// Dispose every standing computation. Idempotent. Writes from
    /// evaluations already in flight become no-ops; the slots themselves
    /// stay readable.
    pub fn destroy(&mut self) {
        if self.dispose.is_disposed() {
            return;
        }
        debug!(target: "paneboard.engine", "engine destroyed");
        self.dispose.dispose();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("destroyed", &self.dispose.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
