#![forbid(unsafe_code)]

//! Paneboard Engine
//!
//! A reactive dependency-graph evaluation engine for a canvas of
//! computational cells ("panes"). Each pane produces a versioned output
//! held in an observable slot; evaluatable panes re-run automatically
//! whenever any slot they read changes, with run-superseding semantics for
//! long-running asynchronous bodies.
//!
//! # Key Components
//!
//! - [`Engine`] - construction, output queries, subscription, imperative
//!   value injection, teardown
//! - [`OutputSlot`] - one reactively observable output cell; the unit of
//!   change notification
//! - [`Transaction`] - commit scope deferring notifications until a batch
//!   of slot writes settles
//! - [`metrics`] - global monotonic counters over run lifecycle events
//!
//! # Concurrency model
//! One logical thread of control with cooperative suspension: the engine
//! must be constructed and driven inside a [`tokio::task::LocalSet`] on a
//! current-thread runtime. Evaluations are independently suspending tasks
//! multiplexed onto that one queue; concurrency is interleaving, never
//! parallelism, and no locks guard the store or slots.

mod dispose;
mod import;
mod init;
mod scheduler;
mod state;
mod store;

pub mod engine;
pub mod metrics;
pub mod slot;
pub mod txn;

pub use engine::{Engine, EngineOptions};
pub use slot::{OutputSlot, SlotSubscription};
pub use txn::Transaction;

pub use paneboard_core::{
    CompileRequest, CompiledBody, ConfigError, EvalError, EvalMode, EvaluatePane,
    ExpressionEvaluator, ImportPane, LoadedModule, ModuleLoader, ModuleRef, Output, OutputKind,
    OutputRef, Pane, PaneId, PaneInput, PaneKind, QueryError, SourceTransformer, StatePane,
    StateSetter, Value, ValueUpdater,
};
