#![forbid(unsafe_code)]

//! Paneboard Core
//!
//! Shared vocabulary for the Paneboard evaluation engine: the immutable
//! pane-definition model, the tagged output union every slot holds, the
//! error taxonomy, and the contracts of the three collaborators the engine
//! consumes but never implements (expression evaluation, source
//! transformation, module loading).
//!
//! # Key Components
//!
//! - [`Pane`] / [`PaneKind`] - immutable definitions of the cells on a canvas
//! - [`Output`] - the tagged union a pane's output slot holds at any instant
//! - [`Value`] - the dynamically typed payload produced by evaluations
//! - [`ExpressionEvaluator`] / [`SourceTransformer`] / [`ModuleLoader`] -
//!   collaborator seams
//! - [`StateSetter`] / [`ValueUpdater`] - the invocable payloads of a State
//!   pane's setter slot
//!
//! # Role in Paneboard
//! `paneboard-core` is plain data and contracts. Everything reactive - slots,
//! transactions, scheduling - lives in `paneboard-engine`, which depends on
//! this crate.

pub mod collab;
pub mod error;
pub mod output;
pub mod pane;
pub mod value;

pub use collab::{
    CompileRequest, CompiledBody, ExpressionEvaluator, LoadedModule, ModuleLoader,
    SourceTransformer,
};
pub use error::{ConfigError, EvalError, QueryError};
pub use output::{Output, OutputKind, Value};
pub use pane::{
    EvalMode, EvaluatePane, ImportPane, ModuleRef, OutputRef, Pane, PaneId, PaneInput, PaneKind,
    StatePane,
};
pub use value::{StateSetter, ValueUpdater};
