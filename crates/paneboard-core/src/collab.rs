//! Contracts of the collaborators the engine consumes.
//!
//! The engine core knows nothing about the textual language inside a pane
//! body, how it compiles, or where modules come from. Those concerns sit
//! behind the three traits here. An implementation may back
//! [`ExpressionEvaluator`] with an embedded scripting engine, a restricted
//! interpreter, or an out-of-process worker; the engine only relies on the
//! async-callable contract.
//!
//! All traits are single-threaded (`?Send`): the engine runs on one local
//! task set and collaborator futures are polled there.

use std::rc::Rc;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;

use crate::error::EvalError;
use crate::output::Value;
use crate::pane::{EvalMode, ModuleRef};

/// A compiled pane body: a reusable asynchronous callable.
///
/// Invoked with global values followed by named-input values, in the
/// declaration order the compile request carried. The callable may suspend
/// arbitrarily before producing a result, and is invoked once per run.
pub type CompiledBody = Rc<dyn Fn(Vec<Value>) -> LocalBoxFuture<'static, Result<Value, EvalError>>>;

/// Everything the evaluator needs to compile one pane body.
///
/// The source has already been through the source transformer when the pane
/// declares transforms.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub mode: EvalMode,
    /// Named-input identifiers, in declaration order.
    pub named_inputs: &'a [String],
    /// Global binding names, in declaration order.
    pub globals: &'a [String],
}

/// Compiles and evaluates pane bodies.
#[async_trait(?Send)]
pub trait ExpressionEvaluator {
    /// Synchronously evaluate a standalone expression with no bindings.
    ///
    /// Used only to seed State-pane value slots from their initial
    /// expression.
    fn eval_now(&self, source: &str) -> Result<Value, EvalError>;

    /// Compile a pane body into a reusable asynchronous callable.
    async fn compile(&self, request: CompileRequest<'_>) -> Result<CompiledBody, EvalError>;
}

/// Pure source-to-source transform applied before compilation.
pub trait SourceTransformer {
    fn transform(&self, source: &str, plugins: &[String]) -> Result<String, EvalError>;
}

/// Result of resolving an external module reference.
pub struct LoadedModule {
    /// The whole module namespace.
    pub namespace: Value,
    /// The module's designated default export, when it has one.
    pub default_export: Option<Value>,
}

impl LoadedModule {
    /// A namespace-only module with no default export. Script-style
    /// references report success this way.
    #[must_use]
    pub fn namespace_only(namespace: Value) -> Self {
        Self {
            namespace,
            default_export: None,
        }
    }
}

/// Resolves external references. Called at most once per import pane.
#[async_trait(?Send)]
pub trait ModuleLoader {
    async fn load(&self, module: &ModuleRef) -> Result<LoadedModule, EvalError>;
}
