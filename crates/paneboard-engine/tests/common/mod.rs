#![allow(dead_code)]

//! Shared fixtures: a table-driven expression evaluator over a tiny
//! integer language, a scripted module loader, a rewrite transformer, and
//! settle helpers for driving the local task set.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;

use paneboard_engine::{
    CompileRequest, CompiledBody, Engine, EvalError, EvaluatePane, ExpressionEvaluator,
    LoadedModule, ModuleLoader, ModuleRef, Output, OutputRef, Pane, PaneId, PaneInput, PaneKind,
    SlotSubscription, SourceTransformer, Value,
};

/// What a body source compiles to in the fixture language: integer
/// literals, bare identifiers, and `ident + literal`. Anything else must be
/// registered as an override.
#[derive(Clone, Copy, Debug)]
enum Plan {
    Const(i64),
    Ref(usize),
    AddConst(usize, i64),
}

fn position(params: &[String], name: &str) -> Result<usize, EvalError> {
    params
        .iter()
        .position(|p| p == name)
        .ok_or_else(|| EvalError::new(format!("unknown identifier: {name}")))
}

fn parse_plan(source: &str, params: &[String]) -> Result<Plan, EvalError> {
    let s = source.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(Plan::Const(n));
    }
    if let Some((lhs, rhs)) = s.split_once('+') {
        let n: i64 = rhs
            .trim()
            .parse()
            .map_err(|_| EvalError::new(format!("cannot parse: {s}")))?;
        return Ok(Plan::AddConst(position(params, lhs.trim())?, n));
    }
    Ok(Plan::Ref(position(params, s)?))
}

/// Closure-backed evaluator: compiles the tiny integer language above, with
/// per-source overrides for asynchronous or failing bodies.
pub struct TestEvaluator {
    overrides: RefCell<HashMap<String, CompiledBody>>,
    pub compile_calls: Cell<usize>,
}

impl TestEvaluator {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            overrides: RefCell::new(HashMap::new()),
            compile_calls: Cell::new(0),
        })
    }

    /// Register a custom body for an exact source string.
    pub fn body(&self, source: &str, body: CompiledBody) {
        self.overrides.borrow_mut().insert(source.to_string(), body);
    }

    pub fn body_fn<F, Fut>(&self, source: &str, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, EvalError>> + 'static,
    {
        self.body(
            source,
            Rc::new(
                move |args: Vec<Value>| -> LocalBoxFuture<'static, Result<Value, EvalError>> {
                    Box::pin(f(args))
                },
            ),
        );
    }
}

#[async_trait::async_trait(?Send)]
impl ExpressionEvaluator for TestEvaluator {
    fn eval_now(&self, source: &str) -> Result<Value, EvalError> {
        source
            .trim()
            .parse::<i64>()
            .map(|n| Rc::new(n) as Value)
            .map_err(|_| EvalError::new(format!("not an integer literal: {source}")))
    }

    async fn compile(&self, request: CompileRequest<'_>) -> Result<CompiledBody, EvalError> {
        self.compile_calls.set(self.compile_calls.get() + 1);
        if let Some(body) = self.overrides.borrow().get(request.source) {
            return Ok(Rc::clone(body));
        }
        let params: Vec<String> = request
            .globals
            .iter()
            .chain(request.named_inputs.iter())
            .cloned()
            .collect();
        let plan = parse_plan(request.source, &params)?;
        Ok(Rc::new(
            move |args: Vec<Value>| -> LocalBoxFuture<'static, Result<Value, EvalError>> {
                let result = match plan {
                    Plan::Const(n) => Ok(Rc::new(n) as Value),
                    Plan::Ref(i) => Ok(Rc::clone(&args[i])),
                    Plan::AddConst(i, n) => args[i]
                        .downcast_ref::<i64>()
                        .map(|v| Rc::new(v + n) as Value)
                        .ok_or_else(|| EvalError::new("input is not an integer")),
                };
                Box::pin(async move { result })
            },
        ))
    }
}

/// Scripted module loader counting its calls.
pub struct TestLoader {
    handler: Box<dyn Fn(&ModuleRef) -> Result<LoadedModule, EvalError>>,
    pub calls: Cell<usize>,
}

impl TestLoader {
    pub fn new(handler: impl Fn(&ModuleRef) -> Result<LoadedModule, EvalError> + 'static) -> Rc<Self> {
        Rc::new(Self {
            handler: Box::new(handler),
            calls: Cell::new(0),
        })
    }
}

#[async_trait::async_trait(?Send)]
impl ModuleLoader for TestLoader {
    async fn load(&self, module: &ModuleRef) -> Result<LoadedModule, EvalError> {
        self.calls.set(self.calls.get() + 1);
        (self.handler)(module)
    }
}

/// Source transformer rewriting whole sources by table, recording the
/// plugin lists it was handed.
pub struct RewriteTransformer {
    rules: HashMap<String, String>,
    pub seen_plugins: RefCell<Vec<Vec<String>>>,
}

impl RewriteTransformer {
    pub fn new<const N: usize>(rules: [(&str, &str); N]) -> Rc<Self> {
        Rc::new(Self {
            rules: rules
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            seen_plugins: RefCell::new(Vec::new()),
        })
    }
}

impl SourceTransformer for RewriteTransformer {
    fn transform(&self, source: &str, plugins: &[String]) -> Result<String, EvalError> {
        self.seen_plugins.borrow_mut().push(plugins.to_vec());
        Ok(self
            .rules
            .get(source)
            .cloned()
            .unwrap_or_else(|| source.to_string()))
    }
}

/// A future that stays pending for `n` polls, waking itself each time.
pub struct YieldsFor(pub usize);

impl Future for YieldsFor {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.0 == 0 {
            Poll::Ready(())
        } else {
            this.0 -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// An Evaluate pane with named inputs bound as `(name, source pane, index)`.
pub fn evaluate_with(id: &str, source: &str, inputs: &[(&str, &str, usize)]) -> Pane {
    let mut config = EvaluatePane::new(source);
    for (i, (name, src, idx)) in inputs.iter().enumerate() {
        config = config.with_input(PaneInput::bound(
            format!("i{i}"),
            *name,
            OutputRef::new(*src, *idx),
        ));
    }
    Pane::new(id, PaneKind::Evaluate(config))
}

/// Collect every committed output change of one slot.
pub fn record(
    engine: &Engine,
    pane: &PaneId,
    output: usize,
) -> (Rc<RefCell<Vec<Output>>>, SlotSubscription) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let sub = engine
        .subscribe(pane, output, move |out| sink.borrow_mut().push(out.clone()))
        .unwrap();
    (calls, sub)
}

pub fn as_i64(out: &Output) -> Option<i64> {
    out.as_value()?.downcast_ref::<i64>().copied()
}

pub async fn ticks(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

/// Yield until `cond` holds; panics when it never does.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
