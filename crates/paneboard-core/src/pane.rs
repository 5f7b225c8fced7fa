//! The immutable pane-definition model.
//!
//! A canvas is a list of [`Pane`] definitions. Definitions are plain data,
//! fixed at construction; the engine's only mutable state lives in output
//! slots. Serde derives are available behind the `serde` feature for
//! tooling that wants to ship definitions around; the engine itself never
//! persists them.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a pane. Cheap to clone, hashable, displayable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PaneId(Arc<str>);

impl PaneId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PaneId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for PaneId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaneId({})", self.0)
    }
}

/// One cell on the canvas.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pane {
    pub id: PaneId,
    pub kind: PaneKind,
}

impl Pane {
    pub fn new(id: impl Into<PaneId>, kind: PaneKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// An Evaluate pane with no inputs and default mode.
    pub fn evaluate(id: impl Into<PaneId>, source: impl Into<String>) -> Self {
        Self::new(id, PaneKind::Evaluate(EvaluatePane::new(source)))
    }

    /// A static text pane.
    pub fn input_text(id: impl Into<PaneId>, text: impl Into<String>) -> Self {
        Self::new(id, PaneKind::InputText { text: text.into() })
    }

    /// A mutable state pane.
    pub fn state(id: impl Into<PaneId>, initial_expression: impl Into<String>) -> Self {
        Self::new(
            id,
            PaneKind::State(StatePane {
                initial_expression: initial_expression.into(),
            }),
        )
    }

    /// An import pane resolving one external reference at startup.
    pub fn import(id: impl Into<PaneId>, module: ModuleRef) -> Self {
        Self::new(
            id,
            PaneKind::Import(ImportPane {
                module: Some(module),
                use_default: false,
            }),
        )
    }
}

/// Variant-specific definition of a pane.
///
/// The engine evaluates the first four variants. The remaining tags exist in
/// the definition model but are rejected at construction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PaneKind {
    Evaluate(EvaluatePane),
    InputText { text: String },
    State(StatePane),
    Import(ImportPane),
    EvaluateGlobal { source: String },
    EvaluateTemplate { template_id: String },
    EnvironmentVariable { key: Option<String> },
}

impl PaneKind {
    /// Stable name of the variant, for errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PaneKind::Evaluate(_) => "evaluate",
            PaneKind::InputText { .. } => "input-text",
            PaneKind::State(_) => "state",
            PaneKind::Import(_) => "import",
            PaneKind::EvaluateGlobal { .. } => "evaluate-global",
            PaneKind::EvaluateTemplate { .. } => "evaluate-template",
            PaneKind::EnvironmentVariable { .. } => "environment-variable",
        }
    }
}

/// Definition of an evaluatable pane.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluatePane {
    /// Body source, in whatever language the configured evaluator compiles.
    pub source: String,
    pub mode: EvalMode,
    pub inputs: Vec<PaneInput>,
    /// Source-transform plugin names applied before compilation, in order.
    pub transforms: Vec<String>,
}

impl EvaluatePane {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mode: EvalMode::Expression,
            inputs: Vec::new(),
            transforms: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: PaneInput) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, plugin: impl Into<String>) -> Self {
        self.transforms.push(plugin.into());
        self
    }
}

/// How an Evaluate pane's body is interpreted.
///
/// `Text` panes never reach the expression evaluator: their output is the
/// raw source text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EvalMode {
    #[default]
    Expression,
    FunctionBody,
    Text,
}

/// Definition of a mutable state pane.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatePane {
    /// Evaluated synchronously, with no bindings, to seed the value slot.
    /// Blank means the slot starts out waiting.
    pub initial_expression: String,
}

/// Definition of an import pane.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImportPane {
    /// `None` leaves the pane waiting forever; nothing is loaded.
    pub module: Option<ModuleRef>,
    /// Surface the module's default export instead of the whole namespace.
    pub use_default: bool,
}

/// An external reference resolved once at startup by the module loader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModuleRef {
    /// Side-effecting script injection; terminal outcomes only.
    Script(String),
    /// A package identifier, optionally pinned to an exact URL.
    Package { id: String, pin_url: Option<String> },
    /// A direct URL.
    Url(String),
}

/// A named slot consumer with an optional binding.
///
/// An input with `source: None` is "unconnected". Inputs with a name are
/// bound into the compiled body's parameter list in declaration order.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PaneInput {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub source: Option<OutputRef>,
}

impl PaneInput {
    /// A named input bound to an upstream output.
    pub fn bound(id: impl Into<String>, name: impl Into<String>, source: OutputRef) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            description: None,
            source: Some(source),
        }
    }
}

/// A `(pane, output index)` pair naming one upstream slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputRef {
    pub pane: PaneId,
    pub output: usize,
}

impl OutputRef {
    pub fn new(pane: impl Into<PaneId>, output: usize) -> Self {
        Self {
            pane: pane.into(),
            output,
        }
    }
}
