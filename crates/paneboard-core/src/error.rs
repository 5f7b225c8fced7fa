//! Error taxonomy: fatal configuration errors, API lookup errors, and the
//! cloneable evaluation-failure payload carried inside an output slot.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::output::Value;
use crate::pane::PaneId;

/// Failure payload of an evaluation, import, or state update.
///
/// Stored inside [`Output::Error`](crate::Output::Error) and cloned freely
/// with the output, so the message is shared. An optional dynamic payload
/// carries whatever the failing collaborator threw alongside the message.
#[derive(Clone, Error)]
#[error("{message}")]
pub struct EvalError {
    message: Rc<str>,
    payload: Option<Value>,
}

impl EvalError {
    /// A failure with a message and no payload.
    pub fn new(message: impl Into<Rc<str>>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    /// A failure carrying the value the collaborator threw.
    pub fn with_payload(message: impl Into<Rc<str>>, payload: Value) -> Self {
        Self {
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The thrown payload, if the failing collaborator supplied one.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }
}

impl fmt::Debug for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalError")
            .field("message", &self.message)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Fatal configuration errors. Construction fails as a whole; the engine is
/// never partially built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An Evaluate pane declares an input with no source binding.
    #[error("missing input source (pane {pane}, input {input})")]
    MissingInputSource { pane: PaneId, input: String },

    /// An input binding names a slot that does not exist in the store.
    #[error("pane {pane} reads unknown output {output} of pane {source_pane}")]
    UnknownInputSource {
        pane: PaneId,
        source_pane: PaneId,
        output: usize,
    },

    /// A pane variant the engine does not evaluate.
    #[error("pane type not supported: {kind} (pane {pane})")]
    UnsupportedPaneType { pane: PaneId, kind: &'static str },

    /// Two panes share one id.
    #[error("duplicate pane id: {pane}")]
    DuplicatePaneId { pane: PaneId },

    /// A pane declares source transforms but no transformer was configured.
    #[error("pane {pane} declares source transforms but no transformer was configured")]
    MissingTransformer { pane: PaneId },

    /// A pane references a module but no module loader was configured.
    #[error("pane {pane} references a module but no module loader was configured")]
    MissingLoader { pane: PaneId },
}

/// Lookup errors from the query surface of the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown pane: {0}")]
    UnknownPane(PaneId),

    #[error("pane {pane} has no output {output}")]
    NoSuchOutput { pane: PaneId, output: usize },
}
