//! One-shot import resolution.
//!
//! Runs once per import pane at initialization; no slot change ever
//! re-triggers it, and a failed load is terminal - no retry, no re-import
//! on re-subscription. A pane with no module reference never runs at all
//! and stays waiting for the engine's lifetime.

use std::rc::Rc;

use paneboard_core::{ImportPane, ModuleLoader, Output, PaneId, Value};

use crate::dispose::DisposeToken;
use crate::metrics;
use crate::slot::OutputSlot;
use crate::txn::Transaction;

pub(crate) fn spawn_import(
    pane: PaneId,
    config: ImportPane,
    out: OutputSlot,
    loader: Option<Rc<dyn ModuleLoader>>,
    disposal: DisposeToken,
) {
    let (Some(module), Some(loader)) = (config.module, loader) else {
        return;
    };

    tokio::task::spawn_local(async move {
        metrics::record_import_start(&pane);
        let result = loader.load(&module).await;
        if disposal.is_disposed() {
            return;
        }
        let output = match result {
            Ok(loaded) => {
                let value: Value = if config.use_default {
                    loaded.default_export.unwrap_or_else(|| Rc::new(()))
                } else {
                    loaded.namespace
                };
                Output::Value(value)
            }
            Err(error) => {
                metrics::warn_import_failure(&pane, &error);
                Output::Error(error)
            }
        };
        Transaction::run(|| out.write(output));
    });
}
