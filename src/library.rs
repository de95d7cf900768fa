//! Built-in actions.
//!
//! A small library the CLI runs scripts against:
//! - `wait(ms)`: sleep
//! - `log(...)`: log the arguments
//! - `fail(message)`: fail with a message
//! - `evaluate(plan)`: evaluate a spec, chain or keyed plan against the loaded
//!   dataset; results persist across calls so a later `last` step can use them

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use serde_json::Value as Json;

use crate::ast::Arg;
use crate::datum::{Datum, FieldMap};
use crate::plan::{Plan, ResultStore};
use crate::registry::{Library, action_fn};

/// Dataset and stored results shared by the built-in actions.
#[derive(Debug, Default)]
pub struct Session {
    pub data: Vec<Datum>,
    pub fields: FieldMap,
    store: Mutex<ResultStore>,
}

impl Session {
    pub fn new(data: Vec<Datum>, fields: FieldMap) -> Self {
        Self {
            data,
            fields,
            store: Mutex::new(ResultStore::new()),
        }
    }

    /// Evaluate a plan given as JSON and return its report as JSON.
    pub fn evaluate(&self, plan: Json) -> anyhow::Result<Json> {
        let plan = Plan::from_json(plan).context("invalid operation spec")?;
        let mut store = self
            .store
            .lock()
            .map_err(|_| anyhow!("result store is poisoned"))?;
        let report = plan.run(&self.data, &self.fields, &mut store);
        Ok(serde_json::to_value(&report)?)
    }
}

/// The built-in library, bound to a session.
pub fn builtins(session: Arc<Session>) -> Library {
    Library::new()
        .action("wait", action_fn(|args: Vec<Arg>| async move { wait(args).await }))
        .action("log", action_fn(|args: Vec<Arg>| async move { log(args) }))
        .action("fail", action_fn(|args: Vec<Arg>| async move { fail(args) }))
        .action(
            "evaluate",
            action_fn(move |args: Vec<Arg>| {
                let session = Arc::clone(&session);
                async move {
                    let Some(plan) = args.first() else {
                        bail!("evaluate expects an operation spec");
                    };
                    let report = session.evaluate(plan.to_json())?;
                    tracing::info!(report = %report, "evaluated");
                    Ok(report)
                }
            }),
        )
}

async fn wait(args: Vec<Arg>) -> anyhow::Result<Json> {
    let ms = args
        .first()
        .and_then(Arg::as_f64)
        .ok_or_else(|| anyhow!("wait expects a duration in milliseconds"))?;
    if !ms.is_finite() || ms < 0.0 {
        bail!("wait expects a non-negative duration, got {}", ms);
    }
    tokio::time::sleep(Duration::from_secs_f64(ms / 1000.0)).await;
    Ok(Json::Null)
}

fn log(args: Vec<Arg>) -> anyhow::Result<Json> {
    let message = args
        .iter()
        .map(|arg| match arg.as_str() {
            Some(s) => s.to_string(),
            None => arg.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(%message, "log");
    Ok(Json::Array(args.iter().map(Arg::to_json).collect()))
}

fn fail(args: Vec<Arg>) -> anyhow::Result<Json> {
    let message = args
        .first()
        .map(|arg| arg.as_str().map(str::to_string).unwrap_or_else(|| arg.to_string()))
        .unwrap_or_else(|| "failed".to_string());
    Err(anyhow!(message))
}
