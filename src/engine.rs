//! Staged execution of parsed scripts.
//!
//! Stages run strictly in order. All actions of a stage are started in
//! source order and driven together on the calling task; the engine waits for
//! every one of them to settle before it looks at failures. A failed stage
//! stops the script: later stages never start.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value as Json;

use crate::ast::{ParsedAction, ParsedScript, Stage};
use crate::error::{ActionError, ActionFailure, Error, Result, StageExecutionError};
use crate::parser;
use crate::registry::{Library, Registry};

/// Receives a notification every time an action settles.
pub trait SettleListener: Send + Sync {
    fn on_action_settled(
        &self,
        stage_index: usize,
        action_index: usize,
        outcome: &std::result::Result<Json, ActionError>,
    );
}

impl<F> SettleListener for F
where
    F: Fn(usize, usize, &std::result::Result<Json, ActionError>) + Send + Sync,
{
    fn on_action_settled(
        &self,
        stage_index: usize,
        action_index: usize,
        outcome: &std::result::Result<Json, ActionError>,
    ) {
        self(stage_index, action_index, outcome)
    }
}

/// Engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Pause between two stages, giving rendering work time to land.
    pub stage_delay: Duration,
}

/// What a successful run produced: each action's return value, by stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub outputs: Vec<Vec<Json>>,
}

/// Runs parsed scripts against a registry.
pub struct Engine<'r> {
    registry: &'r Registry,
    config: EngineConfig,
    listener: Option<Arc<dyn SettleListener>>,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            listener: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a listener for settled actions.
    pub fn on_action_settled(mut self, listener: Arc<dyn SettleListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Run every stage of `script` in order.
    pub async fn run(&self, script: &ParsedScript) -> Result<RunReport> {
        let mut report = RunReport::default();
        let last = script.stages.len().saturating_sub(1);
        tracing::info!(
            stages = script.stages.len(),
            actions = script.action_count(),
            "running script"
        );

        for (stage_index, stage) in script.stages.iter().enumerate() {
            tracing::info!(
                stage = stage_index + 1,
                actions = stage.actions.len(),
                "starting stage"
            );
            let outputs = self.run_stage(stage_index, stage).await?;
            tracing::info!(stage = stage_index + 1, "stage settled");
            report.outputs.push(outputs);

            if stage_index < last && !self.config.stage_delay.is_zero() {
                tokio::time::sleep(self.config.stage_delay).await;
            }
        }
        Ok(report)
    }

    /// Run one stage and collect every failure in it.
    async fn run_stage(
        &self,
        stage_index: usize,
        stage: &Stage,
    ) -> std::result::Result<Vec<Json>, StageExecutionError> {
        let outcomes = join_all(stage.actions.iter().map(|action| self.invoke(action))).await;

        let mut outputs = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (action, outcome) in stage.actions.iter().zip(outcomes) {
            match outcome {
                Ok(value) => outputs.push(value),
                Err(cause) => failures.push(ActionFailure {
                    stage_index,
                    action_index: action.action_index,
                    source_text: action.source_text.clone(),
                    cause,
                }),
            }
        }

        match StageExecutionError::new(stage_index, failures) {
            None => Ok(outputs),
            Some(err) => {
                tracing::warn!(stage = stage_index + 1, error = %err, "stage failed");
                Err(err)
            }
        }
    }

    async fn invoke(&self, action: &ParsedAction) -> std::result::Result<Json, ActionError> {
        tracing::debug!(
            stage = action.stage_index + 1,
            action = action.action_index + 1,
            name = %action.name,
            "invoking action"
        );
        let outcome = match self.registry.resolve(&action.name) {
            Ok(capability) => capability
                .invoke(action.args.clone())
                .await
                .map_err(ActionError::Failed),
            Err(unknown) => Err(ActionError::Unknown(unknown)),
        };
        tracing::debug!(
            stage = action.stage_index + 1,
            action = action.action_index + 1,
            ok = outcome.is_ok(),
            "action settled"
        );
        if let Some(listener) = &self.listener {
            listener.on_action_settled(action.stage_index, action.action_index, &outcome);
        }
        outcome
    }
}

/// Parse `script` against `library` and run it.
///
/// The library's plain values become the bindings that bare identifiers in
/// arguments resolve to; its actions become the registry.
pub async fn run_script(script: &str, library: &Library, config: EngineConfig) -> Result<RunReport> {
    let parsed = parser::parse_script_with(script, &library.bindings()).map_err(Error::Syntax)?;
    let registry = Registry::build(library);
    Engine::new(&registry).with_config(config).run(&parsed).await
}
