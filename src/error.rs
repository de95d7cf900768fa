//! Error types for script parsing and execution.
//!
//! Parse errors are reported before anything runs. Execution errors are
//! collected per action and surfaced once the whole stage has settled.
//! Evaluating data operations never fails; see `crate::result`.

use std::fmt;

use thiserror::Error;

/// A malformed script: empty input, dangling separators, unmatched
/// parentheses or an invalid JSON argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// The error message.
    pub message: String,
    /// Byte offset in the script, when known.
    pub offset: Option<usize>,
}

impl SyntaxError {
    /// Create a syntax error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a syntax error at a byte offset in the script.
    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Shift the offset by `base`, for errors raised on a slice of the script.
    pub fn shifted(mut self, base: usize) -> Self {
        self.offset = Some(self.offset.unwrap_or(0) + base);
        self
    }

    /// Render the error with a caret under the offending position.
    pub fn render(&self, script: &str) -> String {
        match self.offset {
            Some(offset) => {
                // Count chars, not bytes, so the caret lines up.
                let column = script
                    .char_indices()
                    .take_while(|(i, _)| *i < offset)
                    .count();
                format!("{}\n  {}\n  {}^", self.message, script, " ".repeat(column))
            }
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match self.offset {
            Some(pos) => write!(f, " (at position {})", pos),
            None => Ok(()),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// The registry has no capability under this name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action \"{name}\"")]
pub struct UnknownActionError {
    pub name: String,
}

/// Why a single action failed.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Unknown(#[from] UnknownActionError),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// One failed action, with enough context to point at it in the script.
#[derive(Debug)]
pub struct ActionFailure {
    pub stage_index: usize,
    pub action_index: usize,
    pub source_text: String,
    pub cause: ActionError,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stage {}, action {} (\"{}\") failed: {}",
            self.stage_index + 1,
            self.action_index + 1,
            self.source_text,
            self.cause
        )
    }
}

/// Every failure of one stage. Never empty.
#[derive(Debug)]
pub struct StageExecutionError {
    pub stage_index: usize,
    first: ActionFailure,
    rest: Vec<ActionFailure>,
}

impl StageExecutionError {
    /// Collect the failures of a stage, in source order. Returns `None` when
    /// there are none.
    pub fn new(stage_index: usize, failures: Vec<ActionFailure>) -> Option<Self> {
        let mut failures = failures.into_iter();
        let first = failures.next()?;
        Some(Self {
            stage_index,
            first,
            rest: failures.collect(),
        })
    }

    /// The first failure in source order.
    pub fn first(&self) -> &ActionFailure {
        &self.first
    }

    /// Every failure, in source order.
    pub fn failures(&self) -> impl Iterator<Item = &ActionFailure> {
        std::iter::once(&self.first).chain(&self.rest)
    }

    /// Returns true if any failure is an unknown action.
    pub fn has_unknown_action(&self) -> bool {
        self.failures()
            .any(|f| matches!(f.cause, ActionError::Unknown(_)))
    }
}

impl fmt::Display for StageExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        if !self.rest.is_empty() {
            write!(f, " (and {} more in this stage)", self.rest.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for StageExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.first.cause)
    }
}

/// Any error the parser or engine can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Stage(#[from] StageExecutionError),
}

/// Result type for parsing and execution.
pub type Result<T> = std::result::Result<T, Error>;
