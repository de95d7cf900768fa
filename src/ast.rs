//! Parsed form of a command script.
//!
//! A script is a sequence of stages separated by `->`; each stage is a set of
//! actions separated by `+` that run concurrently.

use std::fmt;

use serde::{Serialize, Serializer};

/// A parsed script: stages run strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedScript {
    pub stages: Vec<Stage>,
}

impl ParsedScript {
    /// Total number of actions across all stages.
    pub fn action_count(&self) -> usize {
        self.stages.iter().map(|s| s.actions.len()).sum()
    }
}

/// A stage: every action in it is started together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub actions: Vec<ParsedAction>,
}

/// One `name(args)` unit of a script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedAction {
    /// Action name, looked up in the registry at execution time.
    pub name: String,
    /// Arguments in source order.
    pub args: Vec<Arg>,
    /// 0-based stage position.
    pub stage_index: usize,
    /// 0-based position within the stage.
    pub action_index: usize,
    /// The trimmed source text of this action.
    pub source_text: String,
    /// Byte offset of `source_text` in the script.
    #[serde(skip)]
    pub offset: usize,
}

/// A typed argument literal.
///
/// The variant is decided at parse time so callers can match on it instead of
/// probing the runtime type of a loosely-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f64),
    Bool(bool),
    Null,
    String(String),
    /// A `{...}` or `[...]` literal, parsed as strict JSON.
    Json(serde_json::Value),
    /// A bare identifier that named an external binding.
    External {
        name: String,
        value: serde_json::Value,
    },
}

impl Arg {
    /// Convert to a plain JSON value, dropping the literal/reference distinction.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Arg::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Arg::Bool(b) => serde_json::Value::Bool(*b),
            Arg::Null => serde_json::Value::Null,
            Arg::String(s) => serde_json::Value::String(s.clone()),
            Arg::Json(v) => v.clone(),
            Arg::External { value, .. } => value.clone(),
        }
    }

    /// Numeric view of this argument, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Arg::Number(n) => Some(*n),
            Arg::String(s) => s.trim().parse().ok(),
            Arg::External { value, .. } | Arg::Json(value) => value.as_f64(),
            _ => None,
        }
    }

    /// String view of this argument, if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s),
            Arg::External { value, .. } => value.as_str(),
            _ => None,
        }
    }
}

impl Serialize for Arg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Number(n) => write!(f, "{}", n),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Null => write!(f, "null"),
            Arg::String(s) => write!(f, "{:?}", s),
            Arg::Json(v) => write!(f, "{}", v),
            Arg::External { name, .. } => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for ParsedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            writeln!(f, "stage {}:", i + 1)?;
            for action in &stage.actions {
                let args: Vec<String> = action.args.iter().map(|a| a.to_string()).collect();
                writeln!(f, "  {}({})", action.name, args.join(", "))?;
            }
        }
        Ok(())
    }
}
