//! Chart operation scripting.
//!
//! Two halves:
//! - a command script language (`A(1) + B(2) -> C(3)`) parsed into stages and
//!   run against a registry of named actions, stage by stage
//! - typed data operations (filter, compare, nth, ...) evaluated over chart
//!   rows, alone or as keyed plans

pub mod ast;
pub mod config;
pub mod datum;
pub mod engine;
pub mod error;
pub mod library;
pub mod ops;
pub mod parser;
pub mod plan;
pub mod registry;
pub mod render;
pub mod result;
pub mod spec;

pub use ast::{Arg, ParsedAction, ParsedScript, Stage};
pub use datum::{Datum, FieldMap};
pub use engine::{Engine, EngineConfig, RunReport, SettleListener, run_script};
pub use error::{Error, Result, StageExecutionError, SyntaxError, UnknownActionError};
pub use ops::{Evaluate, evaluate};
pub use parser::{parse_action, parse_args, parse_script, split_top_level};
pub use plan::{Plan, ResultStore};
pub use registry::{Action, Library, Registry};
pub use result::OpResult;
pub use spec::{OperationSpec, Selector};
