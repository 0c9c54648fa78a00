//! This crate provides the core logic for a deterministic Turing machine interpreter.
//! It includes the alphabet/state model, the transition table, the bounded tape, the execution
//! engine with its trace, and a parser and loader for `.dtm` machine descriptions.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod loader;
pub mod parser;
pub mod programs;
pub mod table;
pub mod tape;
pub mod trace;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisError};
/// Re-exports the run configuration.
pub use config::RunConfig;
/// Re-exports the execution engine.
pub use engine::Run;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
pub use table::TransitionTable;
pub use tape::{Snapshot, Tape};
pub use trace::{ConsoleSink, ExecutionTrace, StepEvent, TraceSink};
/// Re-exports the machine model, step outcomes and error types from the types module.
pub use types::{
    Action, Direction, DtmError, Fault, FaultKind, Halt, Lookup, Machine, Mode, RunStatus, State,
    Step, Symbol, MAX_PROGRAM_SIZE,
};
