//! This module defines the core data structures and types used throughout the interpreter:
//! the alphabet/state model of a machine, transition actions, step outcomes, and error types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::table::TransitionTable;
use crate::Rule;

/// A state is identified by its symbolic name only.
pub type State = String;
/// A tape symbol is a single character.
pub type Symbol = char;

/// The blank symbol used when a machine description does not declare one.
pub const DEFAULT_BLANK_SYMBOL: char = 'b';
/// The maximum allowed size for a machine description in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The default ceiling on the number of transitions a single run may take.
pub const MAX_EXECUTION_STEPS: usize = 10000;

/// A deterministic Turing machine: the 6-tuple plus the policies that shape its execution.
///
/// A `Machine` is immutable once built. Runs borrow it and never mutate it, so a single
/// machine can drive any number of independent runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Machine {
    /// Human readable name of the machine.
    pub name: String,
    /// The finite set of states.
    pub states: BTreeSet<State>,
    /// The input alphabet (sigma). Input strings must be drawn from it.
    pub input_alphabet: BTreeSet<Symbol>,
    /// The full tape alphabet (gamma), a superset of the input alphabet that includes the blank.
    pub tape_alphabet: BTreeSet<Symbol>,
    /// The designated blank symbol.
    pub blank: Symbol,
    /// The state every run starts in.
    pub start_state: State,
    /// States that end a run when entered.
    pub halting_states: BTreeSet<State>,
    /// The transition function.
    pub transitions: TransitionTable,
    /// How a missing table entry is treated.
    #[serde(default)]
    pub mode: Mode,
    /// Start-of-input marker written immediately before the input, if the table relies on one.
    #[serde(default)]
    pub sentinel: Option<Symbol>,
}

impl Machine {
    /// Returns `true` if entering `state` ends a run.
    pub fn is_halting(&self, state: &str) -> bool {
        self.halting_states.contains(state)
    }

    /// Returns `true` if `symbol` belongs to the tape alphabet.
    pub fn is_tape_symbol(&self, symbol: Symbol) -> bool {
        self.tape_alphabet.contains(&symbol)
    }

    /// Returns `true` if `symbol` belongs to the input alphabet.
    pub fn is_input_symbol(&self, symbol: Symbol) -> bool {
        self.input_alphabet.contains(&symbol)
    }

    /// Looks up the action for `(state, symbol)` in the transition table.
    pub fn lookup(&self, state: &str, symbol: Symbol) -> Lookup<'_> {
        self.transitions.lookup(state, symbol)
    }
}

/// The policy applied when the table has no entry for the current `(state, symbol)` pair.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    /// A missing entry is an `UndefinedTransition` fault.
    #[default]
    Strict,
    /// A missing entry is an implicit move into the named halting state. The tape and head
    /// are left untouched and no step is counted.
    Reject(State),
}

/// The action a transition prescribes: where to go, what to write, and which way to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The state the machine enters after this transition.
    pub next_state: State,
    /// The symbol written over the cell under the head.
    pub write: Symbol,
    /// The head displacement applied after writing.
    pub direction: Direction,
}

impl Action {
    /// Creates an action that enters `next_state`, writes `write` and moves in `direction`.
    pub fn new(next_state: impl Into<State>, write: Symbol, direction: Direction) -> Self {
        Self {
            next_state: next_state.into(),
            write,
            direction,
        }
    }
}

/// The result of consulting the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// An entry exists for the pair.
    Found(&'a Action),
    /// The table has no entry for the pair.
    NotFound,
}

/// Represents the possible directions a head can move. There is no "stay" move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
}

impl Direction {
    /// The signed head displacement: `-1` for left, `+1` for right.
    pub fn displacement(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// Represents the outcome of a single engine step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A transition was applied and the machine is in a non-halting state.
    Continue,
    /// The run is over.
    Halt(Halt),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// Reached the given halting state.
    Ok(State),
    /// Stopped abnormally.
    Err(Fault),
}

/// The lifecycle of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// More steps can be taken.
    Running,
    /// Entered the given halting state.
    Halted(State),
    /// Stopped by a fault.
    Faulted(Fault),
}

/// A run-time fault together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (state {state}, after {step} steps)")]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// Number of transitions completed before the fault.
    pub step: usize,
    /// The state the machine was in when the fault occurred.
    pub state: State,
}

/// The kinds of faults that abort a run. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    /// The table has no entry for a pair reached in a non-halting state.
    #[error("No transition defined for state {state} and symbol {symbol:?}")]
    UndefinedTransition { state: State, symbol: Symbol },
    /// The head attempted to leave the bounded tape.
    #[error("Head moved {direction:?} past the tape boundary at cell {position} (tape length {length})")]
    TapeOverrun {
        position: usize,
        direction: Direction,
        length: usize,
    },
    /// A symbol outside the tape alphabet was read or was about to be written.
    #[error("Symbol {0:?} is not in the tape alphabet")]
    InvalidSymbol(Symbol),
    /// The run took more transitions than the configured ceiling allows.
    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(usize),
}

/// Represents the errors that can occur while building, loading, or configuring a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DtmError {
    /// Indicates a reference to a state the machine does not declare.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Indicates an input string that cannot be placed on the tape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Indicates an error during the parsing of a machine description.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an inconsistent 6-tuple or transition table.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an unusable run configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
    /// A run ended with a fault.
    #[error("Run faulted: {0}")]
    Fault(#[from] Fault),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let right_json = serde_json::to_string(&Direction::Right).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(right_json, "\"Right\"");

        let left: Direction = serde_json::from_str(&left_json).unwrap();
        assert_eq!(left, Direction::Left);
    }

    #[test]
    fn test_direction_displacement() {
        assert_eq!(Direction::Left.displacement(), -1);
        assert_eq!(Direction::Right.displacement(), 1);
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault {
            kind: FaultKind::UndefinedTransition {
                state: "q1".to_string(),
                symbol: 'x',
            },
            step: 4,
            state: "q1".to_string(),
        };

        let msg = fault.to_string();
        assert!(msg.contains("No transition defined for state q1"));
        assert!(msg.contains("'x'"));
        assert!(msg.contains("after 4 steps"));
    }

    #[test]
    fn test_error_display() {
        let error = DtmError::InvalidState("q9".to_string());

        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Invalid state"));
        assert!(error_msg.contains("q9"));
    }

    #[test]
    fn test_fault_converts_into_error() {
        let fault = Fault {
            kind: FaultKind::StepLimitExceeded(10),
            step: 10,
            state: "loop".to_string(),
        };

        let error: DtmError = fault.clone().into();
        assert_eq!(error, DtmError::Fault(fault));
        assert!(error.to_string().contains("Step limit of 10 exceeded"));
    }
}
