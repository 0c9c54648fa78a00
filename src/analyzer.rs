//! This module checks that a machine's 6-tuple is consistent before it is run: the start and
//! halting states are declared, the alphabets nest properly, and the table only has rows for
//! declared states.
//!
//! The contents of the table are not checked for totality. A missing entry or a foreign write
//! symbol is reported by the engine as a fault when it is actually reached.

use crate::types::{DtmError, Machine, Mode, State, Symbol};
use std::collections::BTreeSet;

/// Represents the problems that can be found in a machine description.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// The machine declares no states at all.
    NoStates,
    /// The start state is not in the state set.
    InvalidStartState(State),
    /// Halting states that are not in the state set.
    UndeclaredHaltingStates(Vec<State>),
    /// The blank symbol is not part of the tape alphabet.
    BlankNotInTapeAlphabet(Symbol),
    /// The blank symbol is also an input symbol.
    BlankInInputAlphabet(Symbol),
    /// Input symbols missing from the tape alphabet.
    InputNotInTapeAlphabet(Vec<Symbol>),
    /// The sentinel is missing from the tape alphabet or collides with the input alphabet.
    InvalidSentinel(Symbol),
    /// The table has rows for states that are not declared.
    UndeclaredStates(Vec<State>),
    /// Halting states that have outgoing transitions.
    HaltingStateTransitions(Vec<State>),
    /// The reject policy names a state that is not a halting state.
    InvalidRejectState(State),
}

impl From<AnalysisError> for DtmError {
    /// Converts an `AnalysisError` into a `DtmError::ValidationError`.
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::NoStates => DtmError::ValidationError("No states declared".to_string()),
            AnalysisError::InvalidStartState(state) => {
                DtmError::ValidationError(format!("Invalid start state: {}", state))
            }
            AnalysisError::UndeclaredHaltingStates(states) => DtmError::ValidationError(format!(
                "Halting states are not declared states: {:?}",
                states
            )),
            AnalysisError::BlankNotInTapeAlphabet(blank) => DtmError::ValidationError(format!(
                "Blank symbol {:?} is not in the tape alphabet",
                blank
            )),
            AnalysisError::BlankInInputAlphabet(blank) => DtmError::ValidationError(format!(
                "Blank symbol {:?} must not be an input symbol",
                blank
            )),
            AnalysisError::InputNotInTapeAlphabet(symbols) => DtmError::ValidationError(
                format!("Input symbols missing from the tape alphabet: {:?}", symbols),
            ),
            AnalysisError::InvalidSentinel(symbol) => DtmError::ValidationError(format!(
                "Sentinel {:?} must be a tape symbol outside the input alphabet",
                symbol
            )),
            AnalysisError::UndeclaredStates(states) => DtmError::ValidationError(format!(
                "Transitions reference undeclared states: {:?}",
                states
            )),
            AnalysisError::HaltingStateTransitions(states) => DtmError::ValidationError(format!(
                "Halting states must not have transitions: {:?}",
                states
            )),
            AnalysisError::InvalidRejectState(state) => {
                DtmError::ValidationError(format!("Reject state {} is not a halting state", state))
            }
        }
    }
}

/// Analyzes a `Machine` for structural errors.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(DtmError::ValidationError)` describing the first problem found.
pub fn analyze(machine: &Machine) -> Result<(), DtmError> {
    [
        check_states,
        check_alphabets,
        check_sentinel,
        check_rows,
        check_mode,
    ]
    .iter()
    .find_map(|f| f(machine).err())
    .map_or(Ok(()), |error| Err(error.into()))
}

/// Checks the start state and the halting states against the state set.
fn check_states(machine: &Machine) -> Result<(), AnalysisError> {
    if machine.states.is_empty() {
        return Err(AnalysisError::NoStates);
    }

    if !machine.states.contains(&machine.start_state) {
        return Err(AnalysisError::InvalidStartState(
            machine.start_state.clone(),
        ));
    }

    let undeclared = difference(&machine.halting_states, &machine.states);
    if !undeclared.is_empty() {
        return Err(AnalysisError::UndeclaredHaltingStates(undeclared));
    }

    Ok(())
}

/// Checks that the input alphabet and the blank nest inside the tape alphabet.
fn check_alphabets(machine: &Machine) -> Result<(), AnalysisError> {
    if !machine.is_tape_symbol(machine.blank) {
        return Err(AnalysisError::BlankNotInTapeAlphabet(machine.blank));
    }

    if machine.is_input_symbol(machine.blank) {
        return Err(AnalysisError::BlankInInputAlphabet(machine.blank));
    }

    let missing = difference(&machine.input_alphabet, &machine.tape_alphabet);
    if !missing.is_empty() {
        return Err(AnalysisError::InputNotInTapeAlphabet(missing));
    }

    Ok(())
}

fn check_sentinel(machine: &Machine) -> Result<(), AnalysisError> {
    match machine.sentinel {
        Some(sentinel)
            if !machine.is_tape_symbol(sentinel) || machine.is_input_symbol(sentinel) =>
        {
            Err(AnalysisError::InvalidSentinel(sentinel))
        }
        _ => Ok(()),
    }
}

/// Checks that the table only has rows for declared states and none with entries for halting
/// states, and that every target state is declared.
fn check_rows(machine: &Machine) -> Result<(), AnalysisError> {
    let mut undeclared: BTreeSet<State> = machine
        .transitions
        .states()
        .filter(|state| !machine.states.contains(*state))
        .cloned()
        .collect();

    undeclared.extend(
        machine
            .transitions
            .entries()
            .map(|(_, _, action)| &action.next_state)
            .filter(|state| !machine.states.contains(*state))
            .cloned(),
    );

    if !undeclared.is_empty() {
        return Err(AnalysisError::UndeclaredStates(
            undeclared.into_iter().collect(),
        ));
    }

    let halting_with_rows: Vec<State> = machine
        .halting_states
        .iter()
        .filter(|state| {
            machine
                .transitions
                .row(state)
                .is_some_and(|row| !row.is_empty())
        })
        .cloned()
        .collect();

    if !halting_with_rows.is_empty() {
        return Err(AnalysisError::HaltingStateTransitions(halting_with_rows));
    }

    Ok(())
}

fn check_mode(machine: &Machine) -> Result<(), AnalysisError> {
    match &machine.mode {
        Mode::Reject(state) if !machine.is_halting(state) => {
            Err(AnalysisError::InvalidRejectState(state.clone()))
        }
        _ => Ok(()),
    }
}

fn difference<T: Ord + Clone>(items: &BTreeSet<T>, of: &BTreeSet<T>) -> Vec<T> {
    items.difference(of).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TransitionTable;
    use crate::types::{Action, Direction};

    fn valid_machine() -> Machine {
        let mut transitions = TransitionTable::from_entries([
            ("q0", '0', Action::new("q0", '0', Direction::Right)),
            ("q0", 'b', Action::new("qY", 'b', Direction::Left)),
        ])
        .unwrap();
        transitions.declare("qY");

        Machine {
            name: "Valid".to_string(),
            states: ["q0", "qY", "qN"].map(String::from).into(),
            input_alphabet: ['0', '1'].into(),
            tape_alphabet: ['0', '1', 'b', 'S'].into(),
            blank: 'b',
            start_state: "q0".to_string(),
            halting_states: ["qY", "qN"].map(String::from).into(),
            transitions,
            mode: Mode::Strict,
            sentinel: Some('S'),
        }
    }

    #[test]
    fn test_valid_machine() {
        assert_eq!(analyze(&valid_machine()), Ok(()));
    }

    #[test]
    fn test_invalid_start_state() {
        let mut machine = valid_machine();
        machine.start_state = "q9".to_string();

        assert_eq!(
            check_states(&machine),
            Err(AnalysisError::InvalidStartState("q9".to_string()))
        );
        assert_eq!(
            analyze(&machine).unwrap_err().to_string(),
            "Program validation error: Invalid start state: q9"
        );
    }

    #[test]
    fn test_no_states() {
        let mut machine = valid_machine();
        machine.states.clear();

        assert_eq!(check_states(&machine), Err(AnalysisError::NoStates));
    }

    #[test]
    fn test_undeclared_halting_state() {
        let mut machine = valid_machine();
        machine.halting_states.insert("qX".to_string());

        assert_eq!(
            check_states(&machine),
            Err(AnalysisError::UndeclaredHaltingStates(vec!["qX".to_string()]))
        );
    }

    #[test]
    fn test_blank_must_be_tape_symbol() {
        let mut machine = valid_machine();
        machine.blank = '_';

        assert_eq!(
            check_alphabets(&machine),
            Err(AnalysisError::BlankNotInTapeAlphabet('_'))
        );
    }

    #[test]
    fn test_blank_must_not_be_input_symbol() {
        let mut machine = valid_machine();
        machine.input_alphabet.insert('b');

        assert_eq!(
            check_alphabets(&machine),
            Err(AnalysisError::BlankInInputAlphabet('b'))
        );
    }

    #[test]
    fn test_input_must_be_subset_of_tape() {
        let mut machine = valid_machine();
        machine.input_alphabet.insert('2');

        assert_eq!(
            check_alphabets(&machine),
            Err(AnalysisError::InputNotInTapeAlphabet(vec!['2']))
        );
    }

    #[test]
    fn test_sentinel_must_be_tape_symbol() {
        let mut machine = valid_machine();
        machine.sentinel = Some('#');

        assert_eq!(
            check_sentinel(&machine),
            Err(AnalysisError::InvalidSentinel('#'))
        );
    }

    #[test]
    fn test_undeclared_states_in_table() {
        let mut machine = valid_machine();
        machine
            .transitions
            .insert("q5", '1', Action::new("q6", '1', Direction::Left))
            .unwrap();

        assert_eq!(
            check_rows(&machine),
            Err(AnalysisError::UndeclaredStates(vec![
                "q5".to_string(),
                "q6".to_string()
            ]))
        );
    }

    #[test]
    fn test_halting_state_with_transitions() {
        let mut machine = valid_machine();
        machine
            .transitions
            .insert("qN", '0', Action::new("q0", '0', Direction::Left))
            .unwrap();

        assert_eq!(
            check_rows(&machine),
            Err(AnalysisError::HaltingStateTransitions(vec!["qN".to_string()]))
        );
    }

    #[test]
    fn test_partial_table_is_accepted() {
        // q0 has no entry for '1'; that only matters if a run reaches it.
        let machine = valid_machine();
        assert!(check_rows(&machine).is_ok());
    }

    #[test]
    fn test_reject_state_must_halt() {
        let mut machine = valid_machine();
        machine.mode = Mode::Reject("q0".to_string());
        assert_eq!(
            check_mode(&machine),
            Err(AnalysisError::InvalidRejectState("q0".to_string()))
        );

        machine.mode = Mode::Reject("qN".to_string());
        assert!(check_mode(&machine).is_ok());
    }

    #[test]
    fn test_first_error_is_reported() {
        let mut machine = valid_machine();
        machine.start_state = "q9".to_string();
        machine.blank = '_';

        let error = analyze(&machine).unwrap_err();
        assert!(error.to_string().contains("Invalid start state"));
    }
}
