//! The transition function of a machine.
//!
//! A `TransitionTable` is filled once while a machine is being built and is only read
//! afterwards. Lookups never fail with a panic: a missing entry is reported as
//! [`Lookup::NotFound`] so the engine can turn it into a typed fault.

use crate::types::{Action, DtmError, Lookup, State, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps `(state, symbol)` to the [`Action`] to take.
///
/// The table may be partial. States can be declared with an empty row, which is how halting
/// states appear in machine descriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    rows: BTreeMap<State, BTreeMap<Symbol, Action>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(state, read, action)` entries.
    ///
    /// Fails on the first duplicated `(state, read)` pair.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, DtmError>
    where
        I: IntoIterator<Item = (S, Symbol, Action)>,
        S: Into<State>,
    {
        let mut table = Self::new();
        for (state, read, action) in entries {
            table.insert(state, read, action)?;
        }

        Ok(table)
    }

    /// Declares `state` as a row of the table without adding any entry to it.
    pub fn declare(&mut self, state: impl Into<State>) {
        self.rows.entry(state.into()).or_default();
    }

    /// Adds the entry for `(state, read)`.
    ///
    /// A second entry for the same pair would make the machine non-deterministic, so it is
    /// rejected rather than overwritten.
    pub fn insert(
        &mut self,
        state: impl Into<State>,
        read: Symbol,
        action: Action,
    ) -> Result<(), DtmError> {
        let state = state.into();
        let row = self.rows.entry(state.clone()).or_default();

        if row.contains_key(&read) {
            return Err(DtmError::ValidationError(format!(
                "Duplicate transition for state {} and symbol {:?}",
                state, read
            )));
        }

        row.insert(read, action);
        Ok(())
    }

    /// Returns the action for `(state, symbol)`.
    pub fn lookup(&self, state: &str, symbol: Symbol) -> Lookup<'_> {
        match self.rows.get(state).and_then(|row| row.get(&symbol)) {
            Some(action) => Lookup::Found(action),
            None => Lookup::NotFound,
        }
    }

    /// Returns the entries of a single state, if the state has a row.
    pub fn row(&self, state: &str) -> Option<&BTreeMap<Symbol, Action>> {
        self.rows.get(state)
    }

    /// Iterates over the states that have a row, in sorted order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.rows.keys()
    }

    /// Iterates over every entry as `(state, read, action)`.
    pub fn entries(&self) -> impl Iterator<Item = (&State, Symbol, &Action)> {
        self.rows
            .iter()
            .flat_map(|(state, row)| row.iter().map(move |(read, action)| (state, *read, action)))
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn sample_table() -> TransitionTable {
        TransitionTable::from_entries([
            ("q0", '0', Action::new("q0", '0', Direction::Right)),
            ("q0", 'b', Action::new("q1", 'b', Direction::Left)),
            ("q1", '0', Action::new("qY", 'b', Direction::Left)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_found() {
        let table = sample_table();

        assert_eq!(
            table.lookup("q0", 'b'),
            Lookup::Found(&Action::new("q1", 'b', Direction::Left))
        );
    }

    #[test]
    fn test_lookup_not_found() {
        let table = sample_table();

        assert_eq!(table.lookup("q1", '1'), Lookup::NotFound);
        assert_eq!(table.lookup("unknown", '0'), Lookup::NotFound);
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let mut table = sample_table();
        let result = table.insert("q0", '0', Action::new("q1", '1', Direction::Left));

        assert!(matches!(result, Err(DtmError::ValidationError(_))));
        // The original entry is untouched.
        assert_eq!(
            table.lookup("q0", '0'),
            Lookup::Found(&Action::new("q0", '0', Direction::Right))
        );
    }

    #[test]
    fn test_declared_state_has_empty_row() {
        let mut table = sample_table();
        table.declare("qY");

        assert_eq!(table.row("qY").map(BTreeMap::len), Some(0));
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.states().cloned().collect::<Vec<_>>(),
            vec!["q0", "q1", "qY"]
        );
    }

    #[test]
    fn test_entries_are_sorted() {
        let table = sample_table();
        let reads: Vec<_> = table
            .entries()
            .map(|(state, read, _)| (state.as_str(), read))
            .collect();

        assert_eq!(reads, vec![("q0", '0'), ("q0", 'b'), ("q1", '0')]);
    }
}
