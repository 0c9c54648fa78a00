//! The bounded tape and its read/write head.

use crate::config::RunConfig;
use crate::types::{Direction, DtmError, FaultKind, Machine, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-length, one-dimensional array of symbols with a single head.
///
/// The head always points inside the tape. Moves that would leave it are reported as
/// [`FaultKind::TapeOverrun`] and leave the tape unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Symbol>,
    head: usize,
}

impl Tape {
    /// Creates a tape of `length` blank cells with the head on cell 0.
    pub fn new(length: usize, blank: Symbol) -> Self {
        Self {
            cells: vec![blank; length],
            head: 0,
        }
    }

    /// Creates the starting tape of a run.
    ///
    /// The input is written from `config.head_offset` onward and the head is placed on its
    /// first cell. If the machine uses a sentinel it goes in the cell just before the input.
    /// Every input symbol must belong to the machine's input alphabet.
    pub fn load(machine: &Machine, input: &str, config: &RunConfig) -> Result<Self, DtmError> {
        config.validate()?;

        let input: Vec<Symbol> = input.chars().collect();
        if let Some(&symbol) = input.iter().find(|&&c| !machine.is_input_symbol(c)) {
            return Err(DtmError::InvalidInput(format!(
                "Symbol {:?} is not in the input alphabet",
                symbol
            )));
        }

        let end = config.head_offset + input.len();
        if end > config.tape_length {
            return Err(DtmError::InvalidInput(format!(
                "Input of {} symbols at offset {} does not fit on a tape of {} cells",
                input.len(),
                config.head_offset,
                config.tape_length
            )));
        }

        let mut tape = Self::new(config.tape_length, machine.blank);
        tape.cells[config.head_offset..end].copy_from_slice(&input);

        if let Some(sentinel) = machine.sentinel {
            let cell = config.head_offset.checked_sub(1).ok_or_else(|| {
                DtmError::ConfigError(
                    "Head offset must leave a cell for the sentinel before the input".to_string(),
                )
            })?;
            tape.cells[cell] = sentinel;
        }

        tape.head = config.head_offset;
        Ok(tape)
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.cells[self.head]
    }

    /// Overwrites the cell under the head.
    pub fn write(&mut self, symbol: Symbol) {
        self.cells[self.head] = symbol;
    }

    /// Moves the head one cell in `direction`.
    pub fn shift(&mut self, direction: Direction) -> Result<(), FaultKind> {
        self.head = self.target(direction)?;
        Ok(())
    }

    /// Writes `symbol` under the head and then moves it.
    ///
    /// The move is checked first, so an overrun leaves both the cell and the head as they were.
    pub fn apply(&mut self, symbol: Symbol, direction: Direction) -> Result<(), FaultKind> {
        let target = self.target(direction)?;
        self.write(symbol);
        self.head = target;

        Ok(())
    }

    /// Computes the head position after a move without performing it.
    fn target(&self, direction: Direction) -> Result<usize, FaultKind> {
        self.head
            .checked_add_signed(direction.displacement())
            .filter(|&position| position < self.cells.len())
            .ok_or(FaultKind::TapeOverrun {
                position: self.head,
                direction,
                length: self.cells.len(),
            })
    }

    /// Returns an owned copy of the current cells and head position.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.cells.clone(),
            head: self.head,
        }
    }

    /// Returns the head position.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the tape has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the cells from left to right.
    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cells.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// An immutable copy of the tape taken after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: Vec<Symbol>,
    pub head: usize,
}

impl Snapshot {
    /// The cells concatenated into a string, without delimiters.
    pub fn as_string(&self) -> String {
        self.cells.iter().collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}
