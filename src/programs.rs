use crate::types::{DtmError, Machine};

use std::sync::RwLock;

// Embedded reference machines
const PROGRAM_TEXTS: [&str; 2] = [
    include_str!("../programs/binary-suffix.dtm"),
    include_str!("../programs/binary-addition.dtm"),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: RwLock<Vec<Machine>> = RwLock::new(Vec::new());
}

pub struct ProgramManager;

impl ProgramManager {
    /// Parses the embedded machines and stores them in `PROGRAMS`.
    pub fn load() -> Result<(), DtmError> {
        let mut programs = Vec::new();

        for (index, program_text) in PROGRAM_TEXTS.iter().enumerate() {
            match crate::parser::parse(program_text) {
                Ok(program) => programs.push(program),
                Err(e) => tracing::warn!("failed to parse embedded program {}: {}", index, e),
            }
        }

        if let Ok(mut write_guard) = PROGRAMS.write() {
            *write_guard = programs;
        } else {
            return Err(DtmError::FileError(
                "Failed to acquire write lock".to_string(),
            ));
        }

        Ok(())
    }

    /// Loads the embedded machines on first use.
    fn ensure_loaded() {
        let loaded = PROGRAMS
            .read()
            .map(|programs| !programs.is_empty())
            .unwrap_or(false);

        if !loaded {
            let _ = Self::load();
        }
    }

    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        Self::ensure_loaded();

        PROGRAMS.read().map(|programs| programs.len()).unwrap_or(0)
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<Machine, DtmError> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map_err(|_| DtmError::FileError("Failed to acquire read lock".to_string()))?
            .get(index)
            .cloned()
            .ok_or_else(|| {
                DtmError::ValidationError(format!("Program index {} out of range", index))
            })
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<Machine, DtmError> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map_err(|_| DtmError::FileError("Failed to acquire read lock".to_string()))?
            .iter()
            .find(|program| program.name == name)
            .cloned()
            .ok_or_else(|| DtmError::ValidationError(format!("Program '{}' not found", name)))
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .map(|program| program.name.clone())
                    .collect()
            })
            .unwrap_or_else(|_| Vec::new())
    }

    /// Get information about a program by its index
    pub fn get_program_info(index: usize) -> Result<ProgramInfo, DtmError> {
        let program = Self::get_program_by_index(index)?;

        Ok(ProgramInfo {
            index,
            name: program.name.clone(),
            start_state: program.start_state.clone(),
            state_count: program.states.len(),
            halting_state_count: program.halting_states.len(),
            transition_count: program.transitions.len(),
        })
    }

    /// Search for programs by name
    pub fn search_programs(query: &str) -> Vec<usize> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .enumerate()
                    .filter(|(_, program)| {
                        program.name.to_lowercase().contains(&query.to_lowercase())
                    })
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_else(|_| Vec::new())
    }

    /// Get the original text of a program by its index
    pub fn get_program_text_by_index(index: usize) -> Result<&'static str, DtmError> {
        PROGRAM_TEXTS.get(index).copied().ok_or_else(|| {
            DtmError::ValidationError(format!("Program text index {} out of range", index))
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub start_state: String,
    pub state_count: usize,
    pub halting_state_count: usize,
    pub transition_count: usize,
}
