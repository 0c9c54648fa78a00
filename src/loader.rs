//! This module provides the `ProgramLoader` struct, responsible for loading machine
//! descriptions from files, strings, and directories of `.dtm` files.

use crate::parser::parse;
use crate::types::{DtmError, Machine};
use std::fs;
use std::path::{Path, PathBuf};

/// `ProgramLoader` loads machine descriptions from individual files, from string content,
/// or from every `.dtm` file in a directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single machine from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Machine)` if the file is successfully read and parsed.
    /// * `Err(DtmError::FileError)` if the file cannot be read.
    /// * `Err(DtmError::ParseError)` if the file content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Machine, DtmError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DtmError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!("loading machine from {}", path.display());
        parse(&content)
    }

    /// Loads a single machine from the provided string content, e.g. piped from stdin.
    pub fn load_program_from_string(content: &str) -> Result<Machine, DtmError> {
        parse(content)
    }

    /// Loads every `.dtm` file in `directory`.
    ///
    /// Directories and files with other extensions are skipped. Each element of the result
    /// reports either the loaded machine with its path or the error for that file.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Machine), DtmError>> {
        if !directory.exists() {
            return vec![Err(DtmError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(DtmError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(DtmError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                // Skip directories and non-.dtm files
                if path.is_dir() || path.extension().is_none_or(|ext| ext != "dtm") {
                    return None;
                }

                match Self::load_program(&path) {
                    Ok(program) => Some(Ok((path, program))),
                    Err(e) => {
                        tracing::warn!("skipping {}: {}", path.display(), e);
                        Some(Err(DtmError::FileError(format!(
                            "Failed to load program from {}: {}",
                            path.display(),
                            e
                        ))))
                    }
                }
            })
            .collect()
    }
}
