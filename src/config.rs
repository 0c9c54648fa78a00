//! Run configuration: the bounded tape geometry, the step ceiling and the trace export policy.

use crate::types::{DtmError, MAX_EXECUTION_STEPS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The default number of tape cells.
pub const DEFAULT_TAPE_LENGTH: usize = 20;
/// The default cell at which the input starts and the head is placed.
pub const DEFAULT_HEAD_OFFSET: usize = 10;
/// A halted run's trace is exported only if it took more steps than this.
pub const DEFAULT_EXPORT_THRESHOLD: usize = 29;

/// Parameters of a single run.
///
/// Every field has a default, so a configuration file only needs to name the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of cells on the tape. The tape never grows.
    pub tape_length: usize,
    /// Cell where the input starts and where the head is placed.
    pub head_offset: usize,
    /// Maximum number of transitions before the run faults. `None` runs until halt.
    pub step_limit: Option<usize>,
    /// Export the trace of a halted run only when its step count exceeds this.
    pub export_threshold: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tape_length: DEFAULT_TAPE_LENGTH,
            head_offset: DEFAULT_HEAD_OFFSET,
            step_limit: Some(MAX_EXECUTION_STEPS),
            export_threshold: DEFAULT_EXPORT_THRESHOLD,
        }
    }
}

impl RunConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(content: &str) -> Result<Self, DtmError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| DtmError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, DtmError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DtmError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    pub fn with_tape_length(mut self, tape_length: usize) -> Self {
        self.tape_length = tape_length;
        self
    }

    pub fn with_head_offset(mut self, head_offset: usize) -> Self {
        self.head_offset = head_offset;
        self
    }

    pub fn with_step_limit(mut self, step_limit: Option<usize>) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_export_threshold(mut self, export_threshold: usize) -> Self {
        self.export_threshold = export_threshold;
        self
    }

    /// Checks the geometry on its own, independent of any input.
    pub fn validate(&self) -> Result<(), DtmError> {
        if self.tape_length == 0 {
            return Err(DtmError::ConfigError(
                "Tape length must be at least 1".to_string(),
            ));
        }

        if self.head_offset >= self.tape_length {
            return Err(DtmError::ConfigError(format!(
                "Head offset {} is outside a tape of {} cells",
                self.head_offset, self.tape_length
            )));
        }

        Ok(())
    }
}
