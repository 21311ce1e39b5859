use serde::{Deserialize, Serialize};

/// How thoroughly a batch is checked before it is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    /// Field presence and numeric sanity.
    Basic,
    /// Basic plus record count against the expected batch size.
    Standard,
    /// Standard plus independent recomputation of a sample.
    Strict,
}

/// Outcome of validating a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub level: ValidationLevel,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Number of records inspected.
    pub checked: usize,
}

impl ValidationResult {
    /// An empty, passing result at `level`.
    pub fn new(level: ValidationLevel) -> Self {
        Self {
            level,
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            checked: 0,
        }
    }

    /// Record an error; the result no longer passes.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// First error, or a generic description when there is none.
    pub fn failure_reason(&self) -> String {
        match self.errors.as_slice() {
            [] => "validation passed".to_string(),
            [only] => only.clone(),
            [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
        }
    }
}
