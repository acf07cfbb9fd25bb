//! Error types for symbol generation and symbol-library codec operations.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for symbol operations.
pub type SymbolResult<T> = Result<T, SymbolError>;

/// Errors that can occur while building, laying out, writing or parsing symbols.
#[derive(Debug, Error)]
pub enum SymbolError {
    /// Failed to open or read a file.
    #[error("Failed to read file: {path}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file: {path}")]
    FileWrite {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The symbol-library text is structurally invalid.
    #[error("Malformed symbol library at offset {offset}: {message}")]
    MalformedDocument {
        /// Byte offset where the problem was detected (0 when not positional).
        offset: usize,
        /// Description of what's wrong.
        message: String,
    },

    /// A type, style or side token matched nothing in its mnemonic table.
    #[error("Unrecognized {category} '{token}'{reason}")]
    UnrecognizedMnemonic {
        /// Mnemonic category (pin type, pin style, side).
        category: &'static str,
        /// The offending token as supplied.
        token: String,
        /// Extra detail, e.g. the tied candidates of an ambiguous fuzzy match.
        reason: String,
    },

    /// The tabular rows for a part could not be interpreted.
    #[error("Invalid pin table for part '{part}': {message}")]
    InvalidTable {
        /// Part name (or a placeholder when the name row is missing).
        part: String,
        /// Description of what's wrong.
        message: String,
    },

    /// A unit ended up with no placeable pins.
    #[error("Unit '{unit}' of part '{part}' has no placeable pins")]
    EmptyUnit {
        /// Part name.
        part: String,
        /// Unit identifier.
        unit: String,
    },

    /// A part has no usable pins at all.
    #[error("No valid pins defined for part '{part}'")]
    NoPins {
        /// Part name.
        part: String,
    },

    /// A part record is missing its name.
    #[error("Part name is missing")]
    MissingPartName,

    /// The output target exists and overwriting was not permitted.
    #[error("Output file {path} already exists; overwriting has not been enabled")]
    OutputExists {
        /// Path of the existing output.
        path: PathBuf,
    },

    /// No input adapter is registered under this name.
    #[error("Unknown input format '{name}'")]
    UnknownAdapter {
        /// Requested adapter name.
        name: String,
    },

    /// CSV decoding or encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SymbolError {
    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed document error.
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            offset,
            message: message.into(),
        }
    }

    /// Creates an unrecognized mnemonic error.
    pub fn unrecognized(category: &'static str, token: impl Into<String>) -> Self {
        Self::UnrecognizedMnemonic {
            category,
            token: token.into(),
            reason: String::new(),
        }
    }

    /// Creates an invalid table error.
    pub fn invalid_table(part: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTable {
            part: part.into(),
            message: message.into(),
        }
    }
}

/// A non-fatal problem with a single input record.
///
/// The record was either repaired with a default or dropped; processing of
/// the rest of the part continued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Part the record belongs to.
    pub part: String,
    /// Zero-based position of the record in the part's pin list.
    pub row: usize,
    /// What happened.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic for a specific record.
    pub fn at(part: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            row,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (pin row {}): {}", self.part, self.row + 1, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SymbolError::malformed(12, "unbalanced list");
        assert_eq!(
            err.to_string(),
            "Malformed symbol library at offset 12: unbalanced list"
        );
    }

    #[test]
    fn unrecognized_display() {
        let err = SymbolError::unrecognized("pin type", "sideways");
        assert_eq!(err.to_string(), "Unrecognized pin type 'sideways'");
    }

    #[test]
    fn diagnostic_display_is_one_based() {
        let diag = Diagnostic::at("LM358", 0, "empty pin number");
        assert_eq!(diag.to_string(), "LM358 (pin row 1): empty pin number");
    }
}
