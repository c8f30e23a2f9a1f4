//! Error types for identifier parsing and validation.

use thiserror::Error;

/// Errors raised while slicing or validating a Surrogate or one of its
/// segments.
///
/// Every variant names the offending segment so callers can report it back
/// verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required value is missing.
    #[error("argument '{segment}' must not be null")]
    ArgumentIsNull { segment: &'static str },

    /// The value contains characters outside the segment's character class.
    #[error("argument '{segment}' contains invalid characters")]
    ArgumentBadValue { segment: &'static str },

    /// The value is shorter or longer than the segment allows.
    #[error("argument '{segment}' length does not match the expected range")]
    ArgumentLengthMismatch { segment: &'static str },

    /// The input did not split into the expected number of segments.
    #[error("argument '{segment}' requires {expected} segments, got {actual}")]
    SegmentCount {
        segment: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SchemaError {
    /// Returns the name of the segment the error refers to.
    pub fn segment(&self) -> &'static str {
        match self {
            SchemaError::ArgumentIsNull { segment }
            | SchemaError::ArgumentBadValue { segment }
            | SchemaError::ArgumentLengthMismatch { segment }
            | SchemaError::SegmentCount { segment, .. } => segment,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::ArgumentIsNull { .. } => "ARGUMENT_IS_NULL",
            SchemaError::ArgumentBadValue { .. } => "ARGUMENT_BAD_VALUE",
            SchemaError::ArgumentLengthMismatch { .. } | SchemaError::SegmentCount { .. } => {
                "ARGUMENT_LENGTH_MISMATCH"
            }
        }
    }
}
