//! Descriptor parsing errors.

use thiserror::Error;

/// Errors raised while reading or writing a descriptor.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("line {line}, column {column}: unknown element <{tag}>")]
    UnknownElement {
        line: usize,
        column: usize,
        tag: String,
    },

    #[error("line {line}, column {column}: element <{to}> is not allowed within <{from}>")]
    Transition {
        line: usize,
        column: usize,
        from: &'static str,
        to: &'static str,
    },

    #[error("line {line}, column {column}: element <{element}> requires attribute '{attribute}'")]
    MissingAttribute {
        line: usize,
        column: usize,
        element: &'static str,
        attribute: &'static str,
    },

    #[error("line {line}, column {column}: template declares more than one predecessor")]
    DuplicatePredecessor { line: usize, column: usize },

    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document ended without a complete root element.
    #[error("descriptor has no <configuration> root element")]
    Empty,

    #[error("failed to write descriptor: {0}")]
    Write(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Returns the (line, column) the error was detected at, if known.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            TemplateError::UnknownElement { line, column, .. }
            | TemplateError::Transition { line, column, .. }
            | TemplateError::MissingAttribute { line, column, .. }
            | TemplateError::DuplicatePredecessor { line, column }
            | TemplateError::Syntax { line, column, .. } => Some((*line, *column)),
            TemplateError::Empty | TemplateError::Write(_) | TemplateError::Io(_) => None,
        }
    }
}
