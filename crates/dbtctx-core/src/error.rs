//! Error types for document parsing.

use thiserror::Error;

/// Errors that can occur while turning raw documents into typed entities.
///
/// Lookups that find nothing are not errors: they return `None` or an
/// empty list. Cache and registry operations never fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Raw text could not be decoded, or its root is not a mapping
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// An enumerated field carried a value outside its known set
    #[error("Invalid value '{value}' for {field}")]
    InvalidEnumValue { field: &'static str, value: String },
}

impl ParseError {
    /// Create a new MalformedDocument error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// Create a new InvalidEnumValue error.
    pub fn invalid_enum(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnumValue {
            field,
            value: value.into(),
        }
    }
}
