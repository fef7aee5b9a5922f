//! Error types for statement compilation and record parsing.
//!
//! This module provides the [`MarcError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Errors fall into three classes:
//! - compile-time errors raised while turning a selection statement into a
//!   [`CompiledQuery`](crate::query::CompiledQuery),
//! - per-record structural errors, which reject a single record,
//! - source-level errors (see [`MarcError::is_fatal`]), which end a stream.

use thiserror::Error;

/// Error type for all library operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The selection statement as a whole is unusable (empty, wrong shape).
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// A field token of the statement is not a valid field pattern.
    #[error("Invalid field pattern: {0}")]
    InvalidFieldPattern(String),

    /// The condition clause is malformed.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// The regular expression attached to a condition does not compile.
    #[error("Invalid condition regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Error indicating an invalid or malformed record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The input could not be decoded as text.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// The XML document is not well formed.
    #[error("XML error: {0}")]
    XmlError(String),

    /// JSON (de)serialization of options or results failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A path whose extension names no supported format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// IO error from the underlying source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarcError {
    /// Whether this error ends the record stream it was raised from.
    ///
    /// Structural record errors only reject the current record; decoding,
    /// XML well-formedness and IO failures leave the source unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MarcError::EncodingError(_) | MarcError::XmlError(_) | MarcError::IoError(_)
        )
    }
}

impl From<quick_xml::Error> for MarcError {
    fn from(err: quick_xml::Error) -> Self {
        MarcError::XmlError(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for MarcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        MarcError::XmlError(err.to_string())
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(MarcError::EncodingError("bad utf-8".to_string()).is_fatal());
        assert!(MarcError::XmlError("unclosed".to_string()).is_fatal());
        assert!(MarcError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "gone")).is_fatal());
        assert!(!MarcError::InvalidRecord("short".to_string()).is_fatal());
        assert!(!MarcError::InvalidCondition("(".to_string()).is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = MarcError::InvalidFieldPattern("24".to_string());
        assert_eq!(err.to_string(), "Invalid field pattern: 24");
    }
}
