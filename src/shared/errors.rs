//! Error handling for the clipboard history engine
//!
//! A single `EngineError` enum covers every failure the engine can report.
//! None of them are fatal: callers log and carry on with the in-memory state.

use thiserror::Error;
use serde::Serialize;

/// Engine errors
///
/// Variants are serializable so a presentation layer can forward them as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum EngineError {
    /// File system error while reading or writing the history or settings
    #[error("I/O error: {0}")]
    Io(String),

    /// Encoding the history failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The history file exists but could not be decoded
    #[error("Corrupt history file: {0}")]
    CorruptHistory(String),

    /// No entry with the given id
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Host clipboard read/write failure
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Settings could not be located or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(ref msg) if msg.contains("denied")));
    }

    #[test]
    fn test_error_serializes_tagged() {
        let err = EngineError::NotFound("abc".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "NotFound");
        assert_eq!(json["message"], "abc");
    }
}
