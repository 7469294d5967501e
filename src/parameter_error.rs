//! Error handling for robot description and configuration readers

use std::io;

/// Unified error to report failures while reading YAML robot descriptions and
/// collision space configuration.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse Error: {0}")]
    ParseError(String),
    #[error("Missing Field: {0}")]
    MissingField(String),
    #[error("Invalid Length of {field}: expected {expected}, found {found}")]
    InvalidLength {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("Robot Model Error: {0}")]
    ModelError(String),
}
