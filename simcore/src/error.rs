//! Hand-rolled error enums. No `thiserror`, no `anyhow` — every error path
//! is a concrete variant the caller can match on, the way the rest of this
//! codebase does it.

use std::fmt;
use std::io;

/// Everything that can go wrong while parsing and validating a configuration
/// document, before a single task is ever run.
#[derive(Debug)]
pub enum ConfigError {
    /// a required field was absent
    Missing(String),
    /// a required field had the wrong JSON type
    TypeMismatch { field: String, expected: &'static str },
    /// a `patches` entry did not apply cleanly
    Patch(String),
    /// the model/tweaks/terminate sub-document failed to deserialize
    Decode { what: &'static str, reason: String },
    /// a batch-level problem, tagged with the offending batch's name
    Batch { name: String, reason: String },
    /// `parallel-max` or another numeric field was out of range
    OutOfRange { field: String, reason: String },
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "missing required field '{}'", field),
            Self::TypeMismatch { field, expected } => {
                write!(f, "field '{}' must be {}", field, expected)
            }
            Self::Patch(reason) => write!(f, "failed to apply patch: {}", reason),
            Self::Decode { what, reason } => write!(f, "failed to decode {}: {}", what, reason),
            Self::Batch { name, reason } => write!(f, "batch '{}': {}", name, reason),
            Self::OutOfRange { field, reason } => write!(f, "field '{}': {}", field, reason),
            Self::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A replica's step loop failed. Only ever constructed from I/O failures —
/// a panic inside the model or a callback is caught at the pool boundary and
/// never turns into this type.
#[derive(Debug)]
pub enum TaskError {
    Io(io::Error),
    Decode(String),
    /// the model step or a callback panicked; caught at the task boundary
    /// (not the pool's) so the message reaches this replica's `.err`.
    Panicked(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Decode(reason) => write!(f, "decode error: {}", reason),
            Self::Panicked(reason) => write!(f, "panicked: {}", reason),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<io::Error> for TaskError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
