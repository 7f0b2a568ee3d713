//! Errors raised while loading configuration
//!
//! Only the loading boundary returns these. Once the frame loop runs, every
//! failure is handled inside the frame.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or parse a stage or settings file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A pattern definition that cannot be turned into a usable pattern
#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("parameter `{field}` is not a finite number")]
    NonFinite { field: &'static str },
    #[error("burst count {0} is negative")]
    NegativeBurstCount(f32),
}
