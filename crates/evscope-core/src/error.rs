use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine and the record loaders.
///
/// Bad data inside a record set is never an error: malformed records and
/// undefined ratios are excluded and reported through the stats types.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidQuery(message.into())
    }
}
