//! Graph error types.

use thiserror::Error;

/// Errors surfaced by the code-block graph.
///
/// Absent ids, empty inputs and missing nodes are not errors; those
/// operations return empty results instead.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The compiler collaborator rejected a block's source.
    #[error("failed to compile code block {code_id}: {message}")]
    Compile { code_id: String, message: String },

    /// Unique id generation ran out of attempts.
    #[error("no free code id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    /// The document source failed to load or persist.
    #[error("document source error: {0}")]
    Source(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
