use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A line of an input file could not be parsed. Fatal for the load.
    #[error("malformed record in {file} at line {line}: {reason}")]
    MalformedRecord { file: String, line: usize, reason: String },

    /// A result or judgment names an id the loaded corpus does not contain.
    #[error("unknown {kind} id '{id}'")]
    UnknownReference { kind: &'static str, id: String },

    #[error("division by zero while computing {what}")]
    DivisionByZero { what: &'static str },

    #[error("invalid value {value} for {name}, expected {expected}")]
    InvalidParameter { name: &'static str, value: String, expected: &'static str },

    #[error("re-ranking of query '{query_id}' was cancelled")]
    Cancelled { query_id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(file: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord { file: file.to_string(), line, reason: reason.into() }
    }
}
