use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dimension mismatch: expected {expected} components, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("no entity is labelled `{label}`")]
    MissingEntity { label: String },

    #[error("orientation needs two non-reference entities, found {found}")]
    NotEnoughOrientors { found: usize },

    #[error("malformed similarity record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("clock for `{label}` is out of line: expected {expected}, found {found}")]
    ClockInconsistent {
        label: String,
        expected: u64,
        found: u64,
    },

    #[error("position set has {found} entries but the embedding holds {expected} entities")]
    PositionCountMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
