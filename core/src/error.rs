use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller asked for something the schema cannot express, e.g. a kick
    /// table. Never returned for an empty result set.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Sequence '{name}' exhausted its numeric range")]
    SequenceExhausted { name: &'static str },

    #[error("Dimension insert race on '{table}' unresolved after {attempts} attempts")]
    DimensionRaceExhausted { table: &'static str, attempts: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
