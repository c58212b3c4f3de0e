use crate::entry::EntryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinebaseError {
    #[error("Field '{0}' is missing in data")]
    MissingField(String),

    #[error("Too many fields in data: {got} keys for a schema of {expected} fields")]
    TooManyFields { got: usize, expected: usize },

    #[error("Entry with id '{id}' does not exist in table '{table}'")]
    EntryNotFound { table: String, id: EntryId },

    #[error("Expected 1 entry, got {0}")]
    ExpectedUniqueResult(usize),

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Database not connected")]
    NotConnected,

    #[error("Database already connected")]
    AlreadyConnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinebaseError>;
