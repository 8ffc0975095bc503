use thiserror::Error;

#[derive(Error, Debug)]
pub enum DwtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp error: {0}")]
    Time(#[from] time::error::Format),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate archive entry name: {0}")]
    DuplicateEntryName(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    #[error("Unknown dog: {0}")]
    UnknownDog(String),

    #[error("Unknown entry: {0}")]
    UnknownEntry(String),

    #[error("Dog \"{name}\" (owner \"{owner}\") already exists")]
    DuplicateDog { name: String, owner: String },
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, DwtError>;
