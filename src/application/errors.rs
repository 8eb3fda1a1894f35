//! Error type shared by the session use cases.

use thiserror::Error;

use crate::application::ports::StorageError;
use crate::domain::errors::CodecError;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<std::io::Error> for UseCaseError {
    fn from(e: std::io::Error) -> Self {
        UseCaseError::Codec(CodecError::Io(e))
    }
}
