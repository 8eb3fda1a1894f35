use thiserror::Error;

/// Failures of the physical stream storage behind the byte stream port.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Corrupt offset index: {0}")]
    CorruptIndex(String),

    #[error("Index {index} out of range (entry count {count})")]
    IndexOutOfRange { index: u64, count: u64 },

    #[error("Channel '{channel}' has {available} parts, part {index} requested")]
    ChannelUnderrun {
        channel: String,
        index: u64,
        available: u64,
    },

    #[error("An entry is already open")]
    EntryAlreadyOpen,

    #[error("No entry is open")]
    NoEntryOpen,

    #[error("Segment {index} already provided (last provided {last})")]
    EntryAlreadyProvided { index: u64, last: u64 },

    #[error("Part {index} requested after part {last}")]
    OutOfOrderAccess { index: u64, last: u64 },

    #[error("Stream closed")]
    StreamClosed,

    #[error("Channel '{0}' is reserved")]
    ReservedChannel(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannelName(String),

    #[error("Malformed manifest: {0}")]
    Manifest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Protocol violations are caller bugs rather than storage faults.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CodecError::EntryAlreadyOpen
                | CodecError::NoEntryOpen
                | CodecError::EntryAlreadyProvided { .. }
                | CodecError::OutOfOrderAccess { .. }
                | CodecError::StreamClosed
                | CodecError::ReservedChannel(_)
        )
    }
}

impl From<CodecError> for std::io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Storage(StorageError::Io(e)) => e,
            other => std::io::Error::other(other),
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
