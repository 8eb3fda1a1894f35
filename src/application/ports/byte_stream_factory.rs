#[cfg(test)]
use mockall::automock;
use std::io::{Read, Seek, Write};

pub use crate::domain::errors::StorageError;
use crate::domain::value_objects::{ChannelName, DataUnitId, StreamRole};

/// Writable end of a physical stream.
///
/// `finish` is the close hook: it flushes, finalises any framing (e.g. a
/// compression trailer) and releases the handle. Dropping a sink without
/// calling `finish` is allowed but loses the error.
pub trait ByteSink: Write {
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

/// Readable, seekable end of a physical stream, addressed in logical
/// (uncompressed) bytes.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek> ByteSource for T {}

/// Type alias for a boxed sink
pub type ByteWriter = Box<dyn ByteSink>;

/// Type alias for a boxed source
pub type ByteReader = Box<dyn ByteSource>;

/// Port resolving `(data unit, channel, role)` to physical streams.
#[cfg_attr(test, automock)]
pub trait ByteStreamFactory {
    /// Create (truncating) the stream for writing
    fn create(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<ByteWriter, StorageError>;

    /// Open the stream for reading; `None` when it was never written
    fn open(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<Option<ByteReader>, StorageError>;

    /// Remove the stream if present
    fn remove(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<(), StorageError>;
}
