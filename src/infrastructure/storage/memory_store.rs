use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use crate::application::ports::{ByteReader, ByteSink, ByteStreamFactory, ByteWriter, StorageError};
use crate::domain::value_objects::{ChannelName, DataUnitId, StreamRole};

type StreamKey = (DataUnitId, ChannelName, StreamRole);
type Streams = Rc<RefCell<HashMap<StreamKey, Vec<u8>>>>;

/// In-process stream factory. Clones share the same streams.
#[derive(Clone, Default)]
pub struct MemoryStore {
    streams: Streams,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bytes of a stream, `None` if it was never created.
    pub fn contents(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Option<Vec<u8>> {
        self.streams
            .borrow()
            .get(&(unit, channel.clone(), role))
            .cloned()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.borrow().len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.streams
            .borrow()
            .values()
            .map(|bytes| bytes.len() as u64)
            .sum()
    }
}

/// Appends straight into the shared map, so written bytes are visible
/// before `finish`.
struct MemorySink {
    key: StreamKey,
    streams: Streams,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.streams
            .borrow_mut()
            .entry(self.key.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteSink for MemorySink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStreamFactory for MemoryStore {
    fn create(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<ByteWriter, StorageError> {
        let key = (unit, channel.clone(), role);
        self.streams.borrow_mut().insert(key.clone(), Vec::new());
        Ok(Box::new(MemorySink {
            key,
            streams: self.streams.clone(),
        }))
    }

    fn open(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<Option<ByteReader>, StorageError> {
        Ok(self
            .contents(unit, channel, role)
            .map(|bytes| Box::new(Cursor::new(bytes)) as ByteReader))
    }

    fn remove(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<(), StorageError> {
        self.streams
            .borrow_mut()
            .remove(&(unit, channel.clone(), role));
        Ok(())
    }
}
