//! Parts within one primary stream, delimited by a boundary index.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use tracing::debug;

use crate::application::ports::{ByteReader, ByteWriter};
use crate::codec::io::{
    resolve_seek, ByteRange, CountingSink, PositionedReader, DEFAULT_BUFFER_CAPACITY,
};
use crate::codec::offset_index::{OffsetIndex, OffsetIndexWriter, OffsetLookup};
use crate::domain::errors::{CodecError, CodecResult};
use crate::domain::value_objects::StreamState;

/// Writes an ordered sequence of parts into one primary stream.
///
/// Closing a part appends the primary stream length to the boundary index,
/// so part `i` is always `[boundary[i-1] or 0, boundary[i])`.
pub struct NestedWriter {
    data: CountingSink,
    boundaries: OffsetIndexWriter,
    state: StreamState,
    entry_start: u64,
}

impl NestedWriter {
    pub fn new(data: ByteWriter, boundaries: ByteWriter) -> Self {
        Self::with_capacity(data, boundaries, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(data: ByteWriter, boundaries: ByteWriter, capacity: usize) -> Self {
        Self {
            data: CountingSink::new(data, capacity),
            boundaries: OffsetIndexWriter::new(boundaries),
            state: StreamState::Unopened,
            entry_start: 0,
        }
    }

    /// Open the next part and return its index.
    pub fn put_next_entry(&mut self) -> CodecResult<u64> {
        let index = self.boundaries.count();
        self.state = self.state.open_part(index)?;
        self.entry_start = self.data.written();
        Ok(index)
    }

    /// Close the open part and record its end boundary.
    pub fn close_entry(&mut self) -> CodecResult<()> {
        let next = self.state.close_part()?;
        self.data.flush()?;
        let end = self.data.written();
        self.boundaries.append(end)?;
        debug!(
            part = self.boundaries.count() - 1,
            bytes = end - self.entry_start,
            "Closed part"
        );
        self.state = next;
        Ok(())
    }

    /// Number of closed parts.
    pub fn entry_count(&self) -> u64 {
        self.boundaries.count()
    }

    /// Bytes written into the open part, 0 when none is open.
    pub fn position(&self) -> u64 {
        match self.state {
            StreamState::PartOpen { .. } => self.data.written() - self.entry_start,
            _ => 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_entry_open(&self) -> bool {
        self.state.open_index().is_some()
    }

    /// Close the writer, finishing an open part first. Every underlying
    /// stream is finished even if an earlier step fails; the first error
    /// is returned.
    pub fn close(&mut self) -> CodecResult<()> {
        if self.state.is_closed() {
            return Ok(());
        }

        let mut first_error: Option<CodecError> = None;
        if self.is_entry_open() {
            if let Err(e) = self.close_entry() {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.data.finish() {
            first_error.get_or_insert(e.into());
        }
        if let Err(e) = self.boundaries.close() {
            first_error.get_or_insert(e);
        }
        self.state = StreamState::Closed;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Write for NestedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.state {
            StreamState::PartOpen { .. } => self.data.write(buf),
            StreamState::Closed => Err(CodecError::StreamClosed.into()),
            _ => Err(CodecError::NoEntryOpen.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.data.is_finished() {
            return Ok(());
        }
        self.data.flush()
    }
}

/// Random access to the parts of a primary stream.
///
/// `get_entry` binds a window over the part; `Read`/`Seek` then operate
/// inside that window and report end-of-stream at its end.
pub struct NestedReader {
    data: Option<PositionedReader>,
    boundaries: OffsetIndex,
    state: StreamState,
    window: ByteRange,
    cursor: u64,
}

impl NestedReader {
    /// Absent streams read as a channel with no parts.
    pub fn new(data: Option<ByteReader>, boundaries: Option<ByteReader>) -> CodecResult<Self> {
        let data: ByteReader = match data {
            Some(data) => data,
            None => Box::new(Cursor::new(Vec::new())),
        };
        Ok(Self {
            data: Some(PositionedReader::new(data)?),
            boundaries: OffsetIndex::open(boundaries)?,
            state: StreamState::Unopened,
            window: ByteRange::default(),
            cursor: 0,
        })
    }

    pub fn entry_count(&self) -> u64 {
        self.boundaries.count()
    }

    /// Bind the window to part `index` and return its absolute range.
    pub fn get_entry(&mut self, index: u64) -> CodecResult<ByteRange> {
        self.state.ensure_not_closed()?;
        let count = self.entry_count();
        if index >= count {
            return Err(CodecError::IndexOutOfRange { index, count });
        }

        let range = self.boundaries.range(index)?;
        let data_len = self.data_mut()?.len();
        if range.end > data_len {
            return Err(CodecError::CorruptIndex(format!(
                "part {} ends at {} beyond data length {}",
                index, range.end, data_len
            )));
        }

        self.close_entry();
        self.state = self.state.open_part(index)?;
        self.window = range;
        self.cursor = 0;
        Ok(range)
    }

    /// Advance `skip_count` parts past the last one served (0 = next).
    pub fn get_next_entry(&mut self, skip_count: u64) -> CodecResult<ByteRange> {
        let next = match self.state.last_index() {
            Some(last) => last + 1 + skip_count,
            None => skip_count,
        };
        self.get_entry(next)
    }

    /// Release the current window. Idempotent.
    pub fn close_entry(&mut self) {
        if let Ok(next) = self.state.close_part() {
            self.state = next;
        }
    }

    pub fn current_index(&self) -> Option<u64> {
        self.state.open_index()
    }

    /// Length of the open part, 0 when none is open.
    pub fn entry_len(&self) -> u64 {
        match self.state {
            StreamState::PartOpen { .. } => self.window.len(),
            _ => 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Read `buf` from `offset` bytes into the open part.
    pub(crate) fn read_entry_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_entry_open()?;
        let window = self.window;
        self.data_mut()?.read_in(window, offset, buf)
    }

    /// Read the whole open part into memory.
    pub fn read_entry(&mut self) -> CodecResult<Vec<u8>> {
        self.ensure_entry_open()?;
        let window = self.window;
        Ok(self.data_mut()?.read_range(window)?)
    }

    /// Release the underlying handles; later calls fail with `StreamClosed`.
    pub fn close(&mut self) {
        self.data = None;
        self.boundaries = OffsetIndex::empty();
        self.state = StreamState::Closed;
    }

    fn ensure_entry_open(&self) -> CodecResult<()> {
        self.state.ensure_not_closed()?;
        match self.state.open_index() {
            Some(_) => Ok(()),
            None => Err(CodecError::NoEntryOpen),
        }
    }

    fn data_mut(&mut self) -> CodecResult<&mut PositionedReader> {
        self.data.as_mut().ok_or(CodecError::StreamClosed)
    }
}

impl Read for NestedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_entry_at(self.cursor, buf)?;
        self.cursor += n as u64;
        Ok(n)
    }
}

impl Seek for NestedReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.ensure_entry_open()?;
        self.cursor = resolve_seek(self.window.len(), self.cursor, pos)?;
        Ok(self.cursor)
    }
}
