//! Side-car index of cumulative end offsets.
//!
//! Format: headerless sequence of big-endian `u64` records. Record `i` is
//! the exclusive end of entry `i` in the associated primary stream, so
//! entry `i` spans `[record[i-1] or 0, record[i])`. Empty entries repeat
//! the previous offset.

use std::io::Write;
use tracing::debug;

use crate::application::ports::{ByteReader, ByteWriter};
use crate::codec::io::{ByteRange, CountingSink, PositionedReader, DEFAULT_BUFFER_CAPACITY};
use crate::domain::errors::{CodecError, CodecResult};

/// Width of one index record in bytes
pub const OFFSET_WIDTH: u64 = 8;

#[inline]
pub fn encode_offset(offset: u64) -> [u8; OFFSET_WIDTH as usize] {
    offset.to_be_bytes()
}

/// Lookup shared by file-backed and in-memory indexes.
pub trait OffsetLookup {
    fn count(&self) -> u64;

    fn get(&mut self, index: u64) -> CodecResult<u64>;

    /// Byte range of entry `index`.
    fn range(&mut self, index: u64) -> CodecResult<ByteRange> {
        let low = if index == 0 { 0 } else { self.get(index - 1)? };
        let high = self.get(index)?;
        if high < low {
            return Err(CodecError::CorruptIndex(format!(
                "offset {} of entry {} precedes previous offset {}",
                high, index, low
            )));
        }
        Ok(ByteRange::new(low, high))
    }
}

/// Append-only writer for an offset index file.
pub struct OffsetIndexWriter {
    sink: CountingSink,
    count: u64,
    last: u64,
}

impl OffsetIndexWriter {
    pub fn new(sink: ByteWriter) -> Self {
        Self {
            sink: CountingSink::new(sink, DEFAULT_BUFFER_CAPACITY),
            count: 0,
            last: 0,
        }
    }

    /// Append one record. Offsets never decrease.
    pub fn append(&mut self, offset: u64) -> CodecResult<()> {
        if self.sink.is_finished() {
            return Err(CodecError::StreamClosed);
        }
        if offset < self.last {
            return Err(CodecError::CorruptIndex(format!(
                "offset {} appended after {}",
                offset, self.last
            )));
        }
        self.sink.write_all(&encode_offset(offset))?;
        self.count += 1;
        self.last = offset;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Most recent offset, 0 when empty.
    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn close(&mut self) -> CodecResult<()> {
        if !self.sink.is_finished() {
            debug!(records = self.count, "Closing offset index");
        }
        self.sink.finish()?;
        Ok(())
    }
}

/// Random-access reader over an offset index file. An absent file reads
/// as an empty index.
pub struct OffsetIndex {
    reader: Option<PositionedReader>,
    count: u64,
}

impl OffsetIndex {
    pub fn open(reader: Option<ByteReader>) -> CodecResult<Self> {
        let reader = match reader {
            Some(reader) => PositionedReader::new(reader)?,
            None => return Ok(Self::empty()),
        };

        let len = reader.len();
        if len % OFFSET_WIDTH != 0 {
            return Err(CodecError::CorruptIndex(format!(
                "index length {} is not a multiple of {}",
                len, OFFSET_WIDTH
            )));
        }

        Ok(Self {
            count: len / OFFSET_WIDTH,
            reader: Some(reader),
        })
    }

    pub fn empty() -> Self {
        Self {
            reader: None,
            count: 0,
        }
    }
}

impl OffsetLookup for OffsetIndex {
    fn count(&self) -> u64 {
        self.count
    }

    fn get(&mut self, index: u64) -> CodecResult<u64> {
        let reader = match self.reader.as_mut() {
            Some(reader) if index < self.count => reader,
            _ => {
                return Err(CodecError::CorruptIndex(format!(
                    "record {} requested from index of {}",
                    index, self.count
                )))
            }
        };

        let mut record = [0u8; OFFSET_WIDTH as usize];
        reader.read_exact_at(index * OFFSET_WIDTH, &mut record)?;
        Ok(u64::from_be_bytes(record))
    }
}

/// Offsets decoded into memory, used for the per-part segment indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetList(Vec<u64>);

impl OffsetList {
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() as u64 % OFFSET_WIDTH != 0 {
            return Err(CodecError::CorruptIndex(format!(
                "index window of {} bytes is not a multiple of {}",
                bytes.len(),
                OFFSET_WIDTH
            )));
        }

        let offsets = bytes
            .chunks_exact(OFFSET_WIDTH as usize)
            .map(|chunk| {
                let mut record = [0u8; OFFSET_WIDTH as usize];
                record.copy_from_slice(chunk);
                u64::from_be_bytes(record)
            })
            .collect();
        Ok(Self(offsets))
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn last(&self) -> Option<u64> {
        self.0.last().copied()
    }
}

impl From<Vec<u64>> for OffsetList {
    fn from(offsets: Vec<u64>) -> Self {
        Self(offsets)
    }
}

impl OffsetLookup for OffsetList {
    fn count(&self) -> u64 {
        self.0.len() as u64
    }

    fn get(&mut self, index: u64) -> CodecResult<u64> {
        self.0.get(index as usize).copied().ok_or_else(|| {
            CodecError::CorruptIndex(format!(
                "record {} requested from index of {}",
                index,
                self.0.len()
            ))
        })
    }
}
