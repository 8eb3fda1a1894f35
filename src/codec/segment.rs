//! Segments within the current part of a nested stream.
//!
//! Each part's segment boundaries are relative to the part start and are
//! stored as one part of a second nested stream (the channel's segment
//! index), so looking up the segments of part `i` never touches other parts.

use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::debug;

use crate::codec::io::{resolve_seek, ByteRange};
use crate::codec::nested::{NestedReader, NestedWriter};
use crate::codec::offset_index::{encode_offset, OffsetList, OffsetLookup};
use crate::codec::selection::{
    segment_at_offset, segments_overlapping, SegmentBound, SegmentSelection, SelectedSegments,
};
use crate::domain::errors::{CodecError, CodecResult};
use crate::domain::value_objects::StreamState;

pub struct SegmentWriter {
    data: NestedWriter,
    segments: NestedWriter,
    segment_count: u64,
    last_boundary: u64,
}

impl SegmentWriter {
    pub fn new(data: NestedWriter, segments: NestedWriter) -> Self {
        Self {
            data,
            segments,
            segment_count: 0,
            last_boundary: 0,
        }
    }

    pub fn put_next_entry(&mut self) -> CodecResult<u64> {
        let index = self.data.put_next_entry()?;
        let segment_part = self.segments.put_next_entry()?;
        if segment_part != index {
            return Err(CodecError::CorruptIndex(format!(
                "segment index is at part {} while data is at part {}",
                segment_part, index
            )));
        }
        self.segment_count = 0;
        self.last_boundary = 0;
        Ok(index)
    }

    /// Mark the end of the current segment; writing continues in the
    /// next one.
    pub fn add_segment(&mut self) -> CodecResult<()> {
        self.ensure_entry_open()?;
        let boundary = self.data.position();
        self.segments.write_all(&encode_offset(boundary))?;
        self.segment_count += 1;
        self.last_boundary = boundary;
        Ok(())
    }

    /// Record empty segments until `count` segments exist in this part.
    /// Pending bytes close the first of them.
    pub fn advance_to_segment(&mut self, count: u64) -> CodecResult<()> {
        while self.segment_count < count {
            self.add_segment()?;
        }
        Ok(())
    }

    /// Segments recorded in the open part.
    pub fn segment_count(&self) -> u64 {
        self.segment_count
    }

    /// Close the part; trailing bytes after the last boundary become the
    /// final segment.
    pub fn close_entry(&mut self) -> CodecResult<()> {
        self.ensure_entry_open()?;
        if self.data.position() > self.last_boundary {
            self.add_segment()?;
        }
        debug!(segments = self.segment_count, "Closing segmented part");
        self.data.close_entry()?;
        self.segments.close_entry()?;
        Ok(())
    }

    pub fn entry_count(&self) -> u64 {
        self.data.entry_count()
    }

    pub fn is_entry_open(&self) -> bool {
        self.data.is_entry_open()
    }

    /// Bytes written into the open part.
    pub fn position(&self) -> u64 {
        self.data.position()
    }

    pub fn state(&self) -> StreamState {
        self.data.state()
    }

    /// Close both nested streams, attempting each even after a failure.
    pub fn close(&mut self) -> CodecResult<()> {
        let mut first_error: Option<CodecError> = None;
        if self.is_entry_open() {
            if let Err(e) = self.close_entry() {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.data.close() {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.segments.close() {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_entry_open(&self) -> CodecResult<()> {
        match self.data.state() {
            StreamState::PartOpen { .. } => Ok(()),
            StreamState::Closed => Err(CodecError::StreamClosed),
            _ => Err(CodecError::NoEntryOpen),
        }
    }
}

impl Write for SegmentWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.data.flush()
    }
}

pub struct SegmentReader {
    data: NestedReader,
    segments: NestedReader,
    offsets: OffsetList,
    last_served: Option<u64>,
}

impl SegmentReader {
    pub fn new(data: NestedReader, segments: NestedReader) -> Self {
        Self {
            data,
            segments,
            offsets: OffsetList::default(),
            last_served: None,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.data.entry_count()
    }

    /// Open part `index` and load its segment boundaries.
    pub fn get_entry(&mut self, index: u64) -> CodecResult<ByteRange> {
        let range = self.data.get_entry(index)?;
        self.offsets = self.load_offsets(index, range.len())?;
        self.last_served = None;
        Ok(range)
    }

    pub fn get_next_entry(&mut self, skip_count: u64) -> CodecResult<ByteRange> {
        let next = match self.data.state().last_index() {
            Some(last) => last + 1 + skip_count,
            None => skip_count,
        };
        self.get_entry(next)
    }

    pub fn current_index(&self) -> Option<u64> {
        self.data.current_index()
    }

    /// Segments in the open part, 0 when none is open.
    pub fn segment_count(&self) -> u64 {
        if self.data.current_index().is_none() {
            return 0;
        }
        self.offsets.count()
    }

    /// Part-relative boundaries of the open part.
    pub fn segment_boundaries(&self) -> &[u64] {
        self.offsets.as_slice()
    }

    /// Bounded view over segment `index` of the open part. Segments are
    /// served once each, in increasing order.
    pub fn get(&mut self, index: u64) -> CodecResult<SegmentView<'_>> {
        self.ensure_entry_open()?;
        if let Some(last) = self.last_served {
            if index <= last {
                return Err(CodecError::EntryAlreadyProvided { index, last });
            }
        }

        let count = self.offsets.count();
        if index >= count {
            return Err(CodecError::IndexOutOfRange { index, count });
        }

        let range = self.offsets.range(index)?;
        self.last_served = Some(index);
        Ok(SegmentView::new(&mut self.data, range))
    }

    /// The whole open part, independent of segment order.
    pub fn part_view(&mut self) -> CodecResult<SegmentView<'_>> {
        self.ensure_entry_open()?;
        let range = ByteRange::new(0, self.data.entry_len());
        Ok(SegmentView::new(&mut self.data, range))
    }

    /// The selected segments of the open part, read back to back.
    /// Independent of the order `get` serves segments in.
    pub fn select(&mut self, selection: &SegmentSelection) -> CodecResult<SelectedSegments<'_>> {
        self.ensure_entry_open()?;
        selection.validate(self.offsets.count())?;
        let ranges = selection.ranges(self.offsets.as_slice());
        Ok(SelectedSegments::new(&mut self.data, ranges))
    }

    /// Segment of the open part holding the part-relative `offset`; the
    /// segment count when `offset` is the part end.
    pub fn segment_at_offset(&self, offset: u64, bound: SegmentBound) -> CodecResult<u64> {
        self.ensure_within_part(offset)?;
        Ok(segment_at_offset(self.offsets.as_slice(), offset, bound))
    }

    /// Segments of the open part overlapping the part-relative `range`.
    pub fn segments_overlapping(&self, range: ByteRange) -> CodecResult<std::ops::Range<u64>> {
        self.ensure_within_part(range.end)?;
        Ok(segments_overlapping(self.offsets.as_slice(), range))
    }

    pub fn close_entry(&mut self) {
        self.data.close_entry();
        self.offsets = OffsetList::default();
        self.last_served = None;
    }

    pub fn close(&mut self) {
        self.close_entry();
        self.data.close();
        self.segments.close();
    }

    fn ensure_entry_open(&self) -> CodecResult<()> {
        match self.data.state() {
            StreamState::PartOpen { .. } => Ok(()),
            StreamState::Closed => Err(CodecError::StreamClosed),
            _ => Err(CodecError::NoEntryOpen),
        }
    }

    fn ensure_within_part(&self, offset: u64) -> CodecResult<()> {
        self.ensure_entry_open()?;
        let len = self.data.entry_len();
        if offset > len {
            return Err(CodecError::IndexOutOfRange {
                index: offset,
                count: len,
            });
        }
        Ok(())
    }

    fn load_offsets(&mut self, index: u64, part_len: u64) -> CodecResult<OffsetList> {
        let recorded = if index < self.segments.entry_count() {
            self.segments.get_entry(index)?;
            let bytes = self.segments.read_entry();
            self.segments.close_entry();
            OffsetList::decode(&bytes?)?
        } else {
            OffsetList::default()
        };

        let mut offsets = recorded.as_slice().to_vec();
        if offsets.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(CodecError::CorruptIndex(format!(
                "segment boundaries of part {} decrease",
                index
            )));
        }
        match offsets.last().copied() {
            Some(last) if last > part_len => {
                return Err(CodecError::CorruptIndex(format!(
                    "segment boundary {} beyond part {} length {}",
                    last, index, part_len
                )));
            }
            // Bytes after the last boundary form an implicit final segment
            Some(last) if last < part_len => offsets.push(part_len),
            None if part_len > 0 => offsets.push(part_len),
            _ => {}
        }
        Ok(OffsetList::from(offsets))
    }
}

/// Read-only window over a byte range of the open part.
pub struct SegmentView<'a> {
    reader: &'a mut NestedReader,
    range: ByteRange,
    cursor: u64,
}

impl<'a> SegmentView<'a> {
    fn new(reader: &'a mut NestedReader, range: ByteRange) -> Self {
        Self {
            reader,
            range,
            cursor: 0,
        }
    }

    /// Range relative to the start of the part.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn len(&self) -> u64 {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.len() as usize);
        self.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for SegmentView<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.range.len().saturating_sub(self.cursor);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = remaining.min(buf.len() as u64) as usize;
        let n = self
            .reader
            .read_entry_at(self.range.start + self.cursor, &mut buf[..want])?;
        self.cursor += n as u64;
        Ok(n)
    }
}

impl Seek for SegmentView<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor = resolve_seek(self.range.len(), self.cursor, pos)?;
        Ok(self.cursor)
    }
}
