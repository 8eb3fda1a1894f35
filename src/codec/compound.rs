//! Sequential reader over the parts of one channel.

use crate::application::ports::ByteStreamFactory;
use crate::codec::channel::open_segment_reader;
use crate::codec::nested::NestedReader;
use crate::codec::segment::{SegmentReader, SegmentView};
use crate::domain::errors::CodecResult;
use crate::domain::value_objects::{ChannelName, DataUnitId};

/// Walks the parts of a channel in order, handing out one bounded view per
/// part. The previous part is released before the next is opened.
pub struct CompoundReader {
    segments: SegmentReader,
}

impl CompoundReader {
    pub fn new(data: NestedReader, segments: NestedReader) -> Self {
        Self {
            segments: SegmentReader::new(data, segments),
        }
    }

    pub fn open(
        factory: &dyn ByteStreamFactory,
        unit: DataUnitId,
        channel: &ChannelName,
    ) -> CodecResult<Self> {
        Ok(Self {
            segments: open_segment_reader(factory, unit, channel)?,
        })
    }

    pub fn get_entry_count(&self) -> u64 {
        self.segments.entry_count()
    }

    /// Skip `skip_count` parts and return a view over the one after them.
    pub fn get_next_input_stream(&mut self, skip_count: u64) -> CodecResult<SegmentView<'_>> {
        self.segments.close_entry();
        self.segments.get_next_entry(skip_count)?;
        self.segments.part_view()
    }

    pub fn current_index(&self) -> Option<u64> {
        self.segments.current_index()
    }

    /// Segment access for the current part.
    pub fn segments(&mut self) -> &mut SegmentReader {
        &mut self.segments
    }

    pub fn close(&mut self) {
        self.segments.close();
    }
}
