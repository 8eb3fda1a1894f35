//! Construction of a channel's stream stack from the byte stream factory.

use tracing::debug;

use crate::application::ports::ByteStreamFactory;
use crate::codec::nested::{NestedReader, NestedWriter};
use crate::codec::segment::{SegmentReader, SegmentWriter};
use crate::domain::errors::CodecResult;
use crate::domain::value_objects::{ChannelName, DataUnitId, StreamRole};

pub(crate) fn open_nested_writer(
    factory: &dyn ByteStreamFactory,
    unit: DataUnitId,
    channel: &ChannelName,
    data: StreamRole,
    boundaries: StreamRole,
    capacity: usize,
) -> CodecResult<NestedWriter> {
    let data = factory.create(unit, channel, data)?;
    let boundaries = factory.create(unit, channel, boundaries)?;
    Ok(NestedWriter::with_capacity(data, boundaries, capacity))
}

pub(crate) fn open_nested_reader(
    factory: &dyn ByteStreamFactory,
    unit: DataUnitId,
    channel: &ChannelName,
    data: StreamRole,
    boundaries: StreamRole,
) -> CodecResult<NestedReader> {
    let data = factory.open(unit, channel, data)?;
    let boundaries = factory.open(unit, channel, boundaries)?;
    NestedReader::new(data, boundaries)
}

/// Data plus segment index writers for one channel.
pub(crate) fn open_segment_writer(
    factory: &dyn ByteStreamFactory,
    unit: DataUnitId,
    channel: &ChannelName,
    capacity: usize,
) -> CodecResult<SegmentWriter> {
    debug!(unit = %unit, channel = %channel, "Creating channel streams");
    let data = open_nested_writer(
        factory,
        unit,
        channel,
        StreamRole::Data,
        StreamRole::BoundaryIndex,
        capacity,
    )?;
    let segments = open_nested_writer(
        factory,
        unit,
        channel,
        StreamRole::SegmentIndex,
        StreamRole::SegmentBoundaryIndex,
        capacity,
    )?;
    Ok(SegmentWriter::new(data, segments))
}

pub(crate) fn open_segment_reader(
    factory: &dyn ByteStreamFactory,
    unit: DataUnitId,
    channel: &ChannelName,
) -> CodecResult<SegmentReader> {
    debug!(unit = %unit, channel = %channel, "Opening channel streams");
    let data = open_nested_reader(
        factory,
        unit,
        channel,
        StreamRole::Data,
        StreamRole::BoundaryIndex,
    )?;
    let segments = open_nested_reader(
        factory,
        unit,
        channel,
        StreamRole::SegmentIndex,
        StreamRole::SegmentBoundaryIndex,
    )?;
    Ok(SegmentReader::new(data, segments))
}
