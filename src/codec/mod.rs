//! Stream codecs layered over the byte stream port.
//!
//! `offset_index` → `nested` (parts) → `segment` (segments within a part)
//! → `multiplexer` (named channels sharing a part index). `selection`
//! filters the segments of a part for record stepping.

pub(crate) mod channel;
pub mod compound;
pub mod fast_forward;
pub mod io;
pub mod multiplexer;
pub mod nested;
pub mod offset_index;
pub mod segment;
pub mod selection;

pub use compound::CompoundReader;
pub use fast_forward::{fast_forward_reader, fast_forward_writer};
pub use io::ByteRange;
pub use multiplexer::{
    ChannelSink, ChannelSource, PartReader, PartWriter, ReadMultiplexer, WriteMultiplexer,
};
pub use nested::{NestedReader, NestedWriter};
pub use offset_index::{OffsetIndex, OffsetIndexWriter, OffsetList, OffsetLookup};
pub use segment::{SegmentReader, SegmentView, SegmentWriter};
pub use selection::{SegmentBound, SegmentSelection, SelectedSegments};
