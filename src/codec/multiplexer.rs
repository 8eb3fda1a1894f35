//! Named channels of one data unit, aligned on a shared part index.
//!
//! A multiplexer owns one segment stack per channel, created on first use
//! and cached by name until the multiplexer closes. Each call to `part`
//! moves every channel to a new part index; channels that were not touched
//! for a while are fast-forwarded when next requested.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::application::ports::ByteStreamFactory;
use crate::codec::channel::{
    open_nested_reader, open_nested_writer, open_segment_reader, open_segment_writer,
};
use crate::codec::fast_forward::{fast_forward_reader, fast_forward_writer};
use crate::codec::io::DEFAULT_BUFFER_CAPACITY;
use crate::codec::segment::{SegmentReader, SegmentView, SegmentWriter};
use crate::codec::selection::{SegmentBound, SegmentSelection, SelectedSegments};
use crate::domain::entities::{AttributeMap, DataUnit};
use crate::domain::errors::{CodecError, CodecResult};
use crate::domain::value_objects::{ChannelName, StreamRole};

fn ensure_increasing(index: u64, last: Option<u64>) -> CodecResult<()> {
    match last {
        Some(last) if index <= last => Err(CodecError::OutOfOrderAccess { index, last }),
        _ => Ok(()),
    }
}

fn ensure_requestable(name: &ChannelName) -> CodecResult<()> {
    if name.is_reserved() {
        return Err(CodecError::ReservedChannel(name.to_string()));
    }
    Ok(())
}

/// Writer side of a data unit session.
pub struct WriteMultiplexer {
    factory: Rc<dyn ByteStreamFactory>,
    unit: DataUnit,
    channels: BTreeMap<ChannelName, SegmentWriter>,
    primary_index: Option<u64>,
    attributes: AttributeMap,
    buffer_capacity: usize,
    closed: bool,
}

impl WriteMultiplexer {
    pub fn new(factory: Rc<dyn ByteStreamFactory>, unit: DataUnit) -> Self {
        Self::with_capacity(factory, unit, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(
        factory: Rc<dyn ByteStreamFactory>,
        unit: DataUnit,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            factory,
            unit,
            channels: BTreeMap::new(),
            primary_index: None,
            attributes: AttributeMap::new(),
            buffer_capacity,
            closed: false,
        }
    }

    pub fn unit(&self) -> &DataUnit {
        &self.unit
    }

    /// Move to part `index`. Indices must strictly increase; parts still
    /// open from the previous index are closed first.
    pub fn part(&mut self, index: u64) -> CodecResult<PartWriter<'_>> {
        self.ensure_open()?;
        ensure_increasing(index, self.primary_index)?;
        self.close_open_parts()?;
        self.primary_index = Some(index);
        Ok(PartWriter {
            session: self,
            index,
        })
    }

    /// Move to the part after the last one requested.
    pub fn next_part(&mut self) -> CodecResult<PartWriter<'_>> {
        let index = self.primary_index.map_or(0, |last| last + 1);
        self.part(index)
    }

    /// Last part index requested, if any.
    pub fn primary_index(&self) -> Option<u64> {
        self.primary_index
    }

    /// Channels created so far, in name order.
    pub fn channel_names(&self) -> impl Iterator<Item = &ChannelName> {
        self.channels.keys()
    }

    /// Attributes written to the manifest channel at close.
    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close every channel and write the manifest. Each channel is closed
    /// even when an earlier one fails; the first error is returned and the
    /// rest are logged.
    pub fn close(&mut self) -> CodecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error: Option<CodecError> = None;
        for (name, writer) in self.channels.iter_mut() {
            if let Err(e) = writer.close() {
                match first_error {
                    None => first_error = Some(e),
                    Some(_) => warn!(
                        unit = %self.unit.id(),
                        channel = %name,
                        error = %e,
                        "Suppressed error while closing channel"
                    ),
                }
            }
        }

        if !self.attributes.is_empty() {
            if let Err(e) = self.write_manifest() {
                match first_error {
                    None => first_error = Some(e),
                    Some(_) => warn!(
                        unit = %self.unit.id(),
                        error = %e,
                        "Suppressed error while writing manifest"
                    ),
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    unit = %self.unit.id(),
                    channels = self.channels.len(),
                    parts = self.primary_index.map_or(0, |last| last + 1),
                    "Closed writer session"
                );
                Ok(())
            }
        }
    }

    /// Discard the session: close the channels and remove every stream
    /// they wrote, including the manifest.
    pub fn abort(mut self) -> CodecResult<()> {
        self.closed = true;
        for (name, writer) in self.channels.iter_mut() {
            if let Err(e) = writer.close() {
                debug!(channel = %name, error = %e, "Ignoring close error during abort");
            }
        }

        let unit = self.unit.id();
        let mut names: Vec<ChannelName> = self.channels.keys().cloned().collect();
        names.push(ChannelName::manifest());

        let mut first_error: Option<CodecError> = None;
        for name in &names {
            for role in StreamRole::all() {
                if let Err(e) = self.factory.remove(unit, name, *role) {
                    first_error.get_or_insert(e.into());
                }
            }
        }
        info!(unit = %unit, channels = names.len(), "Aborted writer session");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_open(&self) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::StreamClosed);
        }
        Ok(())
    }

    fn close_open_parts(&mut self) -> CodecResult<()> {
        for writer in self.channels.values_mut() {
            if writer.is_entry_open() {
                writer.close_entry()?;
            }
        }
        Ok(())
    }

    fn channel_at(&mut self, name: &ChannelName, index: u64) -> CodecResult<&mut SegmentWriter> {
        self.ensure_open()?;
        ensure_requestable(name)?;

        let writer = match self.channels.entry(name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(open_segment_writer(
                self.factory.as_ref(),
                self.unit.id(),
                name,
                self.buffer_capacity,
            )?),
        };
        fast_forward_writer(writer, index)?;
        Ok(writer)
    }

    fn write_manifest(&self) -> CodecResult<()> {
        let mut manifest = open_nested_writer(
            self.factory.as_ref(),
            self.unit.id(),
            &ChannelName::manifest(),
            StreamRole::Data,
            StreamRole::BoundaryIndex,
            self.buffer_capacity,
        )?;
        manifest.put_next_entry()?;
        manifest.write_all(&self.attributes.to_bytes()?)?;
        manifest.close()
    }
}

impl Drop for WriteMultiplexer {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(unit = %self.unit.id(), "Writer session dropped without close");
        if let Err(e) = self.close() {
            warn!(unit = %self.unit.id(), error = %e, "Best-effort close failed");
        }
    }
}

/// Channels of one part index on the writer side.
pub struct PartWriter<'a> {
    session: &'a mut WriteMultiplexer,
    index: u64,
}

impl PartWriter<'_> {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The primary channel.
    pub fn get(&mut self) -> CodecResult<ChannelSink<'_>> {
        self.channel(&ChannelName::data())
    }

    pub fn channel(&mut self, name: &ChannelName) -> CodecResult<ChannelSink<'_>> {
        let writer = self.session.channel_at(name, self.index)?;
        Ok(ChannelSink { writer })
    }

    /// Close every part opened at this index.
    pub fn close(self) -> CodecResult<()> {
        self.session.close_open_parts()
    }
}

/// One channel's part. `close` ends the part, not the channel.
pub struct ChannelSink<'a> {
    writer: &'a mut SegmentWriter,
}

impl ChannelSink<'_> {
    pub fn add_segment(&mut self) -> CodecResult<()> {
        self.writer.add_segment()
    }

    pub fn advance_to_segment(&mut self, count: u64) -> CodecResult<()> {
        self.writer.advance_to_segment(count)
    }

    pub fn segment_count(&self) -> u64 {
        self.writer.segment_count()
    }

    /// Bytes written into this part.
    pub fn position(&self) -> u64 {
        self.writer.position()
    }

    pub fn close(self) -> CodecResult<()> {
        self.writer.close_entry()
    }
}

impl Write for ChannelSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Reader side of a data unit session.
pub struct ReadMultiplexer {
    factory: Rc<dyn ByteStreamFactory>,
    unit: DataUnit,
    channels: BTreeMap<ChannelName, SegmentReader>,
    primary_index: Option<u64>,
    closed: bool,
}

impl ReadMultiplexer {
    pub fn new(factory: Rc<dyn ByteStreamFactory>, unit: DataUnit) -> Self {
        Self {
            factory,
            unit,
            channels: BTreeMap::new(),
            primary_index: None,
            closed: false,
        }
    }

    pub fn unit(&self) -> &DataUnit {
        &self.unit
    }

    /// Number of parts in the primary channel.
    pub fn count(&mut self) -> CodecResult<u64> {
        Ok(self.reader(&ChannelName::data())?.entry_count())
    }

    /// Number of parts recorded in `name`, 0 for a channel never written.
    pub fn channel_count(&mut self, name: &ChannelName) -> CodecResult<u64> {
        ensure_requestable(name)?;
        Ok(self.reader(name)?.entry_count())
    }

    /// Move to part `index`. Indices must strictly increase.
    pub fn part(&mut self, index: u64) -> CodecResult<PartReader<'_>> {
        self.ensure_open()?;
        ensure_increasing(index, self.primary_index)?;
        for reader in self.channels.values_mut() {
            reader.close_entry();
        }
        self.primary_index = Some(index);
        Ok(PartReader {
            session: self,
            index,
        })
    }

    pub fn next_part(&mut self) -> CodecResult<PartReader<'_>> {
        let index = self.primary_index.map_or(0, |last| last + 1);
        self.part(index)
    }

    /// Attributes stored in the manifest channel; empty when none were
    /// written.
    pub fn attributes(&self) -> CodecResult<AttributeMap> {
        self.ensure_open()?;
        let mut manifest = open_nested_reader(
            self.factory.as_ref(),
            self.unit.id(),
            &ChannelName::manifest(),
            StreamRole::Data,
            StreamRole::BoundaryIndex,
        )?;
        if manifest.entry_count() == 0 {
            return Ok(AttributeMap::new());
        }
        manifest.get_entry(0)?;
        AttributeMap::from_bytes(&manifest.read_entry()?)
    }

    pub fn close(&mut self) -> CodecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for reader in self.channels.values_mut() {
            reader.close();
        }
        info!(
            unit = %self.unit.id(),
            channels = self.channels.len(),
            "Closed reader session"
        );
        Ok(())
    }

    fn ensure_open(&self) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::StreamClosed);
        }
        Ok(())
    }

    fn reader(&mut self, name: &ChannelName) -> CodecResult<&mut SegmentReader> {
        self.ensure_open()?;
        let reader = match self.channels.entry(name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(open_segment_reader(
                self.factory.as_ref(),
                self.unit.id(),
                name,
            )?),
        };
        Ok(reader)
    }

    fn channel_at(&mut self, name: &ChannelName, index: u64) -> CodecResult<&mut SegmentReader> {
        ensure_requestable(name)?;
        let reader = self.reader(name)?;
        fast_forward_reader(reader, name, index)?;
        Ok(reader)
    }
}

/// Channels of one part index on the reader side.
pub struct PartReader<'a> {
    session: &'a mut ReadMultiplexer,
    index: u64,
}

impl PartReader<'_> {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The primary channel.
    pub fn get(&mut self) -> CodecResult<ChannelSource<'_>> {
        self.channel(&ChannelName::data())
    }

    pub fn channel(&mut self, name: &ChannelName) -> CodecResult<ChannelSource<'_>> {
        let reader = self.session.channel_at(name, self.index)?;
        Ok(ChannelSource { reader })
    }
}

/// One channel's part. `close` releases the part window only.
pub struct ChannelSource<'a> {
    reader: &'a mut SegmentReader,
}

impl ChannelSource<'_> {
    pub fn segment_count(&self) -> u64 {
        self.reader.segment_count()
    }

    pub fn segment_boundaries(&self) -> &[u64] {
        self.reader.segment_boundaries()
    }

    pub fn get(&mut self, index: u64) -> CodecResult<SegmentView<'_>> {
        self.reader.get(index)
    }

    pub fn part_view(&mut self) -> CodecResult<SegmentView<'_>> {
        self.reader.part_view()
    }

    pub fn read_to_vec(&mut self) -> CodecResult<Vec<u8>> {
        Ok(self.reader.part_view()?.read_to_vec()?)
    }

    pub fn select(&mut self, selection: &SegmentSelection) -> CodecResult<SelectedSegments<'_>> {
        self.reader.select(selection)
    }

    pub fn segment_at_offset(&self, offset: u64, bound: SegmentBound) -> CodecResult<u64> {
        self.reader.segment_at_offset(offset, bound)
    }

    pub fn close(self) {
        self.reader.close_entry();
    }
}
