//! Keeps every channel of a data unit on the same part numbering.
//!
//! A channel that is first touched at part `n` must still report part `n`
//! as its `n`-th entry, so on write the gap is filled with empty parts. On
//! read there is nothing to synthesise: a channel that stopped early is an
//! underrun.

use tracing::debug;

use crate::codec::segment::{SegmentReader, SegmentWriter};
use crate::domain::errors::{CodecError, CodecResult};
use crate::domain::value_objects::ChannelName;

/// Bring `writer` to part `index`: pad with empty parts, then open the
/// part. Returns the number of placeholder parts written.
pub fn fast_forward_writer(writer: &mut SegmentWriter, index: u64) -> CodecResult<u64> {
    if writer.is_entry_open() {
        // The open part's index equals the count of closed parts
        if writer.entry_count() == index {
            return Ok(0);
        }
        writer.close_entry()?;
    }

    let count = writer.entry_count();
    if count > index {
        return Err(CodecError::OutOfOrderAccess {
            index,
            last: count - 1,
        });
    }

    let mut padded = 0;
    while writer.entry_count() < index {
        writer.put_next_entry()?;
        writer.close_entry()?;
        padded += 1;
    }
    writer.put_next_entry()?;

    if padded > 0 {
        debug!(padded, index, "Fast-forwarded channel with empty parts");
    }
    Ok(padded)
}

/// Position `reader` on part `index`, failing when the channel holds
/// fewer parts.
pub fn fast_forward_reader(
    reader: &mut SegmentReader,
    channel: &ChannelName,
    index: u64,
) -> CodecResult<()> {
    if reader.current_index() == Some(index) {
        return Ok(());
    }

    let available = reader.entry_count();
    if index >= available {
        return Err(CodecError::ChannelUnderrun {
            channel: channel.to_string(),
            index,
            available,
        });
    }

    reader.get_entry(index)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::channel::{open_segment_reader, open_segment_writer};
    use crate::domain::value_objects::DataUnitId;
    use crate::infrastructure::storage::MemoryStore;
    use std::io::Write;

    #[test]
    fn test_writer_pads_to_index() {
        let store = MemoryStore::new();
        let unit = DataUnitId::new(3);
        let channel = ChannelName::context();
        let mut writer = open_segment_writer(&store, unit, &channel, 64).unwrap();

        assert_eq!(fast_forward_writer(&mut writer, 3).unwrap(), 3);
        writer.write_all(b"ctx").unwrap();
        writer.close().unwrap();

        let mut reader = open_segment_reader(&store, unit, &channel).unwrap();
        assert_eq!(reader.entry_count(), 4);
        for i in 0..3 {
            fast_forward_reader(&mut reader, &channel, i).unwrap();
            assert!(reader.part_view().unwrap().is_empty());
        }
        fast_forward_reader(&mut reader, &channel, 3).unwrap();
        assert_eq!(reader.part_view().unwrap().read_to_vec().unwrap(), b"ctx");
    }

    #[test]
    fn test_writer_already_on_index_is_noop() {
        let store = MemoryStore::new();
        let mut writer =
            open_segment_writer(&store, DataUnitId::new(3), &ChannelName::data(), 64).unwrap();
        fast_forward_writer(&mut writer, 0).unwrap();
        writer.write_all(b"x").unwrap();
        assert_eq!(fast_forward_writer(&mut writer, 0).unwrap(), 0);
        assert_eq!(writer.position(), 1);
    }

    #[test]
    fn test_writer_behind_cursor_is_out_of_order() {
        let store = MemoryStore::new();
        let mut writer =
            open_segment_writer(&store, DataUnitId::new(3), &ChannelName::data(), 64).unwrap();
        fast_forward_writer(&mut writer, 2).unwrap();
        assert!(matches!(
            fast_forward_writer(&mut writer, 1),
            Err(CodecError::OutOfOrderAccess { index: 1, last: 2 })
        ));
    }

    #[test]
    fn test_reader_underrun() {
        let store = MemoryStore::new();
        let unit = DataUnitId::new(3);
        let channel = ChannelName::context();
        let mut writer = open_segment_writer(&store, unit, &channel, 64).unwrap();
        fast_forward_writer(&mut writer, 1).unwrap();
        writer.close().unwrap();

        let mut reader = open_segment_reader(&store, unit, &channel).unwrap();
        let err = fast_forward_reader(&mut reader, &channel, 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ChannelUnderrun { index: 2, available: 2, .. }
        ));
    }
}
