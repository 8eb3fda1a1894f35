//! Property-based tests using proptest
//!
//! Random part and segment layouts must read back byte-identical.


use proptest::prelude::*;
use std::io::Write;

use segmented_store::codec::OffsetList;
use segmented_store::value_objects::{ChannelName, DataUnitId};
use test_fixtures::{document, memory_store, write_segmented};

/// Strategy for parts made of segments of arbitrary bytes
fn parts_strategy() -> impl Strategy<Value = Vec<Vec<Vec<u8>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 0..6),
        0..8,
    )
}

proptest! {
    /// Every part reads back as the concatenation of its segments
    #[test]
    fn parts_round_trip(parts in parts_strategy()) {
        let (_memory, store) = memory_store();
        let unit = document(1);
        write_segmented(&store, &unit, &parts);

        let mut session = store.open_reader_session(&unit);
        prop_assert_eq!(session.count().unwrap(), parts.len() as u64);
        for (index, segments) in parts.iter().enumerate() {
            let mut part = session.part(index as u64).unwrap();
            let mut data = part.get().unwrap();
            let expected: Vec<u8> = segments.concat();
            prop_assert_eq!(data.read_to_vec().unwrap(), expected);
        }
    }

    /// Segment ranges of a part are contiguous and match what was written
    #[test]
    fn segments_round_trip(parts in parts_strategy()) {
        let (_memory, store) = memory_store();
        let unit = document(2);
        write_segmented(&store, &unit, &parts);

        let mut session = store.open_reader_session(&unit);
        for (index, segments) in parts.iter().enumerate() {
            let mut part = session.part(index as u64).unwrap();
            let mut data = part.get().unwrap();
            prop_assert_eq!(data.segment_count(), segments.len() as u64);
            for (j, segment) in segments.iter().enumerate() {
                prop_assert_eq!(&data.get(j as u64).unwrap().read_to_vec().unwrap(), segment);
            }
        }
    }

    /// A side channel written at a subset of indices has placeholder parts
    /// up to its last written index
    #[test]
    fn side_channel_placeholders(
        written in prop::collection::btree_set(0u64..12, 1..6),
        payload in prop::collection::vec(any::<u8>(), 1..32),
    ) {
        let (_memory, store) = memory_store();
        let unit = document(3);
        let context = ChannelName::context();
        let last = *written.iter().next_back().unwrap();

        let mut session = store.open_writer_session(&unit);
        for i in 0..=last {
            let mut part = session.part(i).unwrap();
            part.get().unwrap().write_all(b"p").unwrap();
            if written.contains(&i) {
                part.channel(&context).unwrap().write_all(&payload).unwrap();
            }
        }
        session.close().unwrap();

        let mut session = store.open_reader_session(&unit);
        prop_assert_eq!(session.channel_count(&context).unwrap(), last + 1);
        for i in 0..=last {
            let mut part = session.part(i).unwrap();
            let bytes = part.channel(&context).unwrap().read_to_vec().unwrap();
            if written.contains(&i) {
                prop_assert_eq!(bytes, payload.clone());
            } else {
                prop_assert!(bytes.is_empty());
            }
        }
    }

    /// Decoding accepts exactly the multiples of eight bytes
    #[test]
    fn offset_list_width(bytes in prop::collection::vec(any::<u8>(), 0..80)) {
        let decoded = OffsetList::decode(&bytes);
        prop_assert_eq!(decoded.is_ok(), bytes.len() % 8 == 0);
    }

    /// Lower-case names made of allowed characters are accepted
    #[test]
    fn channel_name_accepts_allowed(name in "[a-z0-9][a-z0-9_-]{3,40}") {
        prop_assert!(ChannelName::new(name).is_ok());
    }

    /// Two accepted names never share a file extension
    #[test]
    fn channel_extensions_are_distinct(
        a in "[A-Za-z0-9 _-]{1,6}|Context|Manifest|data",
        b in "[A-Za-z0-9 _-]{1,6}|Context|Manifest|data",
    ) {
        if let (Ok(a), Ok(b)) = (ChannelName::new(a), ChannelName::new(b)) {
            prop_assert_eq!(a == b, a.extension() == b.extension());
        }
    }

    /// Path separators are never part of a channel name
    #[test]
    fn channel_name_rejects_separators(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        let name = format!("{}/{}", prefix, suffix);
        prop_assert!(ChannelName::new(name).is_err());
    }

    /// Buckets group a thousand ids each
    #[test]
    fn bucket_groups_by_thousand(id in 0u64..1_000_000_000_000) {
        let unit = DataUnitId::new(id);
        prop_assert_eq!(unit.bucket().parse::<u64>().unwrap(), id / 1000);
        prop_assert_eq!(unit.file_stem().parse::<u64>().unwrap(), id);
    }
}
