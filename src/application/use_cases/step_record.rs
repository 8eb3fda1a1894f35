use tracing::debug;

use crate::application::data_store::DataStore;
use crate::application::dto::{ReadRecordRequest, RecordPage};
use crate::application::errors::UseCaseError;
use crate::codec::SegmentSelection;

/// Use case: serve one record of a segmented part.
///
/// Parts with more than two segments are treated as header, records,
/// footer; the page is the header, the requested record and the footer.
/// Shorter parts are plain records.
pub struct StepRecordUseCase {
    store: DataStore,
}

impl StepRecordUseCase {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub fn execute(&self, request: &ReadRecordRequest) -> Result<RecordPage, UseCaseError> {
        let mut session = self.store.open_reader_session(&request.unit);
        let page = {
            let mut part = session.part(request.part)?;
            let mut source = part.channel(&request.channel)?;
            let count = source.segment_count();
            let framed = count > 2;
            let record_total = if framed { count - 2 } else { count };

            if record_total == 0 {
                RecordPage {
                    record: 0,
                    record_total,
                    bytes: Vec::new(),
                }
            } else {
                let record = request.record.min(record_total - 1);
                let mut selection = SegmentSelection::none();
                if framed {
                    selection.include(0).include(record + 1).include(count - 1);
                } else {
                    selection.include(record);
                }
                RecordPage {
                    record,
                    record_total,
                    bytes: source.select(&selection)?.read_to_vec()?,
                }
            }
        };
        session.close()?;

        debug!(
            unit = %request.unit.id(),
            part = request.part,
            record = page.record,
            records = page.record_total,
            "Stepped to record"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::IngestRequest;
    use crate::application::use_cases::IngestUnitUseCase;
    use crate::domain::entities::DataUnit;
    use crate::domain::value_objects::ChannelName;
    use crate::infrastructure::storage::MemoryStore;
    use std::rc::Rc;

    fn store_with_parts(unit: &DataUnit, parts: &[&[u8]]) -> DataStore {
        let store = DataStore::new(Rc::new(MemoryStore::new()), 256);
        let mut request = IngestRequest::new(unit.clone());
        request.parts = parts.iter().map(|part| part.to_vec()).collect();
        IngestUnitUseCase::new(store.clone()).execute(request).unwrap();
        store
    }

    fn request(unit: &DataUnit, part: u64, record: u64) -> ReadRecordRequest {
        ReadRecordRequest {
            unit: unit.clone(),
            channel: ChannelName::data(),
            part,
            record,
        }
    }

    #[test]
    fn test_record_framed_by_header_and_footer() {
        let unit = DataUnit::new(30u64, "events");
        let store = store_with_parts(&unit, &[b"<events>\n<e>a</e>\n<e>b</e>\n<e>c</e>\n</events>\n"]);
        let use_case = StepRecordUseCase::new(store);

        let page = use_case.execute(&request(&unit, 0, 1)).unwrap();
        assert_eq!(page.record_total, 3);
        assert_eq!(page.record, 1);
        assert_eq!(page.bytes, b"<events>\n<e>b</e>\n</events>\n");
    }

    #[test]
    fn test_record_clamped_to_last() {
        let unit = DataUnit::new(31u64, "events");
        let store = store_with_parts(&unit, &[b"<events>\n<e>a</e>\n<e>b</e>\n</events>\n"]);
        let use_case = StepRecordUseCase::new(store);

        let page = use_case.execute(&request(&unit, 0, 40)).unwrap();
        assert_eq!(page.record, 1);
        assert_eq!(page.bytes, b"<events>\n<e>b</e>\n</events>\n");
    }

    #[test]
    fn test_unframed_and_empty_parts() {
        let unit = DataUnit::new(32u64, "lines");
        let store = store_with_parts(&unit, &[b"first\nsecond\n", b""]);
        let use_case = StepRecordUseCase::new(store);

        let page = use_case.execute(&request(&unit, 0, 1)).unwrap();
        assert_eq!(page.record_total, 2);
        assert_eq!(page.bytes, b"second\n");

        let page = use_case.execute(&request(&unit, 1, 0)).unwrap();
        assert_eq!(page.record_total, 0);
        assert!(page.bytes.is_empty());
    }
}
