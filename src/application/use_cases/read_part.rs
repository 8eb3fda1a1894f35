use tracing::debug;

use crate::application::data_store::DataStore;
use crate::application::dto::ReadPartRequest;
use crate::application::errors::UseCaseError;

/// Use case: fetch the bytes of one part, or one segment of it
pub struct ReadPartUseCase {
    store: DataStore,
}

impl ReadPartUseCase {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub fn execute(&self, request: &ReadPartRequest) -> Result<Vec<u8>, UseCaseError> {
        let mut session = self.store.open_reader_session(&request.unit);
        let bytes = {
            let mut part = session.part(request.part)?;
            let mut source = part.channel(&request.channel)?;
            match request.segment {
                Some(segment) => source.get(segment)?.read_to_vec()?,
                None => source.read_to_vec()?,
            }
        };
        session.close()?;

        debug!(
            unit = %request.unit.id(),
            channel = %request.channel,
            part = request.part,
            bytes = bytes.len(),
            "Read part"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::IngestRequest;
    use crate::application::use_cases::IngestUnitUseCase;
    use crate::domain::entities::DataUnit;
    use crate::domain::errors::CodecError;
    use crate::domain::value_objects::ChannelName;
    use crate::infrastructure::storage::MemoryStore;
    use std::rc::Rc;

    fn store_with_unit(unit: &DataUnit) -> DataStore {
        let store = DataStore::new(Rc::new(MemoryStore::new()), 256);
        let mut request = IngestRequest::new(unit.clone());
        request.parts = vec![b"hello\n".to_vec(), b"world\nwide".to_vec()];
        request.context.insert(1, b"ctx".to_vec());
        IngestUnitUseCase::new(store.clone()).execute(request).unwrap();
        store
    }

    fn request(unit: &DataUnit, channel: ChannelName, part: u64, segment: Option<u64>) -> ReadPartRequest {
        ReadPartRequest {
            unit: unit.clone(),
            channel,
            part,
            segment,
        }
    }

    #[test]
    fn test_read_part_and_segment() {
        let unit = DataUnit::new(20u64, "text");
        let use_case = ReadPartUseCase::new(store_with_unit(&unit));

        let part = use_case
            .execute(&request(&unit, ChannelName::data(), 1, None))
            .unwrap();
        assert_eq!(part, b"world\nwide");

        let segment = use_case
            .execute(&request(&unit, ChannelName::data(), 1, Some(1)))
            .unwrap();
        assert_eq!(segment, b"wide");

        let context = use_case
            .execute(&request(&unit, ChannelName::context(), 1, None))
            .unwrap();
        assert_eq!(context, b"ctx");
    }

    #[test]
    fn test_read_missing_part() {
        let unit = DataUnit::new(21u64, "text");
        let use_case = ReadPartUseCase::new(store_with_unit(&unit));
        let result = use_case.execute(&request(&unit, ChannelName::data(), 2, None));
        assert!(matches!(
            result,
            Err(UseCaseError::Codec(CodecError::ChannelUnderrun { index: 2, .. }))
        ));
    }
}
