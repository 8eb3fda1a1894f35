use crate::application::data_store::DataStore;
use crate::application::dto::{ChannelInfoDto, UnitInfoDto};
use crate::application::errors::UseCaseError;
use crate::domain::entities::DataUnit;
use crate::domain::value_objects::ChannelName;

/// Use case: report the part and segment layout of a data unit
pub struct DescribeUnitUseCase {
    store: DataStore,
}

impl DescribeUnitUseCase {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    /// Describe the primary channel plus `channels`.
    pub fn execute(
        &self,
        unit: &DataUnit,
        channels: &[ChannelName],
    ) -> Result<UnitInfoDto, UseCaseError> {
        let mut names = vec![ChannelName::data()];
        for name in channels {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }

        let mut session = self.store.open_reader_session(unit);
        let parts = session.count()?;

        let mut infos = Vec::with_capacity(names.len());
        for name in &names {
            infos.push(ChannelInfoDto {
                name: name.to_string(),
                parts: session.channel_count(name)?,
                segments: Vec::new(),
            });
        }

        let deepest = infos.iter().map(|info| info.parts).max().unwrap_or(0);
        for index in 0..deepest {
            let mut part = session.part(index)?;
            for (name, info) in names.iter().zip(infos.iter_mut()) {
                if index < info.parts {
                    info.segments.push(part.channel(name)?.segment_count());
                }
            }
        }

        let attributes = session.attributes()?;
        session.close()?;

        Ok(UnitInfoDto {
            unit: unit.id().as_u64(),
            type_name: unit.type_name().to_string(),
            parts,
            channels: infos,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::IngestRequest;
    use crate::application::use_cases::IngestUnitUseCase;
    use crate::infrastructure::storage::MemoryStore;
    use std::rc::Rc;

    #[test]
    fn test_describe_layout() {
        let store = DataStore::new(Rc::new(MemoryStore::new()), 256);
        let unit = DataUnit::new(30u64, "text");

        let mut request = IngestRequest::new(unit.clone());
        request.parts = vec![b"a\nb\nc\n".to_vec(), b"d".to_vec(), b"e\nf".to_vec()];
        request.context.insert(1, b"ctx".to_vec());
        request.attributes.insert("lang", "en");
        IngestUnitUseCase::new(store.clone()).execute(request).unwrap();

        let info = DescribeUnitUseCase::new(store)
            .execute(&unit, &[ChannelName::context()])
            .unwrap();

        assert_eq!(info.parts, 3);
        assert_eq!(info.channels[0].segments, vec![3, 1, 2]);
        assert_eq!(info.channels[1].parts, 2);
        assert_eq!(info.channels[1].segments, vec![0, 1]);
        assert_eq!(info.attributes.get("lang"), Some("en"));
    }

    #[test]
    fn test_describe_empty_unit() {
        let store = DataStore::new(Rc::new(MemoryStore::new()), 256);
        let info = DescribeUnitUseCase::new(store)
            .execute(&DataUnit::new(31u64, "text"), &[])
            .unwrap();
        assert_eq!(info.parts, 0);
        assert!(info.channels[0].segments.is_empty());
        assert!(info.attributes.is_empty());
    }
}
