use std::rc::Rc;
use tracing::info;

use crate::application::data_store::DataStore;
use crate::application::ports::{ByteStreamFactory, StorageError};
use crate::application::use_cases::{
    DescribeUnitUseCase, IngestUnitUseCase, ReadPartUseCase, StepRecordUseCase,
};
use crate::config::Config;
use crate::infrastructure::storage::LocalFilesystemStore;

/// Use cases wired to one store
pub struct AppServices {
    pub store: DataStore,
    pub ingest: IngestUnitUseCase,
    pub read_part: ReadPartUseCase,
    pub step_record: StepRecordUseCase,
    pub describe: DescribeUnitUseCase,
}

/// Application builder for dependency injection and setup
pub struct ApplicationBuilder {
    config: Config,
    factory: Option<Rc<dyn ByteStreamFactory>>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: None,
        }
    }

    /// Use an already constructed stream factory
    pub fn with_factory(mut self, factory: Rc<dyn ByteStreamFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Initialize the file-backed store under the configured root
    pub fn with_local_storage(mut self) -> Result<Self, StorageError> {
        let store = LocalFilesystemStore::with_options(
            self.config.store_root.clone(),
            self.config.durable_writes,
            self.config.compress_data,
        );
        store.init()?;
        info!(
            root = ?self.config.store_root,
            durable = self.config.durable_writes,
            compressed = self.config.compress_data,
            "Local storage initialized"
        );
        self.factory = Some(Rc::new(store));
        Ok(self)
    }

    /// Build the use cases
    pub fn build(self) -> Result<AppServices, StorageError> {
        let factory = self
            .factory
            .ok_or_else(|| StorageError::Internal("Stream factory not initialized".to_string()))?;
        let store = DataStore::new(factory, self.config.write_buffer_bytes);

        Ok(AppServices {
            ingest: IngestUnitUseCase::new(store.clone()),
            read_part: ReadPartUseCase::new(store.clone()),
            step_record: StepRecordUseCase::new(store.clone()),
            describe: DescribeUnitUseCase::new(store.clone()),
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_requires_factory() {
        let result = ApplicationBuilder::new(Config::default()).build();
        assert!(matches!(result, Err(StorageError::Internal(_))));
    }

    #[test]
    fn test_local_storage_creates_root() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            store_root: dir.path().to_path_buf(),
            ..Config::default()
        };
        let services = ApplicationBuilder::new(config)
            .with_local_storage()
            .unwrap()
            .build()
            .unwrap();
        assert!(dir.path().join("store").exists());
        drop(services);
    }
}
