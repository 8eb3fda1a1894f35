use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::application::ports::{ByteReader, ByteSink, ByteStreamFactory, ByteWriter, StorageError};
use crate::domain::value_objects::{ChannelName, DataUnitId, StreamRole};
use crate::infrastructure::storage::compression::{
    compress_sink, decompress_source, DEFAULT_BLOCK_SIZE,
};
use crate::infrastructure::storage::PathBuilder;

/// Buffered file handle; `finish` flushes and optionally syncs to disk.
pub(crate) struct FileSink {
    file: BufWriter<File>,
    path: PathBuf,
    durable: bool,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ByteSink for FileSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let FileSink {
            file,
            path,
            durable,
        } = *self;
        let file = file.into_inner().map_err(|e| e.into_error())?;
        if durable {
            file.sync_all()?;
        }
        debug!("Finished stream file: {:?}", path);
        Ok(())
    }
}

/// File-backed stream factory rooted at one directory.
pub struct LocalFilesystemStore {
    path_builder: PathBuilder,
    durable_writes: bool,
    compress_data: bool,
    // Bucket directories already created by this store
    created_dirs: RefCell<HashSet<PathBuf>>,
}

impl LocalFilesystemStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_options(root, false, false)
    }

    pub fn with_options(root: PathBuf, durable_writes: bool, compress_data: bool) -> Self {
        Self {
            path_builder: PathBuilder::new(root),
            durable_writes,
            compress_data,
            created_dirs: RefCell::new(HashSet::new()),
        }
    }

    /// Create the store directory
    pub fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.path_builder.root().join("store"))?;
        Ok(())
    }

    pub fn path_builder(&self) -> &PathBuilder {
        &self.path_builder
    }

    fn is_compressed(&self, role: StreamRole) -> bool {
        self.compress_data && !role.is_index()
    }

    fn ensure_bucket(&self, unit: DataUnitId) -> Result<(), StorageError> {
        let dir = self.path_builder.bucket_dir(unit);
        if self.created_dirs.borrow().contains(&dir) {
            return Ok(());
        }
        fs::create_dir_all(&dir)?;
        self.created_dirs.borrow_mut().insert(dir);
        Ok(())
    }
}

impl ByteStreamFactory for LocalFilesystemStore {
    fn create(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<ByteWriter, StorageError> {
        self.ensure_bucket(unit)?;
        let path = self.path_builder.stream_path(unit, channel, role);
        debug!("Creating stream file: {:?}", path);

        let file = File::create(&path)?;
        let sink = FileSink {
            file: BufWriter::new(file),
            path,
            durable: self.durable_writes,
        };

        if self.is_compressed(role) {
            compress_sink(sink, DEFAULT_BLOCK_SIZE)
        } else {
            Ok(Box::new(sink))
        }
    }

    fn open(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<Option<ByteReader>, StorageError> {
        let path = self.path_builder.stream_path(unit, channel, role);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        if self.is_compressed(role) {
            decompress_source(BufReader::new(file)).map(Some)
        } else {
            Ok(Some(Box::new(file)))
        }
    }

    fn remove(
        &self,
        unit: DataUnitId,
        channel: &ChannelName,
        role: StreamRole,
    ) -> Result<(), StorageError> {
        let path = self.path_builder.stream_path(unit, channel, role);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stream file: {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove stream file {:?}: {}", path, e);
                Err(StorageError::Io(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_all(store: &LocalFilesystemStore, unit: DataUnitId, role: StreamRole) -> Vec<u8> {
        let mut reader = store
            .open(unit, &ChannelName::data(), role)
            .unwrap()
            .unwrap();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_store_init_creates_directories() {
        let dir = TempDir::new().unwrap();
        let store = LocalFilesystemStore::new(dir.path().to_path_buf());
        store.init().unwrap();
        assert!(dir.path().join("store").exists());
    }

    #[test]
    fn test_create_and_open() {
        let dir = TempDir::new().unwrap();
        let store = LocalFilesystemStore::new(dir.path().to_path_buf());
        let unit = DataUnitId::new(2048);

        let mut sink = store
            .create(unit, &ChannelName::data(), StreamRole::Data)
            .unwrap();
        sink.write_all(b"Hello, World!").unwrap();
        sink.finish().unwrap();

        assert!(dir
            .path()
            .join("store/000000002/000000002048.dat")
            .exists());
        assert_eq!(read_all(&store, unit, StreamRole::Data), b"Hello, World!");
    }

    #[test]
    fn test_open_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalFilesystemStore::new(dir.path().to_path_buf());
        let result = store
            .open(DataUnitId::new(1), &ChannelName::context(), StreamRole::Data)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = LocalFilesystemStore::with_options(dir.path().to_path_buf(), true, false);
        let unit = DataUnitId::new(9);

        let sink = store
            .create(unit, &ChannelName::data(), StreamRole::BoundaryIndex)
            .unwrap();
        sink.finish().unwrap();

        store
            .remove(unit, &ChannelName::data(), StreamRole::BoundaryIndex)
            .unwrap();
        store
            .remove(unit, &ChannelName::data(), StreamRole::BoundaryIndex)
            .unwrap();
        assert!(store
            .open(unit, &ChannelName::data(), StreamRole::BoundaryIndex)
            .unwrap()
            .is_none());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compression_applies_to_data_only() {
        let dir = TempDir::new().unwrap();
        let store = LocalFilesystemStore::with_options(dir.path().to_path_buf(), false, true);
        let unit = DataUnitId::new(77);
        let payload = b"abcabcabc".repeat(100);

        for role in [StreamRole::Data, StreamRole::BoundaryIndex] {
            let mut sink = store.create(unit, &ChannelName::data(), role).unwrap();
            sink.write_all(&payload).unwrap();
            sink.finish().unwrap();
        }

        let data_path = store
            .path_builder()
            .stream_path(unit, &ChannelName::data(), StreamRole::Data);
        let index_path =
            store
                .path_builder()
                .stream_path(unit, &ChannelName::data(), StreamRole::BoundaryIndex);
        assert!(fs::metadata(data_path).unwrap().len() < payload.len() as u64);
        assert_eq!(fs::metadata(index_path).unwrap().len(), payload.len() as u64);

        assert_eq!(read_all(&store, unit, StreamRole::Data), payload);
        assert_eq!(read_all(&store, unit, StreamRole::BoundaryIndex), payload);
    }
}
