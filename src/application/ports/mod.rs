mod byte_stream_factory;

pub use byte_stream_factory::{
    ByteReader, ByteSink, ByteSource, ByteStreamFactory, ByteWriter, StorageError,
};

#[cfg(test)]
pub use byte_stream_factory::MockByteStreamFactory;
