//! Block-compressed framing for channel data files.
//!
//! Logical bytes are cut into fixed-size blocks and each block is zlib
//! compressed on its own. A table of compressed block ends and a fixed
//! footer follow the blocks, so a reader inflates only the blocks a read
//! touches. Index files stay raw.
//!
//! Layout: `block* | block end (u64 BE) per block | footer`.
//! Footer (32 bytes): magic (8) | version (u32) | block size (u32) |
//! block count (u64) | logical length (u64), integers big-endian.

use std::io;

#[cfg(feature = "compression")]
use std::io::{Read, Seek, SeekFrom, Write};

#[cfg(feature = "compression")]
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::application::ports::{ByteReader, ByteSink, ByteWriter, StorageError};
#[cfg(feature = "compression")]
use crate::codec::io::resolve_seek;

/// "SEGZ\x01\x00\x00\x00"
pub const BLOCK_MAGIC: &[u8; 8] = &[83, 69, 71, 90, 1, 0, 0, 0];

pub const BLOCK_FORMAT_VERSION: u32 = 1;

pub const FOOTER_SIZE: usize = 32;

/// Logical bytes per compressed block.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockFooter {
    block_size: u32,
    block_count: u64,
    logical_len: u64,
}

impl BlockFooter {
    fn to_bytes(self) -> [u8; FOOTER_SIZE] {
        let mut bytes = [0u8; FOOTER_SIZE];
        bytes[0..8].copy_from_slice(BLOCK_MAGIC);
        bytes[8..12].copy_from_slice(&BLOCK_FORMAT_VERSION.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.block_size.to_be_bytes());
        bytes[16..24].copy_from_slice(&self.block_count.to_be_bytes());
        bytes[24..32].copy_from_slice(&self.logical_len.to_be_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; FOOTER_SIZE]) -> Result<Self, String> {
        if &bytes[0..8] != BLOCK_MAGIC {
            return Err("missing block magic".to_string());
        }
        let word = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[range]);
            u32::from_be_bytes(buf)
        };
        let long = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[range]);
            u64::from_be_bytes(buf)
        };

        let version = word(8..12);
        if version != BLOCK_FORMAT_VERSION {
            return Err(format!("unsupported block format version {}", version));
        }
        let footer = Self {
            block_size: word(12..16),
            block_count: long(16..24),
            logical_len: long(24..32),
        };
        if footer.block_size == 0 {
            return Err("block size is zero".to_string());
        }
        let expected = footer.logical_len.div_ceil(footer.block_size as u64);
        if footer.block_count != expected {
            return Err(format!(
                "{} blocks recorded for {} bytes, expected {}",
                footer.block_count, footer.logical_len, expected
            ));
        }
        Ok(footer)
    }
}

fn corrupt(reason: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(format!("Corrupt compressed data file: {}", reason))
}

/// Buffers one block of logical bytes and compresses it when full.
/// `flush` reaches the inner sink but never cuts a block short.
#[cfg(feature = "compression")]
struct BlockSink<S: ByteSink> {
    inner: S,
    block: Vec<u8>,
    block_size: usize,
    block_ends: Vec<u64>,
    compressed_len: u64,
    logical_len: u64,
}

#[cfg(feature = "compression")]
impl<S: ByteSink> BlockSink<S> {
    fn seal_block(&mut self) -> io::Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(self.block.len() / 2),
            Compression::default(),
        );
        encoder.write_all(&self.block)?;
        let compressed = encoder.finish()?;
        self.inner.write_all(&compressed)?;
        self.compressed_len += compressed.len() as u64;
        self.block_ends.push(self.compressed_len);
        self.block.clear();
        Ok(())
    }
}

#[cfg(feature = "compression")]
impl<S: ByteSink> Write for BlockSink<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.block_size - self.block.len();
        let n = room.min(buf.len());
        self.block.extend_from_slice(&buf[..n]);
        self.logical_len += n as u64;
        if self.block.len() == self.block_size {
            self.seal_block()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(feature = "compression")]
impl<S: ByteSink> ByteSink for BlockSink<S> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut sink = *self;
        sink.seal_block()?;
        for end in &sink.block_ends {
            sink.inner.write_all(&end.to_be_bytes())?;
        }
        let footer = BlockFooter {
            block_size: sink.block_size as u32,
            block_count: sink.block_ends.len() as u64,
            logical_len: sink.logical_len,
        };
        sink.inner.write_all(&footer.to_bytes())?;
        Box::new(sink.inner).finish()
    }
}

/// Seekable view of the logical bytes; keeps the last inflated block.
#[cfg(feature = "compression")]
pub(crate) struct BlockSource<R: Read + Seek> {
    inner: R,
    block_size: u64,
    block_ends: Vec<u64>,
    logical_len: u64,
    position: u64,
    cached_index: Option<u64>,
    cached: Vec<u8>,
    inflated_blocks: u64,
}

#[cfg(feature = "compression")]
impl<R: Read + Seek> BlockSource<R> {
    pub(crate) fn open(mut inner: R) -> Result<Self, StorageError> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < FOOTER_SIZE as u64 {
            return Err(corrupt(format!("{} bytes is shorter than the footer", file_len)));
        }
        let mut footer = [0u8; FOOTER_SIZE];
        inner.seek(SeekFrom::Start(file_len - FOOTER_SIZE as u64))?;
        inner.read_exact(&mut footer)?;
        let footer = BlockFooter::from_bytes(&footer).map_err(corrupt)?;

        let blocks_len = footer
            .block_count
            .checked_mul(8)
            .and_then(|table| file_len.checked_sub(FOOTER_SIZE as u64 + table))
            .ok_or_else(|| corrupt("block table larger than the file"))?;
        let mut table = vec![0u8; (footer.block_count * 8) as usize];
        inner.seek(SeekFrom::Start(blocks_len))?;
        inner.read_exact(&mut table)?;

        let block_ends: Vec<u64> = table
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                u64::from_be_bytes(buf)
            })
            .collect();
        if block_ends.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(corrupt("block ends decrease"));
        }
        if block_ends.last().copied().unwrap_or(0) != blocks_len {
            return Err(corrupt("block table does not cover the compressed bytes"));
        }

        Ok(Self {
            inner,
            block_size: footer.block_size as u64,
            block_ends,
            logical_len: footer.logical_len,
            position: 0,
            cached_index: None,
            cached: Vec::new(),
            inflated_blocks: 0,
        })
    }

    /// Blocks inflated so far.
    pub(crate) fn inflated_blocks(&self) -> u64 {
        self.inflated_blocks
    }

    fn load_block(&mut self, index: u64) -> io::Result<&[u8]> {
        if self.cached_index != Some(index) {
            let i = index as usize;
            let start = if i == 0 { 0 } else { self.block_ends[i - 1] };
            let mut compressed = vec![0u8; (self.block_ends[i] - start) as usize];
            self.inner.seek(SeekFrom::Start(start))?;
            self.inner.read_exact(&mut compressed)?;

            let expected = self
                .block_size
                .min(self.logical_len - index * self.block_size);
            let mut inflated = Vec::with_capacity(expected as usize);
            ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut inflated)?;
            if inflated.len() as u64 != expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "block {} inflated to {} bytes, expected {}",
                        index,
                        inflated.len(),
                        expected
                    ),
                ));
            }
            self.cached = inflated;
            self.cached_index = Some(index);
            self.inflated_blocks += 1;
        }
        Ok(&self.cached)
    }
}

#[cfg(feature = "compression")]
impl<R: Read + Seek> Read for BlockSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.logical_len {
            return Ok(0);
        }
        let index = self.position / self.block_size;
        let offset = (self.position % self.block_size) as usize;
        let block = self.load_block(index)?;
        let n = buf.len().min(block.len().saturating_sub(offset));
        buf[..n].copy_from_slice(&block[offset..offset + n]);
        self.position += n as u64;
        Ok(n)
    }
}

#[cfg(feature = "compression")]
impl<R: Read + Seek> Seek for BlockSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = resolve_seek(self.logical_len, self.position, pos)?;
        Ok(self.position)
    }
}

#[cfg(feature = "compression")]
pub fn compress_sink<S: ByteSink + 'static>(
    sink: S,
    block_size: usize,
) -> Result<ByteWriter, StorageError> {
    if block_size == 0 || block_size > u32::MAX as usize {
        return Err(StorageError::Internal(format!(
            "invalid compression block size {}",
            block_size
        )));
    }
    Ok(Box::new(BlockSink {
        inner: sink,
        block: Vec::with_capacity(block_size),
        block_size,
        block_ends: Vec::new(),
        compressed_len: 0,
        logical_len: 0,
    }))
}

#[cfg(feature = "compression")]
pub fn decompress_source<R: Read + Seek + 'static>(source: R) -> Result<ByteReader, StorageError> {
    Ok(Box::new(BlockSource::open(source)?))
}

#[cfg(not(feature = "compression"))]
pub fn compress_sink<S: ByteSink + 'static>(
    _sink: S,
    _block_size: usize,
) -> Result<ByteWriter, StorageError> {
    Err(StorageError::Internal(
        "compression support is not compiled in".to_string(),
    ))
}

#[cfg(not(feature = "compression"))]
pub fn decompress_source<R: io::Read + io::Seek + 'static>(
    _source: R,
) -> Result<ByteReader, StorageError> {
    Err(StorageError::Internal(
        "compression support is not compiled in".to_string(),
    ))
}

#[cfg(test)]
mod footer_tests {
    use super::*;

    #[test]
    fn test_footer_round_trip() {
        let footer = BlockFooter {
            block_size: 16,
            block_count: 3,
            logical_len: 40,
        };
        assert_eq!(BlockFooter::from_bytes(&footer.to_bytes()).unwrap(), footer);
    }

    #[test]
    fn test_footer_rejects_inconsistent_counts() {
        let footer = BlockFooter {
            block_size: 16,
            block_count: 2,
            logical_len: 40,
        };
        assert!(BlockFooter::from_bytes(&footer.to_bytes()).is_err());

        let mut bytes = footer.to_bytes();
        bytes[0] = b'X';
        assert!(BlockFooter::from_bytes(&bytes).is_err());
    }
}

#[cfg(all(test, feature = "compression"))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteSink for SharedSink {
        fn finish(self: Box<Self>) -> io::Result<()> {
            Ok(())
        }
    }

    fn compress(payload: &[u8], block_size: usize) -> Vec<u8> {
        let stored = Rc::new(RefCell::new(Vec::new()));
        let mut sink = compress_sink(SharedSink(stored.clone()), block_size).unwrap();
        sink.write_all(payload).unwrap();
        sink.finish().unwrap();
        let bytes = stored.borrow().clone();
        bytes
    }

    #[test]
    fn test_compressed_round_trip() {
        let payload = b"repetitive payload ".repeat(64);
        let compressed = compress(&payload, DEFAULT_BLOCK_SIZE);
        assert!(compressed.len() < payload.len());

        let mut source = decompress_source(Cursor::new(compressed)).unwrap();
        let mut restored = Vec::new();
        source.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_random_access_inflates_only_touched_blocks() {
        let payload: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_be_bytes()).collect();
        let compressed = compress(&payload, 1024);

        let mut source = BlockSource::open(Cursor::new(compressed)).unwrap();
        source.seek(SeekFrom::Start(30_000)).unwrap();
        let mut buf = [0u8; 100];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..], &payload[30_000..30_100]);
        assert_eq!(source.inflated_blocks(), 1);

        // Crossing into the next block inflates exactly one more
        source.seek(SeekFrom::Start(30_700)).unwrap();
        let mut buf = [0u8; 200];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..], &payload[30_700..30_900]);
        assert_eq!(source.inflated_blocks(), 2);
    }

    #[test]
    fn test_flush_does_not_cut_blocks() {
        let line = b"2026-10-17 INFO request served status=200\n";
        let stored = Rc::new(RefCell::new(Vec::new()));
        let mut sink = compress_sink(SharedSink(stored.clone()), DEFAULT_BLOCK_SIZE).unwrap();
        for _ in 0..2000 {
            sink.write_all(line).unwrap();
            sink.flush().unwrap();
        }
        sink.finish().unwrap();

        let raw = line.len() * 2000;
        assert!(stored.borrow().len() < raw / 20);
    }

    #[test]
    fn test_empty_stream() {
        let compressed = compress(b"", 64);
        assert_eq!(compressed.len(), FOOTER_SIZE);
        let mut source = decompress_source(Cursor::new(compressed)).unwrap();
        assert_eq!(source.seek(SeekFrom::End(0)).unwrap(), 0);
        let mut restored = Vec::new();
        source.read_to_end(&mut restored).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = decompress_source(Cursor::new(b"not a block-compressed file at all".to_vec()));
        assert!(matches!(result, Err(StorageError::Internal(_))));

        let short = decompress_source(Cursor::new(b"tiny".to_vec()));
        assert!(matches!(short, Err(StorageError::Internal(_))));
    }

    #[test]
    fn test_corrupt_block_is_rejected() {
        let payload = b"abcdefgh".repeat(100);
        let mut compressed = compress(&payload, 256);
        // Corrupt the first compressed block
        compressed[2] ^= 0xFF;
        compressed[3] ^= 0xFF;
        let mut source = decompress_source(Cursor::new(compressed)).unwrap();
        let mut restored = Vec::new();
        assert!(source.read_to_end(&mut restored).is_err());
    }
}
