//! Byte-level plumbing shared by the codec layers.

use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};

use crate::application::ports::{ByteReader, ByteWriter};

pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Half-open byte range `[start, end)` in a physical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "range start {} after end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Absolute range for `[from, to)` given relative to this range.
    pub fn sub_range(&self, from: u64, to: u64) -> ByteRange {
        let start = (self.start + from).min(self.end);
        let end = (self.start + to).min(self.end).max(start);
        ByteRange { start, end }
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Buffered sink that counts the bytes passed through it.
pub(crate) struct CountingSink {
    inner: Option<BufWriter<ByteWriter>>,
    written: u64,
}

impl CountingSink {
    pub fn new(inner: ByteWriter, capacity: usize) -> Self {
        Self {
            inner: Some(BufWriter::with_capacity(capacity, inner)),
            written: 0,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Flush the buffer and run the sink's close hook. Idempotent.
    pub fn finish(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(buffered) => {
                let sink = buffered.into_inner().map_err(|e| e.into_error())?;
                sink.finish()
            }
            None => Ok(()),
        }
    }

    fn sink(&mut self) -> io::Result<&mut BufWriter<ByteWriter>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink already finished"))
    }
}

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink()?.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink()?.flush()
    }
}

/// Reader that remembers its position so sequential reads never seek.
pub(crate) struct PositionedReader {
    inner: BufReader<ByteReader>,
    position: Option<u64>,
    len: u64,
}

impl PositionedReader {
    pub fn new(mut inner: ByteReader) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self {
            inner: BufReader::with_capacity(DEFAULT_BUFFER_CAPACITY, inner),
            position: Some(len),
            len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        if self.position != Some(pos) {
            self.inner.seek(SeekFrom::Start(pos))?;
        }
        match self.inner.read(buf) {
            Ok(n) => {
                self.position = Some(pos + n as u64);
                Ok(n)
            }
            Err(e) => {
                self.position = None;
                Err(e)
            }
        }
    }

    pub fn read_exact_at(&mut self, mut pos: u64, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read_at(pos, buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("stream ended at byte {} of {}", pos, self.len),
                    ))
                }
                Ok(n) => {
                    pos += n as u64;
                    buf = &mut buf[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read from `range` starting `offset` bytes into it; never crosses
    /// `range.end`.
    pub fn read_in(&mut self, range: ByteRange, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = range.len().saturating_sub(offset);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = remaining.min(buf.len() as u64) as usize;
        self.read_at(range.start + offset, &mut buf[..want])
    }

    pub fn read_range(&mut self, range: ByteRange) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0u8; range.len() as usize];
        self.read_exact_at(range.start, &mut bytes)?;
        Ok(bytes)
    }
}

/// Resolve a `SeekFrom` against a window of `len` bytes.
pub(crate) fn resolve_seek(len: u64, current: u64, pos: SeekFrom) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => Some(n),
        SeekFrom::End(delta) => len.checked_add_signed(delta),
        SeekFrom::Current(delta) => current.checked_add_signed(delta),
    };
    target.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative or overflowing position",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ByteSink;
    use std::io::Cursor;

    struct VecSink(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

    impl Write for VecSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteSink for VecSink {
        fn finish(self: Box<Self>) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_counting_sink_counts_and_finishes() {
        let shared = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut sink = CountingSink::new(Box::new(VecSink(shared.clone())), 4);
        sink.write_all(b"hello world").unwrap();
        assert_eq!(sink.written(), 11);

        sink.finish().unwrap();
        assert!(sink.is_finished());
        assert_eq!(shared.borrow().as_slice(), b"hello world");
        assert!(sink.write_all(b"x").is_err());
        // finish is idempotent
        sink.finish().unwrap();
    }

    #[test]
    fn test_read_in_stops_at_range_end() {
        let mut reader =
            PositionedReader::new(Box::new(Cursor::new(b"0123456789".to_vec()))).unwrap();
        assert_eq!(reader.len(), 10);

        let range = ByteRange::new(2, 5);
        let mut buf = [0u8; 8];
        let n = reader.read_in(range, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"234");
        assert_eq!(reader.read_in(range, 3, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_exact_at_past_end() {
        let mut reader = PositionedReader::new(Box::new(Cursor::new(b"abc".to_vec()))).unwrap();
        let mut buf = [0u8; 4];
        let err = reader.read_exact_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_sub_range_clamps() {
        let range = ByteRange::new(10, 20);
        assert_eq!(range.sub_range(2, 5), ByteRange::new(12, 15));
        assert_eq!(range.sub_range(8, 50), ByteRange::new(18, 20));
        assert_eq!(range.sub_range(30, 40), ByteRange::new(20, 20));
    }

    #[test]
    fn test_resolve_seek() {
        assert_eq!(resolve_seek(10, 3, SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(resolve_seek(10, 3, SeekFrom::End(-2)).unwrap(), 8);
        assert_eq!(resolve_seek(10, 3, SeekFrom::Current(2)).unwrap(), 5);
        assert!(resolve_seek(10, 3, SeekFrom::Current(-4)).is_err());
    }
}
