//! Include/exclude filtering over the segments of one part.
//!
//! A `SegmentSelection` is either "everything except" a set of excluded
//! segments or "nothing except" a set of included ones. Reading a
//! selection yields the chosen segments back to back, in segment order.

use std::collections::BTreeSet;
use std::io::{self, Read};

use crate::codec::io::ByteRange;
use crate::codec::nested::NestedReader;
use crate::domain::errors::{CodecError, CodecResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSelection {
    include_all: bool,
    included: BTreeSet<u64>,
    excluded: BTreeSet<u64>,
}

impl Default for SegmentSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl SegmentSelection {
    /// Every segment.
    pub fn all() -> Self {
        Self {
            include_all: true,
            included: BTreeSet::new(),
            excluded: BTreeSet::new(),
        }
    }

    /// No segment.
    pub fn none() -> Self {
        Self {
            include_all: false,
            ..Self::all()
        }
    }

    /// Switch to "nothing except" mode and add `segment`.
    pub fn include(&mut self, segment: u64) -> &mut Self {
        self.include_all = false;
        self.included.insert(segment);
        self
    }

    /// Switch to "everything except" mode and drop `segment`.
    pub fn exclude(&mut self, segment: u64) -> &mut Self {
        self.include_all = true;
        self.excluded.insert(segment);
        self
    }

    pub fn include_all(&mut self) -> &mut Self {
        *self = Self::all();
        self
    }

    pub fn exclude_all(&mut self) -> &mut Self {
        *self = Self::none();
        self
    }

    pub fn is_selected(&self, segment: u64) -> bool {
        if self.include_all {
            !self.excluded.contains(&segment)
        } else {
            self.included.contains(&segment)
        }
    }

    /// Selected segment numbers below `count`.
    pub fn selected(&self, count: u64) -> impl Iterator<Item = u64> + '_ {
        (0..count).filter(move |segment| self.is_selected(*segment))
    }

    /// Fails with `IndexOutOfRange` if any named segment is `>= count`.
    pub fn validate(&self, count: u64) -> CodecResult<()> {
        let named = self.included.iter().chain(self.excluded.iter());
        match named.max() {
            Some(&index) if index >= count => Err(CodecError::IndexOutOfRange { index, count }),
            _ => Ok(()),
        }
    }

    /// Part-relative byte ranges of the selected segments, adjacent ranges
    /// merged. `boundaries` are the part's segment end offsets.
    pub(crate) fn ranges(&self, boundaries: &[u64]) -> Vec<ByteRange> {
        let mut ranges: Vec<ByteRange> = Vec::new();
        for segment in self.selected(boundaries.len() as u64) {
            let index = segment as usize;
            let start = if index == 0 { 0 } else { boundaries[index - 1] };
            let range = ByteRange::new(start, boundaries[index]);
            if range.is_empty() {
                continue;
            }
            match ranges.last_mut() {
                Some(last) if last.end == range.start => last.end = range.end,
                _ => ranges.push(range),
            }
        }
        ranges
    }
}

/// Which segment a byte offset resolves to when it sits on a boundary
/// shared by empty segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentBound {
    /// The first segment starting at the offset, empty ones included.
    Lower,
    /// The segment holding the byte at the offset.
    Upper,
}

/// Segment of a part at `offset`. Returns the segment count when `offset`
/// is the end of the part.
pub(crate) fn segment_at_offset(boundaries: &[u64], offset: u64, bound: SegmentBound) -> u64 {
    let holding = boundaries.partition_point(|&end| end <= offset) as u64;
    match bound {
        SegmentBound::Upper => holding,
        SegmentBound::Lower if offset == 0 => 0,
        SegmentBound::Lower => {
            let before = boundaries.partition_point(|&end| end < offset);
            if boundaries.get(before) == Some(&offset) {
                before as u64 + 1
            } else {
                holding
            }
        }
    }
}

/// Segments overlapping the part-relative `range`.
pub(crate) fn segments_overlapping(boundaries: &[u64], range: ByteRange) -> std::ops::Range<u64> {
    let first = boundaries.partition_point(|&end| end <= range.start) as u64;
    if range.is_empty() {
        return first..first;
    }
    let last = (boundaries.partition_point(|&end| end < range.end) as u64 + 1)
        .min(boundaries.len() as u64);
    first..last.max(first)
}

/// Reads the selected segments of the open part back to back.
pub struct SelectedSegments<'a> {
    reader: &'a mut NestedReader,
    ranges: Vec<ByteRange>,
    current: usize,
    cursor: u64,
}

impl<'a> SelectedSegments<'a> {
    pub(crate) fn new(reader: &'a mut NestedReader, ranges: Vec<ByteRange>) -> Self {
        Self {
            reader,
            ranges,
            current: 0,
            cursor: 0,
        }
    }

    /// Total selected bytes.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(ByteRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.len() as usize);
        self.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for SelectedSegments<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(range) = self.ranges.get(self.current).copied() {
            let remaining = range.len() - self.cursor;
            if remaining == 0 {
                self.current += 1;
                self.cursor = 0;
                continue;
            }
            let want = remaining.min(buf.len() as u64) as usize;
            let n = self
                .reader
                .read_entry_at(range.start + self.cursor, &mut buf[..want])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("part ended inside segment range {}", range),
                ));
            }
            self.cursor += n as u64;
            return Ok(n);
        }
        Ok(0)
    }
}
