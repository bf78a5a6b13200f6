//! DescriptionIndex segment: one fixed-stride record (12 bytes) per
//! description, sorted by description id, mapping id → offset into
//! `Descriptions`. Exists only so a description can be located by id with a
//! binary search without `Descriptions` itself needing to be id-sorted in
//! its own right (it's written in concept-grouping order by the loader).

use super::{check_alignment, check_bounds, read_u32, read_u64, SegmentError};

const STRIDE: usize = 12;

/// Borrowed, id-sorted view over a packed `DescriptionIndex` buffer.
pub struct DescriptionIndexReader<'a> {
    buf: &'a [u8],
}

impl<'a> DescriptionIndexReader<'a> {
    /// Wraps a raw segment buffer. The buffer is assumed sorted by id; this
    /// is a loader invariant, not something re-validated on every read.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.buf.len() / STRIDE
    }

    /// True if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn entry_at(&self, i: usize) -> (u64, u32) {
        let at = i * STRIDE;
        (read_u64(self.buf, at), read_u32(self.buf, at + 8))
    }

    /// Binary searches for `id`, returning the matching description's
    /// offset into `Descriptions`, or `None` if no description has this id.
    pub fn find(&self, id: u64) -> Option<u32> {
        let n = self.len();
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (mid_id, offset) = self.entry_at(mid);
            match mid_id.cmp(&id) {
                std::cmp::Ordering::Equal => return Some(offset),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Reads the raw `(id, offset)` pair at record offset `at` — used by
    /// callers that already hold an offset (e.g. iterating sequentially)
    /// rather than searching by id.
    pub fn get(&self, at: u32) -> Result<(u64, u32), SegmentError> {
        check_alignment(at, STRIDE)?;
        check_bounds(self.buf, at, STRIDE)?;
        Ok(self.entry_at(at as usize / STRIDE))
    }
}

/// Append-only builder for a `DescriptionIndex` segment. Callers must
/// append in ascending id order.
#[derive(Default)]
pub struct DescriptionIndexWriter {
    buf: Vec<u8>,
}

impl DescriptionIndexWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an `(id, offset)` entry and returns its own offset in this
    /// index segment.
    pub fn add(&mut self, id: u64, descriptions_offset: u32) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&id.to_le_bytes());
        self.buf
            .extend_from_slice(&descriptions_offset.to_le_bytes());
        offset
    }

    /// Consumes the writer, producing the finished segment buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_by_binary_search() {
        let mut w = DescriptionIndexWriter::new();
        w.add(10, 100);
        w.add(20, 200);
        w.add(30, 300);
        let bytes = w.into_bytes();

        let r = DescriptionIndexReader::new(&bytes);
        assert_eq!(r.find(20), Some(200));
        assert_eq!(r.find(25), None);
        assert_eq!(r.len(), 3);
    }
}
