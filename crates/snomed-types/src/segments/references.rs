//! References segment: variable-length lists of `u32` offsets (4+4n
//! bytes where n is the list length). This is the store's only
//! collection type — parent lists, child
//! lists, relationship chains, refset membership lists, and stemmed-word
//! fan-out lists are all a count-prefixed run of `u32`s living here, reached
//! by a single `u32` offset from whichever fixed-stride record owns them.

use super::{check_bounds, read_u32, SegmentError};

/// Borrowed view over a packed `References` buffer.
pub struct ReferencesReader<'a> {
    buf: &'a [u8],
}

impl<'a> ReferencesReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the list at `offset`. [`super::NO_REF`] and `0` both read as an
    /// empty list rather than erroring, since callers
    /// routinely hold an "absent" offset straight from a concept/description
    /// record without having checked it first.
    pub fn get(&self, offset: u32) -> Result<Vec<u32>, SegmentError> {
        if super::is_absent(offset) {
            return Ok(Vec::new());
        }
        check_bounds(self.buf, offset, 4)?;
        let at = offset as usize;
        let count = read_u32(self.buf, at) as usize;
        check_bounds(self.buf, offset, 4 + count * 4)?;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(read_u32(self.buf, at + 4 + i * 4));
        }
        Ok(out)
    }
}

/// Append-only builder for a `References` segment.
#[derive(Default)]
pub struct ReferencesWriter {
    buf: Vec<u8>,
}

impl ReferencesWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a list and returns its offset, or [`super::NO_REF`] without
    /// writing anything if the list is empty — empty lists never need
    /// segment space, they're representable entirely by the sentinel.
    pub fn add(&mut self, values: &[u32]) -> u32 {
        if values.is_empty() {
            return super::NO_REF;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
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
    use crate::segments::NO_REF;

    #[test]
    fn round_trips_lists() {
        let mut w = ReferencesWriter::new();
        let a = w.add(&[1, 2, 3]);
        let b = w.add(&[]);
        let bytes = w.into_bytes();

        let r = ReferencesReader::new(&bytes);
        assert_eq!(r.get(a).unwrap(), vec![1, 2, 3]);
        assert_eq!(b, NO_REF);
        assert_eq!(r.get(b).unwrap(), Vec::<u32>::new());
        assert_eq!(r.get(NO_REF).unwrap(), Vec::<u32>::new());
        assert_eq!(r.get(0).unwrap(), Vec::<u32>::new());
    }
}
