//! Strings segment: a flat, append-only byte arena.
//!
//! Every record is a `u16` UTF-8 byte length followed by that many bytes
//! (2+n). Nothing else in the store holds a `&str` directly; every
//! term, language code, and map-target string is a `u32` offset into this
//! segment.

use super::{check_bounds, read_u16, SegmentError};

/// Borrowed view over a packed `Strings` buffer.
pub struct StringsReader<'a> {
    buf: &'a [u8],
}

impl<'a> StringsReader<'a> {
    /// Wraps a raw segment buffer. No validation is performed up front;
    /// malformed offsets surface as [`SegmentError`] on first use.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the string at `offset`.
    pub fn get(&self, offset: u32) -> Result<&'a str, SegmentError> {
        check_bounds(self.buf, offset, 2)?;
        let at = offset as usize;
        let len = read_u16(self.buf, at) as usize;
        check_bounds(self.buf, offset, 2 + len)?;
        let bytes = &self.buf[at + 2..at + 2 + len];
        std::str::from_utf8(bytes).map_err(|_| SegmentError::OffsetOutOfBounds {
            offset,
            len,
            size: self.buf.len(),
        })
    }

    /// Raw byte length of the segment.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if the segment carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Append-only builder for a `Strings` segment.
#[derive(Default)]
pub struct StringsWriter {
    buf: Vec<u8>,
}

impl StringsWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its offset.
    pub fn add(&mut self, value: &str) -> Result<u32, SegmentError> {
        let bytes = value.as_bytes();
        let len: u16 = bytes
            .len()
            .try_into()
            .map_err(|_| SegmentError::ValueTooLarge { len: bytes.len() })?;
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(bytes);
        Ok(offset)
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
    fn round_trips_values_at_their_offsets() {
        let mut w = StringsWriter::new();
        let a = w.add("clinical finding").unwrap();
        let b = w.add("").unwrap();
        let c = w.add("snomed ct root").unwrap();
        let bytes = w.into_bytes();

        let r = StringsReader::new(&bytes);
        assert_eq!(r.get(a).unwrap(), "clinical finding");
        assert_eq!(r.get(b).unwrap(), "");
        assert_eq!(r.get(c).unwrap(), "snomed ct root");
    }

    #[test]
    fn rejects_out_of_bounds_offset() {
        let bytes = StringsWriter::new().into_bytes();
        let r = StringsReader::new(&bytes);
        assert!(r.get(4).is_err());
    }
}
