//! Words segment: one fixed-stride record (5 bytes) per distinct
//! lower-cased word encountered while indexing description terms. Used by
//! the text-search filter path to resolve a query word to the stems that
//! contain it without re-tokenising every description on every search.

use super::{check_alignment, check_bounds, read_u32, read_u8, SegmentError};

const STRIDE: usize = 5;

/// A single word record: where its text lives in `Strings`, and a flag byte
/// reserved for future search-ranking hints (stop-word, common-word, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRecord {
    /// Offset of the word's text in the `Strings` segment.
    pub text_ref: u32,
    /// Flag byte; bit 0 marks the word as a stop word excluded from ranking.
    pub flags: u8,
}

impl WordRecord {
    /// True if this word is excluded from search-ranking weight.
    pub fn is_stop_word(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// Borrowed view over a packed `Words` buffer.
pub struct WordsReader<'a> {
    buf: &'a [u8],
}

impl<'a> WordsReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the record at `offset`.
    pub fn get(&self, offset: u32) -> Result<WordRecord, SegmentError> {
        check_alignment(offset, STRIDE)?;
        check_bounds(self.buf, offset, STRIDE)?;
        let at = offset as usize;
        Ok(WordRecord {
            text_ref: read_u32(self.buf, at),
            flags: read_u8(self.buf, at + 4),
        })
    }

    /// Number of records in the segment.
    pub fn len(&self) -> usize {
        self.buf.len() / STRIDE
    }

    /// True if the segment holds no records.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Append-only builder for a `Words` segment.
#[derive(Default)]
pub struct WordsWriter {
    buf: Vec<u8>,
}

impl WordsWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its offset.
    pub fn add(&mut self, text_ref: u32, flags: u8) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&text_ref.to_le_bytes());
        self.buf.push(flags);
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
    fn round_trips_records() {
        let mut w = WordsWriter::new();
        let a = w.add(100, 0);
        let b = w.add(200, 0x01);
        let bytes = w.into_bytes();

        let r = WordsReader::new(&bytes);
        assert_eq!(r.get(a).unwrap().text_ref, 100);
        assert!(!r.get(a).unwrap().is_stop_word());
        assert_eq!(r.get(b).unwrap().text_ref, 200);
        assert!(r.get(b).unwrap().is_stop_word());
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn rejects_misaligned_offset() {
        let bytes = WordsWriter::new().into_bytes();
        let r = WordsReader::new(&bytes);
        assert!(matches!(
            r.get(2),
            Err(SegmentError::MisalignedOffset { .. })
        ));
    }
}
