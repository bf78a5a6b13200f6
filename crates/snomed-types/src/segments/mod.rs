//! Segment primitives: typed views over packed byte buffers.
//!
//! A SNOMED CT binary store is ten independently sized, byte-addressed
//! arrays (see the module-level docs of each segment type for its record
//! layout). Every offset is a byte offset into the *owning* segment; cross
//! segment references are plain `u32`s, never pointers.
//!
//! Each segment has two distinct types: a `*Reader<'a>` borrowing an
//! immutable slice (used by every query path) and a `*Writer` owning a
//! growable append buffer (used only by the loader/builder). A reader
//! cannot accidentally gain an `add` method and a writer cannot
//! accidentally be queried mid-build against offsets it hasn't flushed yet.
//!
//! All integers are little-endian. [`NO_REF`] is the sentinel written to a
//! `u32` cross-segment field meaning "no list" / "absent".

mod concepts;
mod description_index;
mod descriptions;
mod references;
mod refset_index;
mod refset_members;
mod relationships;
mod stems;
mod strings;
mod words;

pub use concepts::{ConceptRecord, ConceptsReader, ConceptsWriter};
pub use description_index::{DescriptionIndexReader, DescriptionIndexWriter};
pub use descriptions::{DescriptionRecord, DescriptionsReader, DescriptionsWriter};
pub use references::{ReferencesReader, ReferencesWriter};
pub use refset_index::{RefsetIndexKind, RefsetIndexReader, RefsetIndexRecord, RefsetIndexWriter};
pub use refset_members::{
    FieldWidth, RefsetMember, RefsetMemberIds, RefsetMembersReader, RefsetMembersWriter,
};
pub use relationships::{RelationshipRecord, RelationshipsReader, RelationshipsWriter};
pub use stems::{StemRecord, StemsReader, StemsWriter};
pub use strings::{StringsReader, StringsWriter};
pub use words::{WordRecord, WordsReader, WordsWriter};

/// Sentinel written into a `u32` cross-segment field to mean "no list" /
/// "absent". Offset `0` means the same thing for the handful of fields that
/// never legitimately point at byte zero (the first record of a segment
/// always follows a non-zero header).
pub const NO_REF: u32 = 0xFFFF_FFFF;

/// Returns true if `off` denotes an absent reference.
pub fn is_absent(off: u32) -> bool {
    off == 0 || off == NO_REF
}

/// Errors raised by segment readers/writers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// A string passed to `Strings::add` does not fit in a `u16` length prefix.
    #[error("string of {len} bytes exceeds the u16 length prefix")]
    ValueTooLarge {
        /// The string's UTF-8 byte length.
        len: usize,
    },
    /// A reader was asked to read a fixed-stride record at an offset that is
    /// not a multiple of the record stride. Per the source design notes,
    /// this is a programmer bug, not a recoverable condition.
    #[error("offset {offset} is not aligned to the {stride}-byte record stride")]
    MisalignedOffset {
        /// The offending offset.
        offset: u32,
        /// The segment's fixed record stride.
        stride: usize,
    },
    /// A reader was asked to read past the end of its backing buffer.
    #[error("offset {offset} (+{len} bytes) is out of bounds for a {size}-byte segment")]
    OffsetOutOfBounds {
        /// The offending offset.
        offset: u32,
        /// The number of bytes the read required.
        len: usize,
        /// The size of the backing buffer.
        size: usize,
    },
}

type Result<T> = std::result::Result<T, SegmentError>;

/// Shared bounds-checked little-endian readers used by every fixed-stride
/// segment. Kept free-standing (not a trait) because each segment's record
/// shape is different enough that a generic "record" abstraction would cost
/// more than it would save.
pub(crate) fn read_u8(buf: &[u8], at: usize) -> u8 {
    buf[at]
}

pub(crate) fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(buf[at..at + 2].try_into().unwrap())
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

pub(crate) fn read_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

pub(crate) fn check_bounds(buf: &[u8], offset: u32, len: usize) -> Result<()> {
    let start = offset as usize;
    if start.checked_add(len).map_or(true, |end| end > buf.len()) {
        return Err(SegmentError::OffsetOutOfBounds {
            offset,
            len,
            size: buf.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_alignment(offset: u32, stride: usize) -> Result<()> {
    if (offset as usize) % stride != 0 {
        return Err(SegmentError::MisalignedOffset { offset, stride });
    }
    Ok(())
}
