//! Concepts segment: one fixed-stride record (56 bytes) per SNOMED
//! concept, sorted by id. Every service operation (`isActive`, `parents`,
//! `subsumes`, ...) starts with a binary search in this segment.

use super::{check_alignment, check_bounds, read_u16, read_u32, read_u64, read_u8, SegmentError};
use crate::enums::DefinitionStatus;

const STRIDE: usize = 56;

/// A single concept record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptRecord {
    /// The SNOMED CT concept identifier.
    pub id: u64,
    /// Offset of the owning module concept, in `Concepts`.
    pub module_ref: u32,
    /// Offset into `References` of this concept's direct parent offsets.
    pub parents_ref: u32,
    /// Offset into `References` of this concept's direct child offsets.
    pub children_ref: u32,
    /// Offset into `References` of the sorted, transitively-closed set of
    /// ancestor offsets (including self), used by `subsumes`.
    pub closure_ref: u32,
    /// Offset into `References` of outbound relationship offsets.
    pub outbound_relationships_ref: u32,
    /// Offset into `References` of inbound relationship offsets.
    pub inbound_relationships_ref: u32,
    /// Offset of the first matching entry in `DescriptionIndex` for this
    /// concept's descriptions; count given by `description_count`.
    pub descriptions_ref: u32,
    /// Number of descriptions belonging to this concept.
    pub description_count: u16,
    /// Offset into `References` of simple refset memberships.
    pub refsets_ref: u32,
    /// Offset of the cached fully specified name term, in `Strings`.
    pub fsn_ref: u32,
    /// RF2 `effectiveTime`.
    pub effective_time: u32,
    /// Bit 0: active. Bit 1: primitive (clear = fully defined).
    pub flags: u8,
}

impl ConceptRecord {
    /// True if the RF2 `active` flag was set.
    pub fn is_active(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// The concept's definition status, decoded from bit 1 of `flags`.
    pub fn definition_status(&self) -> DefinitionStatus {
        if self.flags & 0x02 != 0 {
            DefinitionStatus::Primitive
        } else {
            DefinitionStatus::FullyDefined
        }
    }

    /// True if [`Self::definition_status`] is `Primitive`.
    pub fn is_primitive(&self) -> bool {
        self.definition_status() == DefinitionStatus::Primitive
    }
}

fn flags_byte(active: bool, definition_status: DefinitionStatus) -> u8 {
    let mut f = 0u8;
    if active {
        f |= 0x01;
    }
    if definition_status == DefinitionStatus::Primitive {
        f |= 0x02;
    }
    f
}

/// Borrowed, id-sorted view over a packed `Concepts` buffer.
pub struct ConceptsReader<'a> {
    buf: &'a [u8],
}

impl<'a> ConceptsReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the record at byte `offset`.
    pub fn get(&self, offset: u32) -> Result<ConceptRecord, SegmentError> {
        check_alignment(offset, STRIDE)?;
        check_bounds(self.buf, offset, STRIDE)?;
        let at = offset as usize;
        Ok(ConceptRecord {
            id: read_u64(self.buf, at),
            module_ref: read_u32(self.buf, at + 8),
            parents_ref: read_u32(self.buf, at + 12),
            children_ref: read_u32(self.buf, at + 16),
            closure_ref: read_u32(self.buf, at + 20),
            outbound_relationships_ref: read_u32(self.buf, at + 24),
            inbound_relationships_ref: read_u32(self.buf, at + 28),
            descriptions_ref: read_u32(self.buf, at + 32),
            description_count: read_u16(self.buf, at + 36),
            refsets_ref: read_u32(self.buf, at + 38),
            fsn_ref: read_u32(self.buf, at + 42),
            effective_time: read_u32(self.buf, at + 46),
            flags: read_u8(self.buf, at + 50),
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

    fn id_at(&self, i: usize) -> u64 {
        read_u64(self.buf, i * STRIDE)
    }

    /// Binary searches for `id`, returning its byte offset in this segment.
    pub fn find(&self, id: u64) -> Option<u32> {
        let n = self.len();
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.id_at(mid).cmp(&id) {
                std::cmp::Ordering::Equal => return Some((mid * STRIDE) as u32),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Iterates every record in id order, for callers (full-table scans,
    /// text search) that have no offset to start from.
    pub fn iter(&self) -> impl Iterator<Item = ConceptRecord> + '_ {
        (0..self.len()).map(move |i| {
            self.get((i * STRIDE) as u32)
                .expect("index within len() is always in bounds and aligned")
        })
    }
}

/// Append-only builder for a `Concepts` segment. Callers must append in
/// ascending id order for `find` to behave.
#[derive(Default)]
pub struct ConceptsWriter {
    buf: Vec<u8>,
}

impl ConceptsWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its offset.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        id: u64,
        module_ref: u32,
        parents_ref: u32,
        children_ref: u32,
        closure_ref: u32,
        outbound_relationships_ref: u32,
        inbound_relationships_ref: u32,
        descriptions_ref: u32,
        description_count: u16,
        refsets_ref: u32,
        fsn_ref: u32,
        effective_time: u32,
        active: bool,
        definition_status: DefinitionStatus,
    ) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&id.to_le_bytes());
        self.buf.extend_from_slice(&module_ref.to_le_bytes());
        self.buf.extend_from_slice(&parents_ref.to_le_bytes());
        self.buf.extend_from_slice(&children_ref.to_le_bytes());
        self.buf.extend_from_slice(&closure_ref.to_le_bytes());
        self.buf
            .extend_from_slice(&outbound_relationships_ref.to_le_bytes());
        self.buf
            .extend_from_slice(&inbound_relationships_ref.to_le_bytes());
        self.buf.extend_from_slice(&descriptions_ref.to_le_bytes());
        self.buf.extend_from_slice(&description_count.to_le_bytes());
        self.buf.extend_from_slice(&refsets_ref.to_le_bytes());
        self.buf.extend_from_slice(&fsn_ref.to_le_bytes());
        self.buf.extend_from_slice(&effective_time.to_le_bytes());
        self.buf.push(flags_byte(active, definition_status));
        self.buf.extend_from_slice(&[0u8; 5]); // reserved, pads to 56 bytes
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
    fn round_trips_and_finds_by_id() {
        let mut w = ConceptsWriter::new();
        w.add(
            138875005,
            0,
            NO_REF,
            100,
            NO_REF,
            NO_REF,
            NO_REF,
            0,
            0,
            NO_REF,
            NO_REF,
            20020131,
            true,
            DefinitionStatus::Primitive,
        );
        let off2 = w.add(
            404684003,
            0,
            200,
            NO_REF,
            NO_REF,
            NO_REF,
            NO_REF,
            0,
            0,
            NO_REF,
            NO_REF,
            20020131,
            true,
            DefinitionStatus::FullyDefined,
        );
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 2 * STRIDE);

        let r = ConceptsReader::new(&bytes);
        let found = r.find(404684003).unwrap();
        assert_eq!(found, off2);
        let rec = r.get(found).unwrap();
        assert!(rec.is_active());
        assert!(!rec.is_primitive());
        assert_eq!(rec.parents_ref, 200);
        assert!(r.find(999).is_none());
    }
}
