//! Relationships segment: one fixed-stride record (40 bytes) per RF2
//! relationship (stated or inferred; which is recorded in
//! `characteristic_type`, not by separate segments).

use super::{check_alignment, check_bounds, read_u32, read_u64, read_u8, SegmentError};
use crate::enums::{CharacteristicType, ModifierType};

const STRIDE: usize = 40;

/// A single relationship record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipRecord {
    /// The RF2 relationship identifier.
    pub id: u64,
    /// Offset of the source concept, in `Concepts`.
    pub source_ref: u32,
    /// Offset of the destination concept, in `Concepts`.
    pub destination_ref: u32,
    /// Offset of the relationship type concept, in `Concepts`.
    pub type_ref: u32,
    /// Offset of the owning module concept, in `Concepts`.
    pub module_ref: u32,
    /// RF2 `relationshipGroup`. `0` means ungrouped.
    pub group: u8,
    /// RF2 `characteristicTypeId`, resolved to the enum.
    pub characteristic_type: CharacteristicType,
    /// RF2 `modifierId`, resolved to the enum.
    pub modifier: ModifierType,
    /// RF2 `effectiveTime`.
    pub effective_time: u32,
    /// Bit 0: active.
    pub flags: u8,
}

impl RelationshipRecord {
    /// True if the RF2 `active` flag was set.
    pub fn is_active(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// True if `characteristic_type` is `Stated`.
    pub fn is_stated(&self) -> bool {
        self.characteristic_type == CharacteristicType::Stated
    }

    /// True if `characteristic_type` is `Inferred`.
    pub fn is_inferred(&self) -> bool {
        self.characteristic_type == CharacteristicType::Inferred
    }

    /// True unless `characteristic_type` is `Additional` — additional
    /// relationships restate inferred/stated ones for a different purpose
    /// and never participate in the defining hierarchy.
    pub fn is_defining(&self) -> bool {
        self.characteristic_type != CharacteristicType::Additional
    }
}

fn flags_byte(active: bool) -> u8 {
    if active {
        0x01
    } else {
        0x00
    }
}

/// Borrowed view over a packed `Relationships` buffer.
pub struct RelationshipsReader<'a> {
    buf: &'a [u8],
}

impl<'a> RelationshipsReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the record at `offset`.
    pub fn get(&self, offset: u32) -> Result<RelationshipRecord, SegmentError> {
        check_alignment(offset, STRIDE)?;
        check_bounds(self.buf, offset, STRIDE)?;
        let at = offset as usize;
        Ok(RelationshipRecord {
            id: read_u64(self.buf, at),
            source_ref: super::read_u32(self.buf, at + 8),
            destination_ref: super::read_u32(self.buf, at + 12),
            type_ref: super::read_u32(self.buf, at + 16),
            module_ref: super::read_u32(self.buf, at + 20),
            group: read_u8(self.buf, at + 24),
            characteristic_type: CharacteristicType::from_id(read_u8(self.buf, at + 25) as u64)
                .unwrap_or(CharacteristicType::Inferred),
            modifier: ModifierType::from_id(read_u8(self.buf, at + 26) as u64)
                .unwrap_or(ModifierType::Existential),
            effective_time: super::read_u32(self.buf, at + 28),
            flags: read_u8(self.buf, at + 32),
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

/// Append-only builder for a `Relationships` segment.
#[derive(Default)]
pub struct RelationshipsWriter {
    buf: Vec<u8>,
}

impl RelationshipsWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its offset.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        id: u64,
        source_ref: u32,
        destination_ref: u32,
        type_ref: u32,
        module_ref: u32,
        group: u8,
        characteristic_type: CharacteristicType,
        modifier: ModifierType,
        effective_time: u32,
        active: bool,
    ) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&id.to_le_bytes());
        self.buf.extend_from_slice(&source_ref.to_le_bytes());
        self.buf.extend_from_slice(&destination_ref.to_le_bytes());
        self.buf.extend_from_slice(&type_ref.to_le_bytes());
        self.buf.extend_from_slice(&module_ref.to_le_bytes());
        self.buf.push(group);
        self.buf.push(characteristic_type.to_id() as u8);
        self.buf.push(modifier.to_id() as u8);
        self.buf.extend_from_slice(&effective_time.to_le_bytes());
        self.buf.push(flags_byte(active));
        self.buf.extend_from_slice(&[0u8; 8]); // reserved, pads to 40 bytes
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
    fn round_trips_a_record() {
        let mut w = RelationshipsWriter::new();
        let off = w.add(
            1,
            8,
            16,
            24,
            0,
            1,
            CharacteristicType::Inferred,
            ModifierType::Existential,
            20020131,
            true,
        );
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), STRIDE);

        let r = RelationshipsReader::new(&bytes);
        let rec = r.get(off).unwrap();
        assert_eq!(rec.source_ref, 8);
        assert_eq!(rec.destination_ref, 16);
        assert!(rec.is_active());
        assert!(rec.is_inferred());
        assert!(!rec.is_stated());
    }
}
