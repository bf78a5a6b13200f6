//! RefsetIndex segment: one record per reference set (not per member),
//! either 28 bytes for a standard refset or 32 bytes for a map refset
//! — map refsets carry one extra `u32` naming the map version
//! string, standard refsets don't.

use super::{check_bounds, read_u32, read_u64, read_u8, SegmentError};

/// Distinguishes the two `RefsetIndex` record widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefsetIndexKind {
    /// 28-byte record: simple, language, association, attribute-value.
    Standard,
    /// 32-byte record: simple map, complex map, extended map.
    Map,
}

impl RefsetIndexKind {
    fn stride(self) -> usize {
        match self {
            RefsetIndexKind::Standard => 28,
            RefsetIndexKind::Map => 32,
        }
    }
}

/// A single reference set descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefsetIndexRecord {
    /// The refset's own concept id.
    pub refset_id: u64,
    /// Offset of the owning module concept, in `Concepts`.
    pub module_ref: u32,
    /// Offset into `References` of this refset's member offsets (each
    /// pointing into `RefsetMembers`).
    pub members_ref: u32,
    /// Number of members, cached so callers don't need to resolve
    /// `members_ref` just to report a count.
    pub member_count: u32,
    /// Additional-field width members of this refset were written with.
    pub field_width: super::FieldWidth,
    /// RF2 `effectiveTime` of the refset's own descriptor row.
    pub effective_time: u32,
    /// Offset of the map version string in `Strings`, map refsets only.
    pub map_version_ref: Option<u32>,
}

/// Borrowed view over a packed `RefsetIndex` buffer. All records in a given
/// buffer share a [`RefsetIndexKind`]; a store holding both widths keeps
/// two separate buffers (mirrors how `snomed-types::segments` treats every
/// other variable-shape segment).
pub struct RefsetIndexReader<'a> {
    buf: &'a [u8],
    kind: RefsetIndexKind,
}

impl<'a> RefsetIndexReader<'a> {
    /// Wraps a raw segment buffer of the given kind.
    pub fn new(buf: &'a [u8], kind: RefsetIndexKind) -> Self {
        Self { buf, kind }
    }

    /// Number of records in the segment.
    pub fn len(&self) -> usize {
        self.buf.len() / self.kind.stride()
    }

    /// True if the segment holds no records.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Reads the record at `offset`.
    pub fn get(&self, offset: u32) -> Result<RefsetIndexRecord, SegmentError> {
        let stride = self.kind.stride();
        check_bounds(self.buf, offset, stride)?;
        let at = offset as usize;
        let width = match read_u8(self.buf, at + 24) {
            0 => super::FieldWidth::Scalar,
            _ => super::FieldWidth::MapBlock,
        };
        Ok(RefsetIndexRecord {
            refset_id: read_u64(self.buf, at),
            module_ref: read_u32(self.buf, at + 8),
            members_ref: read_u32(self.buf, at + 12),
            member_count: read_u32(self.buf, at + 16),
            field_width: width,
            effective_time: read_u32(self.buf, at + 20),
            map_version_ref: match self.kind {
                RefsetIndexKind::Standard => None,
                RefsetIndexKind::Map => Some(read_u32(self.buf, at + 28)),
            },
        })
    }

    /// Linear scan for the descriptor of `refset_id`. `RefsetIndex` is
    /// small (one row per refset, not per member) so this doesn't need a
    /// binary search the way `Concepts`/`Descriptions` do.
    pub fn find(&self, refset_id: u64) -> Option<RefsetIndexRecord> {
        let stride = self.kind.stride();
        (0..self.len())
            .map(|i| (i * stride) as u32)
            .find_map(|off| {
                let rec = self.get(off).ok()?;
                (rec.refset_id == refset_id).then_some(rec)
            })
    }
}

/// Append-only builder for a `RefsetIndex` segment of a single
/// [`RefsetIndexKind`].
pub struct RefsetIndexWriter {
    buf: Vec<u8>,
    kind: RefsetIndexKind,
}

impl RefsetIndexWriter {
    /// Creates an empty writer for the given record kind.
    pub fn new(kind: RefsetIndexKind) -> Self {
        Self {
            buf: Vec::new(),
            kind,
        }
    }

    /// Appends a record and returns its offset. `map_version_ref` is
    /// ignored for [`RefsetIndexKind::Standard`] writers.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        refset_id: u64,
        module_ref: u32,
        members_ref: u32,
        member_count: u32,
        field_width: super::FieldWidth,
        effective_time: u32,
        map_version_ref: Option<u32>,
    ) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&refset_id.to_le_bytes());
        self.buf.extend_from_slice(&module_ref.to_le_bytes());
        self.buf.extend_from_slice(&members_ref.to_le_bytes());
        self.buf.extend_from_slice(&member_count.to_le_bytes());
        self.buf.extend_from_slice(&effective_time.to_le_bytes());
        self.buf.push(match field_width {
            super::FieldWidth::Scalar => 0,
            super::FieldWidth::MapBlock => 1,
        });
        self.buf.extend_from_slice(&[0u8; 3]); // reserved, pads to 28 bytes
        if self.kind == RefsetIndexKind::Map {
            self.buf
                .extend_from_slice(&map_version_ref.unwrap_or(super::NO_REF).to_le_bytes());
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
    use crate::segments::FieldWidth;

    #[test]
    fn round_trips_a_standard_record() {
        let mut w = RefsetIndexWriter::new(RefsetIndexKind::Standard);
        let off = w.add(900000000000509007, 0, 100, 3, FieldWidth::Scalar, 20020131, None);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 28);

        let r = RefsetIndexReader::new(&bytes, RefsetIndexKind::Standard);
        let rec = r.get(off).unwrap();
        assert_eq!(rec.refset_id, 900000000000509007);
        assert_eq!(rec.member_count, 3);
        assert!(rec.map_version_ref.is_none());
        assert_eq!(r.find(900000000000509007).unwrap().members_ref, 100);
    }

    #[test]
    fn round_trips_a_map_record() {
        let mut w = RefsetIndexWriter::new(RefsetIndexKind::Map);
        let off = w.add(447562003, 0, 200, 5, FieldWidth::MapBlock, 20020131, Some(42));
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 32);

        let r = RefsetIndexReader::new(&bytes, RefsetIndexKind::Map);
        let rec = r.get(off).unwrap();
        assert_eq!(rec.map_version_ref, Some(42));
    }
}
