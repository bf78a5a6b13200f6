//! Descriptions segment: one fixed-stride record (40 bytes) per RF2
//! description. Holds every field needed to render a description without a
//! further segment hop except the term text itself and its stem fan-out,
//! both reached via `Strings`/`Stems` offsets.

use super::{check_alignment, check_bounds, read_u16, read_u32, read_u64, read_u8, SegmentError};
use crate::enums::{CaseSignificance, DescriptionType};

const STRIDE: usize = 40;

/// A single description record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionRecord {
    /// The RF2 description identifier.
    pub id: u64,
    /// Offset of the concept this description belongs to, in `Concepts`.
    pub concept_ref: u32,
    /// Offset of the owning module concept, in `Concepts`.
    pub module_ref: u32,
    /// Offset of the description's term text, in `Strings`.
    pub term_ref: u32,
    /// Offset of the term's stem, in `Stems`, or [`super::NO_REF`] for
    /// descriptions excluded from text search (inactive, non-synonym).
    pub stem_ref: u32,
    /// RF2 `effectiveTime`, encoded `YYYYMMDD` as in the source file.
    pub effective_time: u32,
    /// 2-letter ISO 639-1 language code, packed into a `u16`.
    pub language_code: [u8; 2],
    /// RF2 `typeId` resolved to the enum.
    pub description_type: DescriptionType,
    /// RF2 `caseSignificanceId` resolved to the enum.
    pub case_significance: CaseSignificance,
    /// Bit 0: active. The remaining bits are reserved.
    pub flags: u8,
}

impl DescriptionRecord {
    /// True if the RF2 `active` flag was set.
    pub fn is_active(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// The language code as a `&str`, e.g. `"en"`.
    pub fn language(&self) -> &str {
        // Both bytes are always ASCII (ISO 639-1); this cannot fail for
        // data produced by this crate's writer.
        std::str::from_utf8(&self.language_code).unwrap_or("??")
    }
}

fn flags_byte(active: bool) -> u8 {
    if active {
        0x01
    } else {
        0x00
    }
}

/// Borrowed view over a packed `Descriptions` buffer, sorted by `id`.
pub struct DescriptionsReader<'a> {
    buf: &'a [u8],
}

impl<'a> DescriptionsReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the record at `offset`.
    pub fn get(&self, offset: u32) -> Result<DescriptionRecord, SegmentError> {
        check_alignment(offset, STRIDE)?;
        check_bounds(self.buf, offset, STRIDE)?;
        let at = offset as usize;
        Ok(DescriptionRecord {
            id: read_u64(self.buf, at),
            concept_ref: read_u32(self.buf, at + 8),
            module_ref: read_u32(self.buf, at + 12),
            term_ref: read_u32(self.buf, at + 16),
            stem_ref: read_u32(self.buf, at + 20),
            effective_time: read_u32(self.buf, at + 24),
            language_code: [read_u8(self.buf, at + 28), read_u8(self.buf, at + 29)],
            description_type: DescriptionType::from_id(read_u16(self.buf, at + 30) as u64)
                .unwrap_or(DescriptionType::Synonym),
            case_significance: CaseSignificance::from_id(read_u16(self.buf, at + 32) as u64)
                .unwrap_or(CaseSignificance::CaseInsensitive),
            flags: read_u8(self.buf, at + 34),
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

/// Append-only builder for a `Descriptions` segment. Callers must append in
/// ascending `id` order; the store's binary search over `DescriptionIndex`
/// assumes it.
#[derive(Default)]
pub struct DescriptionsWriter {
    buf: Vec<u8>,
}

impl DescriptionsWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its offset.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        id: u64,
        concept_ref: u32,
        module_ref: u32,
        term_ref: u32,
        stem_ref: u32,
        effective_time: u32,
        language_code: [u8; 2],
        description_type: DescriptionType,
        case_significance: CaseSignificance,
        active: bool,
    ) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(&id.to_le_bytes());
        self.buf.extend_from_slice(&concept_ref.to_le_bytes());
        self.buf.extend_from_slice(&module_ref.to_le_bytes());
        self.buf.extend_from_slice(&term_ref.to_le_bytes());
        self.buf.extend_from_slice(&stem_ref.to_le_bytes());
        self.buf.extend_from_slice(&effective_time.to_le_bytes());
        self.buf.extend_from_slice(&language_code);
        self.buf
            .extend_from_slice(&(description_type.to_id() as u16).to_le_bytes());
        self.buf
            .extend_from_slice(&(case_significance.to_id() as u16).to_le_bytes());
        self.buf.push(flags_byte(active));
        self.buf.extend_from_slice(&[0u8; 5]); // reserved, pads to 40 bytes
        offset
    }

    /// Consumes the writer, producing the finished segment buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
