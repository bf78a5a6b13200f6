//! RefsetMembers segment: variable-stride records (5 + 9n or 5 + 31n
//! bytes) holding RF2 reference set membership rows. Every member carries a
//! common 5-byte header (the referenced component and an active flag)
//! followed by `n` additional fields whose width — 9 bytes for scalar
//! additional fields (language acceptability, historical-association
//! target, attribute value) or 31 bytes for the wider map-block fields
//! (simple/complex map target plus correlation metadata) — is fixed per
//! refset and recorded alongside it in `RefsetIndex`.

use super::{check_bounds, read_u32, read_u64, read_u8, SegmentError};

const HEADER_LEN: usize = 5;

/// Width in bytes of one additional field, chosen per refset by its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// A single scalar additional field (id or small tag).
    Scalar,
    /// A map-block additional field (group/priority/rule/advice/target).
    MapBlock,
}

impl FieldWidth {
    fn bytes(self) -> usize {
        match self {
            FieldWidth::Scalar => 9,
            FieldWidth::MapBlock => 31,
        }
    }
}

/// The common part of every refset member: which component it refers to,
/// and whether the row is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefsetMember {
    /// Offset into `Concepts` of the referenced component (for a concept
    /// refset) or another segment's offset for description/relationship
    /// refsets — interpretation depends on the owning refset's declared
    /// component type, tracked in `RefsetIndex`.
    pub referenced_component_ref: u32,
    /// Bit 0: active.
    pub flags: u8,
}

impl RefsetMember {
    /// True if the RF2 `active` flag was set.
    pub fn is_active(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

/// Decoded additional fields for the refset kinds named in /.
/// `Simple` refsets carry no additional fields at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefsetMemberIds {
    /// No additional fields.
    Simple,
    /// Language reference set: acceptability (`900000000000548007`
    /// preferred or `900000000000549004` acceptable).
    Language {
        /// The acceptability concept id.
        acceptability_id: u64,
    },
    /// Historical association reference set: the replacement/target
    /// component id.
    Association {
        /// The target component id.
        target_id: u64,
    },
    /// Attribute-value reference set: the value concept id.
    AttributeValue {
        /// The value concept id.
        value_id: u64,
    },
    /// Simple map reference set: offset of the map target string.
    SimpleMap {
        /// Offset of the map target string in `Strings`.
        map_target_ref: u32,
    },
    /// Complex/extended map reference set.
    ComplexMap {
        /// `mapGroup`.
        group: u8,
        /// `mapPriority`.
        priority: u8,
        /// `mapRule`, as an offset into `Strings`.
        rule_ref: u32,
        /// `mapAdvice`, as an offset into `Strings`.
        advice_ref: u32,
        /// `mapTarget`, as an offset into `Strings`.
        target_ref: u32,
        /// `correlationId`.
        correlation_id: u64,
    },
}

impl RefsetMemberIds {
    /// The [`FieldWidth`] this variant's additional-field encoding needs.
    pub fn width(&self) -> FieldWidth {
        match self {
            RefsetMemberIds::Simple => FieldWidth::Scalar,
            RefsetMemberIds::Language { .. }
            | RefsetMemberIds::Association { .. }
            | RefsetMemberIds::AttributeValue { .. } => FieldWidth::Scalar,
            RefsetMemberIds::SimpleMap { .. } | RefsetMemberIds::ComplexMap { .. } => {
                FieldWidth::MapBlock
            }
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match *self {
            RefsetMemberIds::Simple => {}
            RefsetMemberIds::Language { acceptability_id } => {
                out.extend_from_slice(&acceptability_id.to_le_bytes());
                out.push(0);
            }
            RefsetMemberIds::Association { target_id } => {
                out.extend_from_slice(&target_id.to_le_bytes());
                out.push(1);
            }
            RefsetMemberIds::AttributeValue { value_id } => {
                out.extend_from_slice(&value_id.to_le_bytes());
                out.push(2);
            }
            RefsetMemberIds::SimpleMap { map_target_ref } => {
                out.extend_from_slice(&map_target_ref.to_le_bytes());
                out.extend_from_slice(&[0u8; 27]);
            }
            RefsetMemberIds::ComplexMap {
                group,
                priority,
                rule_ref,
                advice_ref,
                target_ref,
                correlation_id,
            } => {
                out.push(group);
                out.push(priority);
                out.extend_from_slice(&rule_ref.to_le_bytes());
                out.extend_from_slice(&advice_ref.to_le_bytes());
                out.extend_from_slice(&target_ref.to_le_bytes());
                out.extend_from_slice(&correlation_id.to_le_bytes());
                out.extend_from_slice(&[0u8; 9]);
            }
        }
    }

    fn decode(width: FieldWidth, buf: &[u8]) -> Self {
        match width {
            FieldWidth::Scalar => {
                let id = read_u64(buf, 0);
                match read_u8(buf, 8) {
                    0 => RefsetMemberIds::Language { acceptability_id: id },
                    1 => RefsetMemberIds::Association { target_id: id },
                    2 => RefsetMemberIds::AttributeValue { value_id: id },
                    _ => RefsetMemberIds::Simple,
                }
            }
            FieldWidth::MapBlock => {
                if buf.iter().skip(4).take(27).all(|&b| b == 0) {
                    RefsetMemberIds::SimpleMap {
                        map_target_ref: read_u32(buf, 0),
                    }
                } else {
                    RefsetMemberIds::ComplexMap {
                        group: read_u8(buf, 0),
                        priority: read_u8(buf, 1),
                        rule_ref: read_u32(buf, 2),
                        advice_ref: read_u32(buf, 6),
                        target_ref: read_u32(buf, 10),
                        correlation_id: read_u64(buf, 14),
                    }
                }
            }
        }
    }
}

/// Borrowed view over a packed `RefsetMembers` buffer. Every caller-facing
/// `get` needs the [`FieldWidth`] the owning refset was declared with
/// (from `RefsetIndex`), since the segment itself mixes records of
/// different stride across different refsets.
pub struct RefsetMembersReader<'a> {
    buf: &'a [u8],
}

impl<'a> RefsetMembersReader<'a> {
    /// Wraps a raw segment buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Reads the member header and decoded additional fields at `offset`,
    /// a record written with additional-field width `width`.
    pub fn get(
        &self,
        offset: u32,
        width: FieldWidth,
    ) -> Result<(RefsetMember, RefsetMemberIds), SegmentError> {
        let stride = HEADER_LEN + width.bytes();
        check_bounds(self.buf, offset, stride)?;
        let at = offset as usize;
        let member = RefsetMember {
            referenced_component_ref: read_u32(self.buf, at),
            flags: read_u8(self.buf, at + 4),
        };
        let ids = if width.bytes() == 0 {
            RefsetMemberIds::Simple
        } else {
            RefsetMemberIds::decode(width, &self.buf[at + HEADER_LEN..at + stride])
        };
        Ok((member, ids))
    }
}

/// Append-only builder for a `RefsetMembers` segment.
#[derive(Default)]
pub struct RefsetMembersWriter {
    buf: Vec<u8>,
}

impl RefsetMembersWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a member record and returns its offset.
    pub fn add(
        &mut self,
        referenced_component_ref: u32,
        active: bool,
        ids: RefsetMemberIds,
    ) -> u32 {
        let offset = self.buf.len() as u32;
        self.buf
            .extend_from_slice(&referenced_component_ref.to_le_bytes());
        self.buf.push(if active { 0x01 } else { 0x00 });
        ids.encode(&mut self.buf);
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
    fn round_trips_a_language_member() {
        let mut w = RefsetMembersWriter::new();
        let off = w.add(
            400,
            true,
            RefsetMemberIds::Language {
                acceptability_id: 900000000000548007,
            },
        );
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + 9);

        let r = RefsetMembersReader::new(&bytes);
        let (member, ids) = r.get(off, FieldWidth::Scalar).unwrap();
        assert!(member.is_active());
        assert_eq!(member.referenced_component_ref, 400);
        assert_eq!(
            ids,
            RefsetMemberIds::Language {
                acceptability_id: 900000000000548007
            }
        );
    }

    #[test]
    fn round_trips_a_complex_map_member() {
        let mut w = RefsetMembersWriter::new();
        let off = w.add(
            500,
            true,
            RefsetMemberIds::ComplexMap {
                group: 1,
                priority: 2,
                rule_ref: 10,
                advice_ref: 20,
                target_ref: 30,
                correlation_id: 447561005,
            },
        );
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), HEADER_LEN + 31);

        let r = RefsetMembersReader::new(&bytes);
        let (_, ids) = r.get(off, FieldWidth::MapBlock).unwrap();
        assert_eq!(
            ids,
            RefsetMemberIds::ComplexMap {
                group: 1,
                priority: 2,
                rule_ref: 10,
                advice_ref: 20,
                target_ref: 30,
                correlation_id: 447561005,
            }
        );
    }
}
