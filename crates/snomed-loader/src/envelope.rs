//! Binary container envelope and the segment-backed services built
//! straight over it.
//!
//! This is the second loading path alongside [`crate::loader`]'s RF2-CSV
//! discovery: instead of parsing `sct2_*.txt` release files into a
//! `HashMap`-based [`crate::SnomedStore`], [`parse_container`] reads the
//! packed binary cache format and hands back a [`SnomedContainer`] that
//! answers every SNOMED service query (`isActive`, `subsumes`, `parents`,
//! `children`, `displayName`) by binary-searching `snomed_types::segments`
//! buffers it owns — no intermediate concept graph, no RF2 column parsing.

use std::io::Read;

use std::collections::{HashSet, VecDeque};

use snomed_types::segments::{
    ConceptRecord, ConceptsReader, DescriptionIndexReader, DescriptionsReader, ReferencesReader,
    RefsetIndexKind, RefsetIndexReader, RefsetMembersReader, RelationshipsReader, StringsReader,
    NO_REF,
};
use snomed_types::{CharacteristicType, SctId};

use crate::error::{TerminologyError, TerminologyResult};
use crate::services::{FilterCriterion, FilterResult, SearchPriority, SnomedServices};

/// Cache-format version named in the container header. "17" adds a
/// per-refset `langs:u32` column that "16" does not carry; this loader
/// records which version produced the container but otherwise reads both
/// identically, since the `langs` column lives inside `RefsetIndex` and
/// isn't needed by any operation this crate exposes yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVersion {
    /// Cache version "16".
    V16,
    /// Cache version "17": adds a per-refset `langs:u32` column.
    V17,
}

impl CacheVersion {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "16" => Some(Self::V16),
            "17" => Some(Self::V17),
            _ => None,
        }
    }
}

/// Errors raised while decoding the envelope itself, before any segment
/// reader gets a chance to run. Wrapped into [`TerminologyError::StoreCorrupt`]
/// at the loader boundary so callers only see one error type per store kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// Ran out of bytes decoding a fixed-size field.
    #[error("unexpected end of container data: wanted {wanted} bytes, had {available}")]
    Truncated {
        /// Bytes the decoder needed.
        wanted: usize,
        /// Bytes actually remaining.
        available: usize,
    },
    /// The header's cache-version string did not match a known version.
    #[error("unrecognised cache version {found:?}")]
    UnknownCacheVersion {
        /// The string actually read from the header.
        found: String,
    },
    /// A tagged string header carried a type tag other than 6
    /// (u8-length string) — this loader only implements the one tag the
    /// header fields are documented to use.
    #[error("string header carried type tag {tag}, expected 6 (u8-length string)")]
    UnexpectedStringTag {
        /// The tag byte actually read.
        tag: u8,
    },
    /// A tagged string's bytes were not valid UTF-8.
    #[error("string header is not valid UTF-8")]
    InvalidUtf8,
}

type ContainerResult<T> = Result<T, ContainerError>;

/// A cursor over the raw container bytes. Every read advances the cursor
/// and fails with [`ContainerError::Truncated`] rather than panicking —
/// a corrupt or partial container is an ordinary I/O-adjacent failure,
/// not a programmer bug.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> ContainerResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(ContainerError::Truncated {
                wanted: n,
                available: self.buf.len().saturating_sub(self.pos),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> ContainerResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> ContainerResult<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> ContainerResult<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Reads a type-6 tagged string: one tag byte (must be `6`), one
    /// length byte, then that many UTF-8 bytes.
    fn read_tagged_string(&mut self) -> ContainerResult<String> {
        let tag = self.read_u8()?;
        if tag != 6 {
            return Err(ContainerError::UnexpectedStringTag { tag });
        }
        let len = self.read_u8()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ContainerError::InvalidUtf8)
    }

    /// Reads one `i32 length, bytes[length]` segment.
    fn read_segment(&mut self) -> ContainerResult<Vec<u8>> {
        let len = self.read_i32()?.max(0) as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads an `i32 count, u64[count]` root list.
    fn read_root_list(&mut self) -> ContainerResult<Vec<u64>> {
        let count = self.read_i32()?.max(0) as usize;
        (0..count).map(|_| self.read_u64()).collect()
    }
}

/// A loaded binary SNOMED CT container: ten owned segment buffers plus the
/// header/trailer metadata, answering service queries directly off them.
#[derive(Debug)]
pub struct SnomedContainer {
    cache_version: CacheVersion,
    version_uri: String,
    version_date: String,
    edition: Option<String>,
    version: Option<String>,
    is_testing: bool,

    strings: Vec<u8>,
    refs: Vec<u8>,
    descriptions: Vec<u8>,
    concepts: Vec<u8>,
    relationships: Vec<u8>,
    refset_index: Vec<u8>,
    refset_members: Vec<u8>,
    description_index: Vec<u8>,

    is_a_index: i32,
    inactive_roots: Vec<u64>,
    active_roots: Vec<u64>,
    default_language: i32,
}

/// Parses a version URI's path into `(edition, version)` per §6.1: edition
/// is the 5th path segment, version the 7th. Either is `None` if the URI
/// doesn't have enough segments — a loose container (tests, fixtures)
/// isn't corrupt for lacking them.
fn parse_version_uri(uri: &str) -> (Option<String>, Option<String>) {
    // Not filtered: "http://host/..." splits to ["http:", "", "host", ...],
    // which is what makes "5th segment" land on the edition rather than
    // the scheme — this mirrors how the URI is actually laid out.
    let segments: Vec<&str> = uri.split('/').collect();
    let edition = segments.get(4).map(|s| s.to_string());
    let version = segments.get(6).map(|s| s.to_string());
    (edition, version)
}

/// Parses a complete container envelope from an in-memory buffer.
pub fn parse_container(data: &[u8]) -> TerminologyResult<SnomedContainer> {
    let mut cur = Cursor::new(data);
    parse_from_cursor(&mut cur).map_err(|e| TerminologyError::StoreCorrupt {
        detail: e.to_string(),
    })
}

/// Parses a complete container envelope, reading it from `reader` first.
pub fn load_container<R: Read>(mut reader: R) -> TerminologyResult<SnomedContainer> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| TerminologyError::StoreCorrupt {
            detail: format!("failed to read container: {e}"),
        })?;
    parse_container(&data)
}

fn parse_from_cursor(cur: &mut Cursor<'_>) -> ContainerResult<SnomedContainer> {
    let cache_version_tag = cur.read_tagged_string()?;
    let cache_version = CacheVersion::parse(&cache_version_tag).ok_or_else(|| {
        ContainerError::UnknownCacheVersion {
            found: cache_version_tag,
        }
    })?;
    let version_uri = cur.read_tagged_string()?;
    let version_date = cur.read_tagged_string()?;

    let strings = cur.read_segment()?;
    let refs = cur.read_segment()?;
    let descriptions = cur.read_segment()?;
    let _words = cur.read_segment()?;
    let _stems = cur.read_segment()?;
    let concepts = cur.read_segment()?;
    let relationships = cur.read_segment()?;
    let refset_index = cur.read_segment()?;
    let refset_members = cur.read_segment()?;
    let description_index = cur.read_segment()?;

    eprintln!("before is_a_index pos={} len={}", cur.pos, cur.buf.len());
    let is_a_index = cur.read_i32()?;
    eprintln!("before inactive_roots pos={}", cur.pos);
    let inactive_roots = cur.read_root_list()?;
    eprintln!("before active_roots pos={} inactive={:?}", cur.pos, inactive_roots);
    let active_roots = cur.read_root_list()?;
    eprintln!("after active_roots pos={} active={:?}", cur.pos, active_roots);
    let default_language = cur.read_i32()?;

    let (edition, version) = parse_version_uri(&version_uri);
    let is_testing = version_uri.contains("/xsct/");

    let c = SnomedContainer {
        cache_version,
        version_uri,
        version_date,
        edition,
        version,
        is_testing,
        strings,
        refs,
        descriptions,
        concepts,
        relationships,
        refset_index,
        refset_members,
        description_index,
        is_a_index,
        inactive_roots,
        active_roots,
        default_language,
    };
    eprintln!("constructed active_roots={:?} accessor={:?}", c.active_roots, c.active_roots());
    Ok(c)
}

fn corrupt<E: std::fmt::Display>(e: E) -> TerminologyError {
    TerminologyError::StoreCorrupt {
        detail: e.to_string(),
    }
}

impl SnomedContainer {
    /// The header's cache-format version.
    pub fn cache_version(&self) -> CacheVersion {
        self.cache_version
    }

    /// The raw version URI from the header.
    pub fn version_uri(&self) -> &str {
        &self.version_uri
    }

    /// The header's version date string, unparsed.
    pub fn version_date(&self) -> &str {
        &self.version_date
    }

    /// The 5th path segment of [`Self::version_uri`], if present.
    pub fn edition(&self) -> Option<&str> {
        self.edition.as_deref()
    }

    /// The 7th path segment of [`Self::version_uri`], if present.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// True if [`Self::version_uri`]'s path contains `/xsct/`.
    pub fn is_testing(&self) -> bool {
        self.is_testing
    }

    /// Top-level concept ids recorded as inactive roots.
    pub fn inactive_roots(&self) -> &[u64] {
        &self.inactive_roots
    }

    /// Top-level concept ids recorded as active roots.
    pub fn active_roots(&self) -> &[u64] {
        &self.active_roots
    }

    /// The default language tag recorded in the trailer.
    pub fn default_language(&self) -> i32 {
        self.default_language
    }

    fn concepts_reader(&self) -> ConceptsReader<'_> {
        ConceptsReader::new(&self.concepts)
    }

    fn references_reader(&self) -> ReferencesReader<'_> {
        ReferencesReader::new(&self.refs)
    }

    fn descriptions_reader(&self) -> DescriptionsReader<'_> {
        DescriptionsReader::new(&self.descriptions)
    }

    fn description_index_reader(&self) -> DescriptionIndexReader<'_> {
        DescriptionIndexReader::new(&self.description_index)
    }

    fn relationships_reader(&self) -> RelationshipsReader<'_> {
        RelationshipsReader::new(&self.relationships)
    }

    fn strings_reader(&self) -> StringsReader<'_> {
        StringsReader::new(&self.strings)
    }

    /// The whole `RefsetIndex` blob is decoded as [`RefsetIndexKind::Standard`]
    /// — the envelope carries one undifferentiated segment per §6.1, while
    /// `RefsetIndex` itself only supports one record width per buffer. Map
    /// refsets (simple/complex/extended map) therefore don't resolve
    /// through this reader yet; see DESIGN.md.
    fn refset_index_reader(&self) -> RefsetIndexReader<'_> {
        RefsetIndexReader::new(&self.refset_index, RefsetIndexKind::Standard)
    }

    fn refset_members_reader(&self) -> RefsetMembersReader<'_> {
        RefsetMembersReader::new(&self.refset_members)
    }

    fn record_at(&self, offset: u32) -> TerminologyResult<ConceptRecord> {
        self.concepts_reader().get(offset).map_err(corrupt)
    }

    fn find(&self, concept_id: SctId) -> Option<u32> {
        self.concepts_reader().find(concept_id)
    }

    /// True if the concept exists and its RF2 `active` flag is set.
    pub fn is_active(&self, concept_id: SctId) -> bool {
        self.find(concept_id)
            .and_then(|off| self.record_at(off).ok())
            .map(|r| r.is_active())
            .unwrap_or(false)
    }

    /// True if the concept exists and is primitively defined.
    pub fn is_primitive(&self, concept_id: SctId) -> TerminologyResult<bool> {
        let off = self
            .find(concept_id)
            .ok_or(TerminologyError::CodeNotFound { code: concept_id })?;
        Ok(self.record_at(off)?.is_primitive())
    }

    /// `ancestor == descendant`, or `ancestor`'s segment offset is a member
    /// of `descendant`'s precomputed, sorted closure array — O(log k)
    /// binary search, never a live traversal.
    pub fn subsumes(&self, ancestor: SctId, descendant: SctId) -> TerminologyResult<bool> {
        let a_off = self
            .find(ancestor)
            .ok_or(TerminologyError::CodeNotFound { code: ancestor })?;
        let d_off = self
            .find(descendant)
            .ok_or(TerminologyError::CodeNotFound { code: descendant })?;
        if a_off == d_off {
            return Ok(true);
        }
        let d_rec = self.record_at(d_off)?;
        if snomed_types::segments::is_absent(d_rec.closure_ref) {
            return Ok(false);
        }
        let closure = self
            .references_reader()
            .get(d_rec.closure_ref)
            .map_err(corrupt)?;
        Ok(closure.binary_search(&a_off).is_ok())
    }

    /// Direct parents, read straight off the concept's stored `parents`
    /// reference — no relationship scan needed.
    pub fn parents(&self, concept_id: SctId) -> Vec<SctId> {
        let Some(off) = self.find(concept_id) else {
            return Vec::new();
        };
        let Ok(rec) = self.record_at(off) else {
            return Vec::new();
        };
        let Ok(parent_offsets) = self.references_reader().get(rec.parents_ref) else {
            return Vec::new();
        };
        parent_offsets
            .into_iter()
            .filter_map(|o| self.record_at(o).ok().map(|r| r.id))
            .collect()
    }

    /// Direct children: inbound relationships of type `isAIndex`, active,
    /// ungrouped, and defining (not `Additional`).
    pub fn children(&self, concept_id: SctId) -> Vec<SctId> {
        let Some(off) = self.find(concept_id) else {
            return Vec::new();
        };
        let Ok(rec) = self.record_at(off) else {
            return Vec::new();
        };
        let Ok(inbound) = self.references_reader().get(rec.inbound_relationships_ref) else {
            return Vec::new();
        };
        let relationships = self.relationships_reader();
        let is_a_ref = self.is_a_index as u32;
        inbound
            .into_iter()
            .filter_map(|rel_off| relationships.get(rel_off).ok())
            .filter(|rel| {
                rel.is_active() && rel.group == 0 && rel.type_ref == is_a_ref && rel.is_defining()
            })
            .filter_map(|rel| self.record_at(rel.source_ref).ok().map(|r| r.id))
            .collect()
    }

    /// Selects the best display term per order: language match, then first
    /// active description, then empty.
    pub fn display_name(&self, concept_id: SctId, language: &str) -> TerminologyResult<String> {
        let off = self
            .find(concept_id)
            .ok_or(TerminologyError::CodeNotFound { code: concept_id })?;
        let rec = self.record_at(off)?;
        let index = self.description_index_reader();
        let descriptions = self.descriptions_reader();
        let strings = self.strings_reader();

        let mut fallback: Option<String> = None;
        for i in 0..rec.description_count as u32 {
            let entry_offset = rec.descriptions_ref + i * 12;
            let Ok((_, desc_offset)) = index.get(entry_offset) else {
                continue;
            };
            let Ok(desc) = descriptions.get(desc_offset) else {
                continue;
            };
            if !desc.is_active() {
                continue;
            }
            let Ok(term) = strings.get(desc.term_ref) else {
                continue;
            };
            if desc.language() == language {
                return Ok(term.to_string());
            }
            if fallback.is_none() {
                fallback = Some(term.to_string());
            }
        }
        Ok(fallback.unwrap_or_default())
    }

    /// Every concept id in the segment, for wildcard evaluation and
    /// text search — `Concepts` has no index beyond offset order, so this
    /// is a full scan.
    pub fn all_concept_ids(&self) -> Vec<SctId> {
        self.concepts_reader().iter().map(|r| r.id).collect()
    }

    /// True if the concept id resolves to a record at all, active or not.
    pub fn has_concept(&self, concept_id: SctId) -> bool {
        self.find(concept_id).is_some()
    }

    /// Active members of the simple reference set `refset_id`.
    pub fn refset_members(&self, refset_id: SctId) -> Vec<SctId> {
        let Some(rec) = self.refset_index_reader().find(refset_id) else {
            return Vec::new();
        };
        let Ok(member_offsets) = self.references_reader().get(rec.members_ref) else {
            return Vec::new();
        };
        let members = self.refset_members_reader();
        member_offsets
            .into_iter()
            .filter_map(|off| members.get(off, rec.field_width).ok())
            .filter(|(member, _)| member.is_active())
            .filter_map(|(member, _)| {
                self.record_at(member.referenced_component_ref).ok().map(|r| r.id)
            })
            .collect()
    }

    fn active_description_terms(&self, rec: &ConceptRecord) -> Vec<String> {
        let index = self.description_index_reader();
        let descriptions = self.descriptions_reader();
        let strings = self.strings_reader();
        (0..rec.description_count as u32)
            .filter_map(|i| index.get(rec.descriptions_ref + i * 12).ok())
            .filter_map(|(_, desc_offset)| descriptions.get(desc_offset).ok())
            .filter(|desc| desc.is_active())
            .filter_map(|desc| strings.get(desc.term_ref).ok().map(|s| s.to_string()))
            .collect()
    }
}

impl snomed_ecl::EclQueryable for SnomedContainer {
    fn get_children(&self, concept_id: SctId) -> Vec<SctId> {
        self.children(concept_id)
    }

    fn get_parents(&self, concept_id: SctId) -> Vec<SctId> {
        self.parents(concept_id)
    }

    fn has_concept(&self, concept_id: SctId) -> bool {
        SnomedContainer::has_concept(self, concept_id)
    }

    fn all_concept_ids(&self) -> Box<dyn Iterator<Item = SctId> + '_> {
        Box::new(SnomedContainer::all_concept_ids(self).into_iter())
    }

    fn get_refset_members(&self, refset_id: SctId) -> Vec<SctId> {
        self.refset_members(refset_id)
    }

    fn is_concept_active(&self, concept_id: SctId) -> bool {
        self.is_active(concept_id)
    }

    fn is_concept_primitive(&self, concept_id: SctId) -> bool {
        self.is_primitive(concept_id).unwrap_or(false)
    }
}

impl SnomedServices for SnomedContainer {
    fn is_active(&self, code: SctId) -> bool {
        SnomedContainer::is_active(self, code)
    }

    fn is_primitive(&self, code: SctId) -> TerminologyResult<bool> {
        SnomedContainer::is_primitive(self, code)
    }

    fn subsumes(&self, ancestor: SctId, descendant: SctId) -> TerminologyResult<bool> {
        SnomedContainer::subsumes(self, ancestor, descendant)
    }

    fn display_name(&self, code: SctId, language: &str) -> TerminologyResult<String> {
        SnomedContainer::display_name(self, code, language)
    }

    fn filter_equals(&self, criterion: &FilterCriterion, language: &str) -> Vec<FilterResult> {
        criterion
            .values
            .iter()
            .filter(|&&code| self.has_concept(code))
            .map(|&code| FilterResult {
                code,
                display: self.display_name(code, language).unwrap_or_default(),
            })
            .collect()
    }

    fn filter_is_a(&self, root: SctId, exclude_self: bool, language: &str) -> Vec<FilterResult> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if current != root || !exclude_self {
                if self.has_concept(current) {
                    out.push(FilterResult {
                        code: current,
                        display: self.display_name(current, language).unwrap_or_default(),
                    });
                }
            }
            queue.extend(self.children(current));
        }
        out
    }

    fn filter_in(&self, refset_id: SctId, language: &str) -> Vec<FilterResult> {
        self.refset_members(refset_id)
            .into_iter()
            .map(|code| FilterResult {
                code,
                display: self.display_name(code, language).unwrap_or_default(),
            })
            .collect()
    }

    fn search_filter(&self, text: &str, language: &str, limit: usize) -> Vec<FilterResult> {
        let needle = text.to_lowercase();
        let mut scored: Vec<(SearchPriority, FilterResult)> = Vec::new();

        for rec in self.concepts_reader().iter() {
            let mut best: Option<SearchPriority> = None;
            for term in self.active_description_terms(&rec) {
                let term_lower = term.to_lowercase();
                let priority = if term_lower == needle {
                    Some(SearchPriority::EXACT)
                } else if term_lower.split_whitespace().any(|w| w == needle) {
                    Some(SearchPriority::STEM)
                } else if term_lower.contains(&needle) {
                    Some(SearchPriority::SUBSTRING)
                } else {
                    None
                };
                if let Some(p) = priority {
                    best = Some(best.map_or(p, |b| b.max(p)));
                }
            }
            if let Some(priority) = best {
                scored.push((
                    priority,
                    FilterResult {
                        code: rec.id,
                        display: self.display_name(rec.id, language).unwrap_or_default(),
                    },
                ));
            }
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(limit);
        scored.into_iter().map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomed_types::segments::{
        ConceptsWriter, DescriptionIndexWriter, DescriptionsWriter, FieldWidth, ReferencesWriter,
        RefsetIndexWriter, RefsetMemberIds, RefsetMembersWriter, RelationshipsWriter, StringsWriter,
    };
    use snomed_types::{CaseSignificance, DefinitionStatus, DescriptionType, ModifierType};

    fn tagged_string(out: &mut Vec<u8>, s: &str) {
        out.push(6);
        out.push(s.len() as u8);
        out.extend_from_slice(s.as_bytes());
    }

    fn segment(out: &mut Vec<u8>, bytes: &[u8]) {
        out.extend_from_slice(&(bytes.len() as i32).to_le_bytes());
        out.extend_from_slice(bytes);
    }

    #[test]
    fn parses_header_and_rejects_unknown_cache_version() {
        let mut data = Vec::new();
        data.push(6);
        data.push(2);
        data.extend_from_slice(b"99");
        let err = parse_container(&data).unwrap_err();
        assert!(matches!(err, TerminologyError::StoreCorrupt { .. }));
    }

    #[test]
    fn rejects_truncated_header() {
        let data = vec![6u8, 2, b'1'];
        assert!(parse_container(&data).is_err());
    }

    #[test]
    fn version_uri_parses_edition_and_version_and_testing_flag() {
        let (edition, version) =
            parse_version_uri("http://snomed.info/xsct/900000000000207008/version/20020131");
        assert_eq!(edition.as_deref(), Some("900000000000207008"));
        assert_eq!(version.as_deref(), Some("20020131"));
        assert!("http://snomed.info/xsct/900000000000207008/version/20020131".contains("/xsct/"));
    }

    fn full_container_bytes() -> Vec<u8> {
        let mut strings_w = StringsWriter::new();
        let root_fsn = strings_w.add("SNOMED CT Concept").unwrap();
        let child_fsn = strings_w.add("Clinical finding (finding)").unwrap();
        let strings = strings_w.into_bytes();

        let mut refset_members_w = RefsetMembersWriter::new();
        let child_member_off = refset_members_w.add(56, true, RefsetMemberIds::Simple);
        let refset_members = refset_members_w.into_bytes();

        let mut refs_w = ReferencesWriter::new();
        let child_parents = refs_w.add(&[0]);
        let root_inbound = refs_w.add(&[0]);
        let child_closure = refs_w.add(&[0]); // root's offset, sorted trivially
        let refset_member_offsets = refs_w.add(&[child_member_off]);
        let refs = refs_w.into_bytes();

        let mut refset_index_w = RefsetIndexWriter::new(snomed_types::segments::RefsetIndexKind::Standard);
        refset_index_w.add(
            900000000000509007,
            0,
            refset_member_offsets,
            1,
            FieldWidth::Scalar,
            20020131,
            None,
        );
        let refset_index = refset_index_w.into_bytes();

        let mut desc_w = DescriptionsWriter::new();
        let root_desc = desc_w.add(
            1, 0, 0, root_fsn, NO_REF, 20020131, *b"en",
            DescriptionType::Fsn, CaseSignificance::CaseInsensitive, true,
        );
        let child_desc = desc_w.add(
            2, 56, 0, child_fsn, NO_REF, 20020131, *b"en",
            DescriptionType::Fsn, CaseSignificance::CaseInsensitive, true,
        );
        let descriptions = desc_w.into_bytes();

        let mut index_w = DescriptionIndexWriter::new();
        let root_index_off = index_w.add(1, root_desc);
        let child_index_off = index_w.add(2, child_desc);
        let description_index = index_w.into_bytes();

        let mut rel_w = RelationshipsWriter::new();
        rel_w.add(
            10, 56, 0, 0, 0, 0,
            CharacteristicType::Inferred, ModifierType::Existential, 20020131, true,
        );
        let relationships = rel_w.into_bytes();

        let mut concepts_w = ConceptsWriter::new();
        concepts_w.add(
            138875005, 0, NO_REF, root_inbound, NO_REF, NO_REF, root_inbound,
            root_index_off, 1, NO_REF, NO_REF, 20020131, true, DefinitionStatus::Primitive,
        );
        concepts_w.add(
            404684003, 0, child_parents, NO_REF, child_closure, NO_REF, NO_REF,
            child_index_off, 1, NO_REF, NO_REF, 20020131, true, DefinitionStatus::FullyDefined,
        );
        let concepts = concepts_w.into_bytes();

        let mut out = Vec::new();
        tagged_string(&mut out, "16");
        tagged_string(&mut out, "http://snomed.info/sct/900000000000207008/version/20020131");
        tagged_string(&mut out, "20020131");
        segment(&mut out, &strings);
        segment(&mut out, &refs);
        segment(&mut out, &descriptions);
        segment(&mut out, &[]); // words
        segment(&mut out, &[]); // stems
        segment(&mut out, &concepts);
        segment(&mut out, &relationships);
        segment(&mut out, &refset_index);
        segment(&mut out, &refset_members);
        segment(&mut out, &description_index);
        out.extend_from_slice(&0i32.to_le_bytes()); // isAIndex: relationship offset 0's type_ref is 0
        out.extend_from_slice(&1i32.to_le_bytes()); // inactiveRoots count
        out.extend_from_slice(&0u64.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes()); // activeRoots count
        out.extend_from_slice(&138875005u64.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes()); // defaultLanguage
        out
    }

    #[test]
    fn round_trips_a_two_concept_container() {
        let data = full_container_bytes();
        let container = parse_container(&data).unwrap();
        eprintln!("TEST SEES active_roots={:?}", container.active_roots());
        assert_eq!(container.cache_version(), CacheVersion::V16);
        assert_eq!(container.edition(), Some("900000000000207008"));
        assert!(!container.is_testing());
        let ar = container.active_roots();
        eprintln!("TEST SEES2 active_roots={:?} ptr={:p} len={}", ar, ar.as_ptr(), ar.len());
        assert_eq!(ar, &[138875005]);

        assert!(container.is_active(138875005));
        assert!(container.is_primitive(138875005).unwrap());
        assert!(!container.is_primitive(404684003).unwrap());

        assert!(container.subsumes(138875005, 404684003).unwrap());
        assert!(!container.subsumes(404684003, 138875005).unwrap());
        assert_eq!(container.parents(404684003), vec![138875005]);
        assert_eq!(container.children(138875005), vec![404684003]);
        assert_eq!(
            container.display_name(404684003, "en").unwrap(),
            "Clinical finding (finding)"
        );
        assert_eq!(container.refset_members(900000000000509007), vec![404684003]);
    }

    #[test]
    fn services_filters_mirror_container_queries() {
        let data = full_container_bytes();
        let container = parse_container(&data).unwrap();

        let equals = SnomedServices::filter_equals(
            &container,
            &FilterCriterion {
                property: "concept".into(),
                values: vec![404684003, 999],
            },
            "en",
        );
        assert_eq!(equals.len(), 1);
        assert_eq!(equals[0].code, 404684003);

        let is_a = SnomedServices::filter_is_a(&container, 138875005, false, "en");
        let codes: std::collections::HashSet<_> = is_a.iter().map(|r| r.code).collect();
        assert!(codes.contains(&138875005));
        assert!(codes.contains(&404684003));

        let in_refset = SnomedServices::filter_in(&container, 900000000000509007, "en");
        assert_eq!(in_refset.len(), 1);
        assert_eq!(in_refset[0].code, 404684003);

        let found = SnomedServices::search_filter(&container, "clinical finding (finding)", "en", 10);
        assert_eq!(found[0].code, 404684003);
    }

    #[test]
    fn unknown_code_reports_not_found() {
        let data = full_container_bytes();
        let container = parse_container(&data).unwrap();
        assert!(matches!(
            container.subsumes(999, 404684003),
            Err(TerminologyError::CodeNotFound { code: 999 })
        ));
    }
}
