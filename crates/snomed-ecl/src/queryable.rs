//! The store-side contract the evaluator needs. Defined here (the ECL
//! side) rather than in `snomed-loader` so the two crates never depend on
//! each other cyclically: `snomed-loader` implements [`EclQueryable`] for
//! its `SnomedStore`, `snomed-ecl` never imports `snomed-loader` at all.

/// A SNOMED CT concept identifier.
pub type SctId = u64;

/// A non-`IS_A` relationship, as seen by the evaluator's attribute
/// refinement matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// The relationship (attribute) type.
    pub type_id: SctId,
    /// The relationship's destination (attribute value).
    pub destination_id: SctId,
    /// The relationship's role group. `0` means ungrouped.
    pub group: u16,
}

/// A description, as seen by free-text and preferred-term evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionInfo {
    /// The description id.
    pub description_id: SctId,
    /// The term text.
    pub term: String,
    /// The language code.
    pub language_code: String,
    /// RF2 `typeId`.
    pub type_id: SctId,
    /// RF2 `caseSignificanceId`.
    pub case_significance_id: SctId,
    /// RF2 `active`.
    pub active: bool,
    /// RF2 `effectiveTime`, if known.
    pub effective_time: Option<u32>,
    /// RF2 `moduleId`.
    pub module_id: SctId,
}

/// A concrete (non-concept) relationship value, for attributes whose range
/// is a quantity/string/decimal rather than a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteRelationshipInfo {
    /// The relationship (attribute) type.
    pub type_id: SctId,
    /// The literal value, as written in the source (`#10`, `"text"`, ...).
    pub value: String,
    /// The relationship's role group.
    pub group: u16,
}

/// Everything the ECL evaluator needs from a terminology store.
pub trait EclQueryable {
    /// Direct children (inverse `IS_A`) of `concept_id`.
    fn get_children(&self, concept_id: SctId) -> Vec<SctId>;

    /// Direct parents (`IS_A` destinations) of `concept_id`.
    fn get_parents(&self, concept_id: SctId) -> Vec<SctId>;

    /// True if `concept_id` exists in the store (active or not).
    fn has_concept(&self, concept_id: SctId) -> bool;

    /// Every concept id known to the store, for wildcard (`*`) evaluation.
    fn all_concept_ids(&self) -> Box<dyn Iterator<Item = SctId> + '_>;

    /// Referenced components of a simple reference set, for `^refsetId`.
    fn get_refset_members(&self, refset_id: SctId) -> Vec<SctId>;

    /// Outgoing non-`IS_A` relationships, for attribute refinement
    /// matching. Default implementation returns nothing; stores without
    /// attribute data can rely on this rather than implementing a stub.
    fn get_attributes(&self, _concept_id: SctId) -> Vec<RelationshipInfo> {
        Vec::new()
    }

    /// Incoming non-`IS_A` relationships, for reverse attribute
    /// refinements (`R: attr = X` read backwards).
    fn get_inbound_relationships(&self, _concept_id: SctId) -> Vec<RelationshipInfo> {
        Vec::new()
    }

    /// Concrete (non-concept) relationship values.
    fn get_concrete_values(&self, _concept_id: SctId) -> Vec<ConcreteRelationshipInfo> {
        Vec::new()
    }

    /// All descriptions of a concept, for free-text term matching.
    fn get_descriptions(&self, _concept_id: SctId) -> Vec<DescriptionInfo> {
        Vec::new()
    }

    /// The concept's preferred term, if resolvable.
    fn get_preferred_term(&self, _concept_id: SctId) -> Option<String> {
        None
    }

    /// True if the concept's RF2 `active` flag is set.
    fn is_concept_active(&self, concept_id: SctId) -> bool;

    /// True if the concept is primitively defined.
    fn is_concept_primitive(&self, _concept_id: SctId) -> bool {
        false
    }

    /// The owning module concept, if known.
    fn get_concept_module(&self, _concept_id: SctId) -> Option<SctId> {
        None
    }

    /// RF2 `effectiveTime` of the concept, if known.
    fn get_concept_effective_time(&self, _concept_id: SctId) -> Option<u32> {
        None
    }

    /// The FSN's semantic tag (the text inside the trailing parentheses).
    fn get_semantic_tag(&self, _concept_id: SctId) -> Option<String> {
        None
    }

    /// The domain concepts `attribute_id` is bound to by an active MRCM
    /// Attribute Domain record. Empty means either the attribute has no
    /// MRCM domain constraint or the store carries no MRCM data at all —
    /// the semantic validator treats both the same way, by skipping the
    /// domain check rather than flagging every attribute.
    fn attribute_domains(&self, _attribute_id: SctId) -> Vec<SctId> {
        Vec::new()
    }
}
