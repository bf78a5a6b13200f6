//! SNOMED CT services: the small set of primitive operations every
//! higher-level feature (expressions, ECL, the provider contract) is built
//! from — activity/primitiveness checks, hierarchy traversal, subsumption,
//! display-name selection, and the four filter builders.

use std::collections::{HashSet, VecDeque};

use snomed_types::SctId;

use crate::error::{TerminologyError, TerminologyResult};
use crate::store::SnomedStore;

/// A single concept offered back to a caller alongside its display term —
/// the unit `filter_equals`/`filter_is_a`/`filter_in`/`search_filter`
/// iterate over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    /// The matching concept.
    pub code: SctId,
    /// Its selected display term (display-selection order).
    pub display: String,
}

/// One rendered designation: a term plus the language/use it was recorded
/// under. Aggregated and de-duplicated by the operation context,
/// not by the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designation {
    /// Language code the term was recorded under.
    pub language: String,
    /// The description type id (FSN/Synonym/Definition), standing in for
    /// FHIR's `use`.
    pub use_id: SctId,
    /// The term text.
    pub value: String,
}

/// A single criterion passed to `filter_equals`/`filter_in`. `filter_is_a`
/// and `search_filter` take their own dedicated parameters since they
/// don't fit this `(property, value)` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriterion {
    /// The property name being filtered on (e.g. `"concept"`).
    pub property: String,
    /// The value(s) being matched.
    pub values: Vec<SctId>,
}

/// The priority a filter result was found at, used to rank `search_filter`
/// output before the descending sort + cap: exact match (100),
/// stem/word match (50), substring fallback (10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchPriority(pub u8);

impl SearchPriority {
    /// Exact term match.
    pub const EXACT: SearchPriority = SearchPriority(100);
    /// Stem/word match.
    pub const STEM: SearchPriority = SearchPriority(50);
    /// Substring fallback match.
    pub const SUBSTRING: SearchPriority = SearchPriority(10);
}

/// SNOMED CT services layer, implemented against a loaded
/// [`SnomedStore`].
pub trait SnomedServices {
    /// True if the concept exists and its RF2 `active` flag is set.
    fn is_active(&self, code: SctId) -> bool;

    /// True if the concept exists and is primitively defined.
    fn is_primitive(&self, code: SctId) -> TerminologyResult<bool>;

    /// True if `ancestor` subsumes `descendant` — `ancestor == descendant`
    /// or `ancestor` is a member of `descendant`'s precomputed IS_A
    /// closure. Binary search over that closure, O(log k) after the one-off
    /// O(k) build.
    fn subsumes(&self, ancestor: SctId, descendant: SctId) -> TerminologyResult<bool>;

    /// Selects the best display term for `code` per order:
    /// language match, then first active description, then empty.
    fn display_name(&self, code: SctId, language: &str) -> TerminologyResult<String>;

    /// `filter_equals`: concepts identified by exactly one of `criterion`'s
    /// values.
    fn filter_equals(&self, criterion: &FilterCriterion, language: &str) -> Vec<FilterResult>;

    /// `filter_is_a`: concepts subsumed by `root` (inclusive unless
    /// `exclude_self`).
    fn filter_is_a(&self, root: SctId, exclude_self: bool, language: &str) -> Vec<FilterResult>;

    /// `filter_in`: concepts that are members of `refset_id`.
    fn filter_in(&self, refset_id: SctId, language: &str) -> Vec<FilterResult>;

    /// `search_filter`: free-text search over active descriptions, ranked
    /// by [`SearchPriority`] descending and capped at `limit`.
    fn search_filter(&self, text: &str, language: &str, limit: usize) -> Vec<FilterResult>;
}

impl SnomedServices for SnomedStore {
    fn is_active(&self, code: SctId) -> bool {
        self.get_concept(code).map(|c| c.active).unwrap_or(false)
    }

    fn is_primitive(&self, code: SctId) -> TerminologyResult<bool> {
        self.get_concept(code)
            .map(|c| c.is_primitive())
            .ok_or(TerminologyError::CodeNotFound { code })
    }

    fn subsumes(&self, ancestor: SctId, descendant: SctId) -> TerminologyResult<bool> {
        if !self.has_concept(ancestor) {
            return Err(TerminologyError::CodeNotFound { code: ancestor });
        }
        if !self.has_concept(descendant) {
            return Err(TerminologyError::CodeNotFound { code: descendant });
        }
        Ok(self.closure_subsumes(ancestor, descendant))
    }

    fn display_name(&self, code: SctId, language: &str) -> TerminologyResult<String> {
        let descriptions = self
            .get_descriptions(code)
            .ok_or(TerminologyError::CodeNotFound { code })?;

        if let Some(d) = descriptions
            .iter()
            .find(|d| d.active && d.language_code == language)
        {
            return Ok(d.term.clone());
        }
        if let Some(d) = descriptions.iter().find(|d| d.active) {
            return Ok(d.term.clone());
        }
        Ok(String::new())
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
            queue.extend(self.get_children(current));
        }
        out
    }

    fn filter_in(&self, refset_id: SctId, language: &str) -> Vec<FilterResult> {
        self.get_refset_members(refset_id)
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

        for code in self.concept_ids().copied().collect::<Vec<_>>() {
            let Some(descriptions) = self.get_descriptions(code) else {
                continue;
            };
            let mut best: Option<SearchPriority> = None;
            for d in descriptions.iter().filter(|d| d.active) {
                let term_lower = d.term.to_lowercase();
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
                        code,
                        display: self.display_name(code, language).unwrap_or_default(),
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
    use snomed_types::{CharacteristicType, DefinitionStatus, DescriptionType, ModifierType, Rf2Concept, Rf2Description, Rf2Relationship};

    fn concept(id: SctId, primitive: bool) -> Rf2Concept {
        Rf2Concept {
            id,
            effective_time: 20020131,
            active: true,
            module_id: 900000000000207008,
            definition_status_id: if primitive {
                DefinitionStatus::PRIMITIVE_ID
            } else {
                DefinitionStatus::FULLY_DEFINED_ID
            },
        }
    }

    fn fsn(id: SctId, concept_id: SctId, term: &str) -> Rf2Description {
        Rf2Description {
            id,
            effective_time: 20020131,
            active: true,
            module_id: 900000000000207008,
            concept_id,
            language_code: "en".into(),
            type_id: DescriptionType::FSN_ID,
            term: term.into(),
            case_significance_id: 900000000000448009,
        }
    }

    fn is_a(id: SctId, source: SctId, dest: SctId) -> Rf2Relationship {
        Rf2Relationship {
            id,
            effective_time: 20020131,
            active: true,
            module_id: 900000000000207008,
            source_id: source,
            destination_id: dest,
            relationship_group: 0,
            type_id: 116680003,
            characteristic_type_id: CharacteristicType::INFERRED_ID,
            modifier_id: ModifierType::EXISTENTIAL_ID,
        }
    }

    fn sample_store() -> SnomedStore {
        let mut store = SnomedStore::new();
        store.insert_concepts([concept(138875005, true), concept(404684003, true), concept(73211009, false)]);
        store.insert_descriptions([
            fsn(1, 138875005, "SNOMED CT Concept"),
            fsn(2, 404684003, "Clinical finding (finding)"),
            fsn(3, 73211009, "Diabetes mellitus (disorder)"),
        ]);
        store.insert_relationships([
            is_a(10, 404684003, 138875005),
            is_a(11, 73211009, 404684003),
        ]);
        store
    }

    #[test]
    fn subsumes_is_reflexive_and_transitive() {
        let store = sample_store();
        assert!(store.subsumes(73211009, 73211009).unwrap());
        assert!(store.subsumes(138875005, 73211009).unwrap());
        assert!(!store.subsumes(73211009, 138875005).unwrap());
    }

    #[test]
    fn subsumes_ignores_inactive_grouped_and_additional_is_a_rows() {
        let mut store = sample_store();
        store.insert_concepts([concept(64572001, true)]);
        store.insert_relationships([
            Rf2Relationship { active: false, ..is_a(20, 64572001, 73211009) },
            Rf2Relationship { relationship_group: 1, ..is_a(21, 64572001, 73211009) },
            Rf2Relationship { characteristic_type_id: CharacteristicType::ADDITIONAL_ID, ..is_a(22, 64572001, 73211009) },
        ]);
        assert!(!store.subsumes(73211009, 64572001).unwrap());
    }

    #[test]
    fn subsumes_reports_missing_codes() {
        let store = sample_store();
        assert!(matches!(
            store.subsumes(999, 73211009),
            Err(TerminologyError::CodeNotFound { code: 999 })
        ));
    }

    #[test]
    fn display_name_prefers_requested_language() {
        let store = sample_store();
        assert_eq!(
            store.display_name(73211009, "en").unwrap(),
            "Diabetes mellitus (disorder)"
        );
    }

    #[test]
    fn filter_is_a_walks_descendants() {
        let store = sample_store();
        let results = store.filter_is_a(404684003, false, "en");
        let codes: HashSet<_> = results.iter().map(|r| r.code).collect();
        assert!(codes.contains(&404684003));
        assert!(codes.contains(&73211009));
    }

    #[test]
    fn search_filter_ranks_exact_above_substring() {
        let store = sample_store();
        let results = store.search_filter("diabetes mellitus (disorder)", "en", 10);
        assert_eq!(results[0].code, 73211009);
    }
}
