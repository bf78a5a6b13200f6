//! A SNOMED CT provider backed by a loaded [`SnomedStore`],
//! exercising the contract against real concept/hierarchy/ECL queries
//! rather than leaving it an unimplemented interface.

use std::sync::Arc;

use snomed_loader::{Designation, SnomedServices, SnomedStore, TerminologyError, TerminologyResult};
use snomed_types::SctId;

use crate::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use crate::filter::{FilterExecutionContext, DEFAULT_PAGE_SIZE};
use crate::handle::{ConceptHandle, LocateResult, SnomedHandle};

/// The SCTID of the `116680003 | Is a |` relationship type, used to tell
/// parent/child navigation apart from ordinary attributes.
const IS_A: SctId = 116680003;

/// A provider over a loaded SNOMED CT edition. The store is `Arc`-shared
/// rather than owned: loading a container is the expensive step, so a
/// registry factory loads it once and hands out cheap `Arc` clones to
/// every provider instance it builds afterwards.
pub struct SnomedProvider {
    store: Arc<SnomedStore>,
    system: String,
    version: String,
    language: String,
}

impl SnomedProvider {
    /// Wraps a loaded store as a provider for `version` (a release date
    /// or edition tag), serving display terms in `language` by default.
    pub fn new(store: Arc<SnomedStore>, version: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            store,
            system: "http://snomed.info/sct".to_string(),
            version: version.into(),
            language: language.into(),
        }
    }

    fn handle_code(&self, handle: &ConceptHandle) -> Option<SctId> {
        match handle {
            ConceptHandle::Snomed(h) => Some(h.code),
            _ => None,
        }
    }
}

impl CodeSystemProvider for SnomedProvider {
    fn system(&self) -> &str {
        &self.system
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        "SNOMED CT"
    }

    fn description(&self) -> &str {
        "SNOMED Clinical Terms"
    }

    fn total_count(&self) -> Option<usize> {
        Some(self.store.concept_ids().count())
    }

    fn is_case_sensitive(&self) -> bool {
        false
    }

    fn has_parents(&self) -> bool {
        true
    }

    fn is_not_closed(&self) -> bool {
        false
    }

    fn locate(&self, code: &str) -> LocateResult {
        match code.trim().parse::<SctId>() {
            Ok(id) if self.store.has_concept(id) => LocateResult::found(ConceptHandle::Snomed(SnomedHandle { code: id })),
            Ok(id) => LocateResult::not_found(format!("no such SNOMED concept: {id}")),
            Err(_) => LocateResult::not_found(format!("not a SNOMED CT identifier: {code}")),
        }
    }

    fn code(&self, handle: &ConceptHandle) -> String {
        handle.code()
    }

    fn display(&self, handle: &ConceptHandle) -> Option<String> {
        let code = self.handle_code(handle)?;
        self.store.display_name(code, &self.language).ok().filter(|s| !s.is_empty())
    }

    fn definition(&self, _handle: &ConceptHandle) -> Option<String> {
        None
    }

    fn status(&self, handle: &ConceptHandle) -> ConceptStatus {
        let Some(code) = self.handle_code(handle) else {
            return ConceptStatus::default();
        };
        ConceptStatus {
            is_abstract: self.store.is_primitive(code).unwrap_or(false),
            is_inactive: !self.store.is_active(code),
            is_deprecated: false,
        }
    }

    fn item_weight(&self, _handle: &ConceptHandle) -> Option<f64> {
        None
    }

    fn parents(&self, handle: &ConceptHandle) -> Vec<ConceptHandle> {
        let Some(code) = self.handle_code(handle) else {
            return Vec::new();
        };
        self.store
            .get_parents(code)
            .into_iter()
            .map(|p| ConceptHandle::Snomed(SnomedHandle { code: p }))
            .collect()
    }

    fn designations(&self, handle: &ConceptHandle) -> Vec<Designation> {
        let Some(code) = self.handle_code(handle) else {
            return Vec::new();
        };
        let raw = self.store.get_descriptions(code).cloned().unwrap_or_default();
        let designations = raw
            .into_iter()
            .filter(|d| d.active)
            .map(|d| Designation {
                language: d.language_code,
                use_id: d.type_id,
                value: d.term,
            })
            .collect();
        crate::context::OperationContext::dedup_designations(designations)
    }

    fn properties(&self, handle: &ConceptHandle) -> Vec<ConceptProperty> {
        let Some(code) = self.handle_code(handle) else {
            return Vec::new();
        };
        let Some(concept) = self.store.get_concept(code) else {
            return Vec::new();
        };
        vec![ConceptProperty {
            name: "moduleId".to_string(),
            value: concept.module_id.to_string(),
        }]
    }

    fn subsumes_test(&self, subsumer: &ConceptHandle, subsumed: &ConceptHandle) -> bool {
        let (Some(a), Some(b)) = (self.handle_code(subsumer), self.handle_code(subsumed)) else {
            return false;
        };
        self.store.subsumes(a, b).unwrap_or(false)
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!(
            (property, op),
            ("concept", "=") | ("concept", "in") | ("concept", "is-a") | ("concept", "descendant-of") | ("*", "ecl")
        )
    }

    fn filter(
        &self,
        ctx: &mut FilterExecutionContext,
        property: &str,
        op: &str,
        value: &str,
    ) -> TerminologyResult<()> {
        if !self.does_filter(property, op) {
            return Err(TerminologyError::UnsupportedFilter {
                operation: format!("{property} {op}"),
            });
        }
        ctx.add(crate::filter::FilterDescriptor::Property {
            property: property.to_string(),
            op: op.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn execute_filters(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<Option<usize>> {
        ctx.execute();

        let mut matches: Option<Vec<SctId>> = None;
        for descriptor in &ctx.descriptors {
            let this_round = match descriptor {
                crate::filter::FilterDescriptor::Property { property, op, value } => {
                    self.resolve_property_filter(property, op, value)?
                }
                crate::filter::FilterDescriptor::Search { text } => self
                    .store
                    .search_filter(text, &self.language, DEFAULT_PAGE_SIZE * 10)
                    .into_iter()
                    .map(|r| r.code)
                    .collect(),
                crate::filter::FilterDescriptor::Special { name, value } => {
                    if name != "ecl" {
                        return Err(TerminologyError::UnsupportedFilter { operation: name.clone() });
                    }
                    snomed_ecl::evaluate_str(value, self.store.as_ref())
                        .map_err(|e| TerminologyError::InvalidExpression {
                            offset: 0,
                            message: e.to_string(),
                        })?
                        .into_iter()
                        .collect()
                }
            };
            matches = Some(match matches {
                None => this_round,
                Some(prev) => prev.into_iter().filter(|c| this_round.contains(c)).collect(),
            });
        }

        let codes = matches.unwrap_or_default();
        ctx.results = codes.iter().map(SctId::to_string).collect();
        Ok(Some(ctx.results.len()))
    }

    fn filter_size(&self, ctx: &FilterExecutionContext) -> Option<usize> {
        Some(ctx.results.len())
    }

    fn filter_more(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<FilterPage> {
        ctx.begin_iterating();
        let (page, has_more) = ctx.next_page(DEFAULT_PAGE_SIZE);
        let handles = page
            .into_iter()
            .filter_map(|code| code.parse::<SctId>().ok())
            .map(|code| ConceptHandle::Snomed(SnomedHandle { code }))
            .collect();
        Ok(FilterPage { handles, has_more })
    }

    fn filter_concept(&self, _ctx: &FilterExecutionContext, page: &FilterPage, index: usize) -> Option<ConceptHandle> {
        page.handles.get(index).cloned()
    }

    fn filter_locate(&self, ctx: &FilterExecutionContext, code: &str) -> LocateResult {
        ctx.assert_locate_or_check_allowed();
        if ctx.results.iter().any(|c| c == code) {
            self.locate(code)
        } else {
            LocateResult::not_found(format!("{code} is not in this filter's result set"))
        }
    }

    fn filter_check(&self, ctx: &FilterExecutionContext, handle: &ConceptHandle) -> bool {
        ctx.assert_locate_or_check_allowed();
        ctx.results.iter().any(|c| c == &handle.code())
    }
}

impl SnomedProvider {
    fn resolve_property_filter(&self, property: &str, op: &str, value: &str) -> TerminologyResult<Vec<SctId>> {
        if property != "concept" {
            return Err(TerminologyError::UnsupportedFilter {
                operation: format!("{property} {op}"),
            });
        }
        match op {
            "=" => {
                let code: SctId = value
                    .parse()
                    .map_err(|_| TerminologyError::UnsupportedFilter { operation: format!("concept = {value}") })?;
                Ok(if self.store.has_concept(code) { vec![code] } else { Vec::new() })
            }
            "in" => {
                let codes: Vec<SctId> = value.split(',').filter_map(|v| v.trim().parse().ok()).collect();
                Ok(codes.into_iter().filter(|c| self.store.has_concept(*c)).collect())
            }
            "is-a" => {
                let root: SctId = value
                    .parse()
                    .map_err(|_| TerminologyError::UnsupportedFilter { operation: format!("concept is-a {value}") })?;
                Ok(self.store.filter_is_a(root, false, &self.language).into_iter().map(|r| r.code).collect())
            }
            "descendant-of" => {
                let root: SctId = value
                    .parse()
                    .map_err(|_| TerminologyError::UnsupportedFilter { operation: format!("concept descendant-of {value}") })?;
                Ok(self.store.filter_is_a(root, true, &self.language).into_iter().map(|r| r.code).collect())
            }
            _ => Err(TerminologyError::UnsupportedFilter {
                operation: format!("concept {op}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomed_types::{CharacteristicType, DefinitionStatus, DescriptionType, ModifierType, Rf2Concept, Rf2Description, Rf2Relationship};

    fn make_store() -> SnomedStore {
        let mut store = SnomedStore::new();
        let concepts = [
            (138875005, "SNOMED CT Concept (SNOMED RT+CTV3)"),
            (404684003, "Clinical finding (finding)"),
            (73211009, "Diabetes mellitus (disorder)"),
        ];

        store.insert_concepts(concepts.iter().map(|&(id, _)| Rf2Concept {
            id,
            effective_time: 20240101,
            active: true,
            module_id: 900000000000207008,
            definition_status_id: DefinitionStatus::PRIMITIVE_ID,
        }));

        store.insert_descriptions(concepts.iter().map(|&(id, term)| Rf2Description {
            id: id * 10,
            effective_time: 20240101,
            active: true,
            module_id: 900000000000207008,
            concept_id: id,
            language_code: "en".to_string(),
            type_id: DescriptionType::Fsn.to_id(),
            term: term.to_string(),
            case_significance_id: 900000000000448009,
        }));

        store.insert_relationships([
            Rf2Relationship {
                id: 1,
                effective_time: 20240101,
                active: true,
                module_id: 900000000000207008,
                source_id: 73211009,
                destination_id: 404684003,
                relationship_group: 0,
                type_id: IS_A,
                characteristic_type_id: CharacteristicType::INFERRED_ID,
                modifier_id: ModifierType::EXISTENTIAL_ID,
            },
            Rf2Relationship {
                id: 2,
                effective_time: 20240101,
                active: true,
                module_id: 900000000000207008,
                source_id: 404684003,
                destination_id: 138875005,
                relationship_group: 0,
                type_id: IS_A,
                characteristic_type_id: CharacteristicType::INFERRED_ID,
                modifier_id: ModifierType::EXISTENTIAL_ID,
            },
        ]);

        store
    }

    #[test]
    fn locate_resolves_known_codes_only() {
        let provider = SnomedProvider::new(Arc::new(make_store()), "2024-01-01", "en");
        assert!(provider.locate("73211009").context.is_some());
        assert!(provider.locate("999999999").context.is_none());
        assert!(provider.locate("not-a-code").context.is_none());
    }

    #[test]
    fn is_a_filter_returns_the_concept_and_its_descendants() {
        let provider = SnomedProvider::new(Arc::new(make_store()), "2024-01-01", "en");
        let mut ctx = provider.prep_context(true);
        provider.filter(&mut ctx, "concept", "is-a", "404684003").unwrap();
        provider.execute_filters(&mut ctx).unwrap();
        assert_eq!(ctx.results.len(), 2);
        assert!(ctx.results.contains(&"404684003".to_string()));
        assert!(ctx.results.contains(&"73211009".to_string()));
    }

    #[test]
    fn subsumes_test_follows_is_a_transitively() {
        let provider = SnomedProvider::new(Arc::new(make_store()), "2024-01-01", "en");
        let root = provider.locate("138875005").context.unwrap();
        let leaf = provider.locate("73211009").context.unwrap();
        assert!(provider.subsumes_test(&root, &leaf));
        assert!(!provider.subsumes_test(&leaf, &root));
    }

    #[test]
    fn display_selects_the_active_fsn() {
        let provider = SnomedProvider::new(Arc::new(make_store()), "2024-01-01", "en");
        let handle = provider.locate("73211009").context.unwrap();
        assert_eq!(provider.display(&handle).as_deref(), Some("Diabetes mellitus (disorder)"));
    }
}
