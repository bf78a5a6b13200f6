//! URI provider: `urn:ietf:rfc:3986` accepts any string as a code. There
//! is no backing row, no hierarchy, and no native display — a display
//! only ever comes from a supplement the caller layers on top.

use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::FilterExecutionContext;
use snomed_provider::handle::{ConceptHandle, LocateResult, StringHandle};

/// A provider whose value set is "any URI string". Every `locate` call
/// succeeds.
#[derive(Debug, Default)]
pub struct UriProvider;

impl CodeSystemProvider for UriProvider {
    fn system(&self) -> &str {
        "urn:ietf:rfc:3986"
    }

    fn version(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "URI"
    }

    fn description(&self) -> &str {
        "Any URI, as an identifier rather than a dereferenceable resource"
    }

    fn total_count(&self) -> Option<usize> {
        None
    }

    fn is_case_sensitive(&self) -> bool {
        true
    }

    fn has_parents(&self) -> bool {
        false
    }

    fn is_not_closed(&self) -> bool {
        true
    }

    fn locate(&self, code: &str) -> LocateResult {
        if code.is_empty() {
            return LocateResult::not_found("a URI code cannot be empty");
        }
        LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: code.to_string() }))
    }

    fn code(&self, handle: &ConceptHandle) -> String {
        handle.code()
    }

    fn display(&self, _handle: &ConceptHandle) -> Option<String> {
        None
    }

    fn definition(&self, _handle: &ConceptHandle) -> Option<String> {
        None
    }

    fn status(&self, _handle: &ConceptHandle) -> ConceptStatus {
        ConceptStatus::default()
    }

    fn item_weight(&self, _handle: &ConceptHandle) -> Option<f64> {
        None
    }

    fn parents(&self, _handle: &ConceptHandle) -> Vec<ConceptHandle> {
        Vec::new()
    }

    fn designations(&self, _handle: &ConceptHandle) -> Vec<Designation> {
        Vec::new()
    }

    fn properties(&self, _handle: &ConceptHandle) -> Vec<ConceptProperty> {
        Vec::new()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, _property: &str, _op: &str) -> bool {
        false
    }

    fn filter(
        &self,
        _ctx: &mut FilterExecutionContext,
        property: &str,
        op: &str,
        _value: &str,
    ) -> TerminologyResult<()> {
        Err(TerminologyError::UnsupportedFilter {
            operation: format!("{property} {op}"),
        })
    }

    fn execute_filters(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<Option<usize>> {
        ctx.execute();
        Ok(None)
    }

    fn filter_size(&self, _ctx: &FilterExecutionContext) -> Option<usize> {
        None
    }

    fn filter_more(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<FilterPage> {
        ctx.begin_iterating();
        Ok(FilterPage::default())
    }

    fn filter_concept(&self, _ctx: &FilterExecutionContext, page: &FilterPage, index: usize) -> Option<ConceptHandle> {
        page.handles.get(index).cloned()
    }

    fn filter_locate(&self, ctx: &FilterExecutionContext, code: &str) -> LocateResult {
        ctx.assert_locate_or_check_allowed();
        self.locate(code)
    }

    fn filter_check(&self, ctx: &FilterExecutionContext, _handle: &ConceptHandle) -> bool {
        ctx.assert_locate_or_check_allowed();
        false
    }
}
