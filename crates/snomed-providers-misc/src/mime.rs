//! MIME type provider: `urn:ietf:bcp:13` validates a `type/subtype`
//! shape (parameters stripped before comparison) against no fixed list —
//! `isNotClosed` is always true.

use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::FilterExecutionContext;
use snomed_provider::handle::{ConceptHandle, LocateResult, StringHandle};

/// Strips `;charset=utf-8`-style parameters from a MIME type string,
/// returning the bare `type/subtype`.
fn strip_parameters(code: &str) -> &str {
    code.split(';').next().unwrap_or(code).trim()
}

fn is_well_formed(code: &str) -> bool {
    let mut parts = code.splitn(2, '/');
    let (Some(kind), Some(subtype)) = (parts.next(), parts.next()) else {
        return false;
    };
    !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/')
}

/// A provider over the open MIME type grammar.
#[derive(Debug, Default)]
pub struct MimeProvider;

impl CodeSystemProvider for MimeProvider {
    fn system(&self) -> &str {
        "urn:ietf:bcp:13"
    }

    fn version(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "MIME Type"
    }

    fn description(&self) -> &str {
        "IANA media types, validated by grammar rather than a fixed registry"
    }

    fn total_count(&self) -> Option<usize> {
        None
    }

    fn is_case_sensitive(&self) -> bool {
        false
    }

    fn has_parents(&self) -> bool {
        false
    }

    fn is_not_closed(&self) -> bool {
        true
    }

    fn locate(&self, code: &str) -> LocateResult {
        let bare = strip_parameters(code);
        if !is_well_formed(bare) {
            return LocateResult::not_found(format!("not a well-formed type/subtype: {code}"));
        }
        LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: bare.to_string() }))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_type_subtype_locates() {
        let provider = MimeProvider;
        assert!(provider.locate("application/fhir+json").context.is_some());
    }

    #[test]
    fn parameters_are_stripped_before_validation() {
        let provider = MimeProvider;
        let handle = provider.locate("text/plain; charset=utf-8").context.unwrap();
        assert_eq!(handle.code(), "text/plain");
    }

    #[test]
    fn malformed_type_is_rejected() {
        let provider = MimeProvider;
        assert!(provider.locate("not-a-mime-type").context.is_none());
        assert!(provider.locate("too/many/slashes").context.is_none());
    }
}
