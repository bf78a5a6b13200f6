//! The code system provider contract: the operation set every
//! backend — SNOMED, a relational vocabulary, or a pure-grammar system —
//! implements identically, so a caller never has to know which one it's
//! talking to.

use snomed_loader::{Designation, TerminologyResult};

use crate::filter::{FilterDescriptor, FilterExecutionContext};
use crate::handle::{ConceptHandle, LocateResult};

/// A concept's basic status flags, returned together since callers
/// typically need all three after a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConceptStatus {
    /// True if the concept is a primitive (not fully defined).
    pub is_abstract: bool,
    /// True if the concept is inactive in the loaded version.
    pub is_inactive: bool,
    /// True if the concept has been deprecated (distinct from inactive:
    /// a deprecated code may still resolve but carries a warning).
    pub is_deprecated: bool,
}

/// A `(property, value)` pair returned by `extensions`/`properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptProperty {
    /// The property's name/URI.
    pub name: String,
    /// The property's value, rendered as text.
    pub value: String,
}

/// One page of filter results plus whatever's needed to fetch the next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterPage {
    /// The concepts found on this page.
    pub handles: Vec<ConceptHandle>,
    /// True if another call to `filter_more` would return more rows.
    pub has_more: bool,
}

/// The contract every code system backend implements. Every
/// concept-taking operation accepts a resolved [`ConceptHandle`] rather
/// than a raw code string — callers resolve once via `locate` and reuse
/// the handle for the rest of the operation.
pub trait CodeSystemProvider {
    /// The code system's canonical URI.
    fn system(&self) -> &str;

    /// The loaded version string (empty if the system is versionless).
    fn version(&self) -> &str;

    /// A short human-readable name for the system.
    fn name(&self) -> &str;

    /// A longer description of the system, for display in error messages
    /// and tooling.
    fn description(&self) -> &str;

    /// The total number of concepts/codes known to this provider, if
    /// countable (relational/SNOMED backends); `None` for grammar-only
    /// systems with no enumerable value set (IETF languages, HGVS).
    fn total_count(&self) -> Option<usize>;

    /// True if code comparisons in this system are case-sensitive.
    fn is_case_sensitive(&self) -> bool;

    /// True if `parent`/hierarchy navigation is meaningful for this
    /// system.
    fn has_parents(&self) -> bool;

    /// True if the value set is open (not a fixed enumerable list) —
    /// URI and HGVS systems return `true`, SNOMED and CPT return `false`.
    fn is_not_closed(&self) -> bool;

    /// Resolves a code string to a handle. Never errors: an unknown code
    /// is a [`LocateResult::not_found`], not a `Result::Err`.
    fn locate(&self, code: &str) -> LocateResult;

    /// The code string a handle resolves back to.
    fn code(&self, handle: &ConceptHandle) -> String;

    /// The preferred display term for a handle, per the display-selection
    /// order: supplement, then native term in the requested
    /// language, then native term in any language.
    fn display(&self, handle: &ConceptHandle) -> Option<String>;

    /// The formal textual definition, if this system carries one.
    fn definition(&self, handle: &ConceptHandle) -> Option<String>;

    /// Abstract/inactive/deprecated status flags for a handle.
    fn status(&self, handle: &ConceptHandle) -> ConceptStatus;

    /// The relative weight/ranking this code carries, used to order
    /// otherwise-tied filter results (e.g. SNOMED's `itemWeight` concept
    /// model attribute). `None` when the system has no such notion.
    fn item_weight(&self, handle: &ConceptHandle) -> Option<f64>;

    /// The handle's immediate parent(s), if `has_parents()` is true.
    fn parents(&self, handle: &ConceptHandle) -> Vec<ConceptHandle>;

    /// All rendered designations (FSN/synonyms/translations) for a
    /// handle, de-duplicated and ordered by the operation context.
    fn designations(&self, handle: &ConceptHandle) -> Vec<Designation>;

    /// FHIR-style extensions/properties attached to this code.
    fn properties(&self, handle: &ConceptHandle) -> Vec<ConceptProperty>;

    /// True if `subsumer` subsumes (is an ancestor of, or equal to)
    /// `subsumed`.
    fn subsumes_test(&self, subsumer: &ConceptHandle, subsumed: &ConceptHandle) -> bool;

    /// True if this provider implements the given `(property, op)`
    /// filter combination at all, before a caller builds one.
    fn does_filter(&self, property: &str, op: &str) -> bool;

    /// Opens a filter-execution context for one request. `iterate = true`
    /// opens it for enumeration (`filter_more`); `false` for a single
    /// `filter_locate`/`filter_check` lookup.
    fn prep_context(&self, iterate: bool) -> FilterExecutionContext {
        let mut ctx = FilterExecutionContext::new();
        ctx.prep(iterate);
        ctx
    }

    /// Adds a `filter(property, op, value)` criterion.
    fn filter(
        &self,
        ctx: &mut FilterExecutionContext,
        property: &str,
        op: &str,
        value: &str,
    ) -> TerminologyResult<()>;

    /// Adds a free-text `searchFilter(text)` criterion.
    fn search_filter(&self, ctx: &mut FilterExecutionContext, text: &str) -> TerminologyResult<()> {
        if !self.does_filter("*", "search") {
            return Err(crate::filter::unsupported_filter("searchFilter"));
        }
        ctx.add(FilterDescriptor::Search { text: text.to_string() });
        Ok(())
    }

    /// Adds a provider-specific `specialFilter(name, value)` criterion
    /// outside the common property/search shape (e.g. LOINC's
    /// `answers-for`).
    fn special_filter(
        &self,
        ctx: &mut FilterExecutionContext,
        name: &str,
        value: &str,
    ) -> TerminologyResult<()> {
        if !self.does_filter(name, "special") {
            return Err(crate::filter::unsupported_filter(name));
        }
        ctx.add(FilterDescriptor::Special {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Closes the filter set and runs it, producing the result count (if
    /// known up front).
    fn execute_filters(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<Option<usize>>;

    /// The number of results, if known without fully materialising them.
    fn filter_size(&self, ctx: &FilterExecutionContext) -> Option<usize>;

    /// Fetches the next page of results from an iterating context.
    fn filter_more(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<FilterPage>;

    /// The concept at the current iteration position.
    fn filter_concept(&self, ctx: &FilterExecutionContext, page: &FilterPage, index: usize) -> Option<ConceptHandle>;

    /// Resolves a single code against an executed (non-iterating) filter
    /// context, equivalent to `locate` scoped to the filter's result set.
    fn filter_locate(&self, ctx: &FilterExecutionContext, code: &str) -> LocateResult;

    /// True if a handle is a member of an executed filter's result set,
    /// without requiring full iteration.
    fn filter_check(&self, ctx: &FilterExecutionContext, handle: &ConceptHandle) -> bool;

    /// Releases a filter context. Idempotent per-context (panics via
    /// [`FilterExecutionContext::finish`]'s assertions if called from an
    /// illegal state, not called twice).
    fn filter_finish(&self, ctx: &mut FilterExecutionContext) {
        ctx.finish();
    }

    /// Translations of a handle's display term into other code systems
    /// (ConceptMap-style cross-references), if this provider carries any.
    fn translations(&self, handle: &ConceptHandle) -> Vec<(String, String)> {
        let _ = handle;
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{ConceptHandle, StringHandle};

    struct Stub;

    impl CodeSystemProvider for Stub {
        fn system(&self) -> &str {
            "urn:test:stub"
        }
        fn version(&self) -> &str {
            ""
        }
        fn name(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            "a stub provider for contract tests"
        }
        fn total_count(&self) -> Option<usize> {
            Some(1)
        }
        fn is_case_sensitive(&self) -> bool {
            true
        }
        fn has_parents(&self) -> bool {
            false
        }
        fn is_not_closed(&self) -> bool {
            false
        }
        fn locate(&self, code: &str) -> LocateResult {
            if code == "x" {
                LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: "x".into() }))
            } else {
                LocateResult::not_found("unknown code")
            }
        }
        fn code(&self, handle: &ConceptHandle) -> String {
            handle.code()
        }
        fn display(&self, _handle: &ConceptHandle) -> Option<String> {
            Some("X".into())
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
        fn does_filter(&self, property: &str, op: &str) -> bool {
            property == "code" && op == "="
        }
        fn filter(
            &self,
            ctx: &mut FilterExecutionContext,
            property: &str,
            op: &str,
            value: &str,
        ) -> TerminologyResult<()> {
            if !self.does_filter(property, op) {
                return Err(crate::filter::unsupported_filter(format!("{property} {op}")));
            }
            ctx.add(FilterDescriptor::Property {
                property: property.to_string(),
                op: op.to_string(),
                value: value.to_string(),
            });
            Ok(())
        }
        fn execute_filters(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<Option<usize>> {
            ctx.execute();
            Ok(Some(1))
        }
        fn filter_size(&self, _ctx: &FilterExecutionContext) -> Option<usize> {
            Some(1)
        }
        fn filter_more(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<FilterPage> {
            ctx.begin_iterating();
            Ok(FilterPage {
                handles: vec![ConceptHandle::StringLiteral(StringHandle { code: "x".into() })],
                has_more: false,
            })
        }
        fn filter_concept(&self, _ctx: &FilterExecutionContext, page: &FilterPage, index: usize) -> Option<ConceptHandle> {
            page.handles.get(index).cloned()
        }
        fn filter_locate(&self, _ctx: &FilterExecutionContext, code: &str) -> LocateResult {
            self.locate(code)
        }
        fn filter_check(&self, _ctx: &FilterExecutionContext, handle: &ConceptHandle) -> bool {
            handle.code() == "x"
        }
    }

    #[test]
    fn locate_round_trips_through_code() {
        let stub = Stub;
        let result = stub.locate("x");
        let handle = result.context.expect("x should resolve");
        assert_eq!(stub.code(&handle), "x");
    }

    #[test]
    fn unknown_code_is_not_found_not_an_error() {
        let stub = Stub;
        let result = stub.locate("nope");
        assert!(result.context.is_none());
        assert!(!result.message.is_empty());
    }

    #[test]
    fn full_filter_lifecycle_runs_without_panicking() {
        let stub = Stub;
        let mut ctx = stub.prep_context(true);
        stub.filter(&mut ctx, "code", "=", "x").unwrap();
        stub.execute_filters(&mut ctx).unwrap();
        let page = stub.filter_more(&mut ctx).unwrap();
        assert_eq!(page.handles.len(), 1);
        stub.filter_finish(&mut ctx);
        assert!(ctx.is_finished());
    }

    #[test]
    fn unsupported_filter_is_rejected_before_it_is_added() {
        let stub = Stub;
        let mut ctx = stub.prep_context(false);
        let err = stub.filter(&mut ctx, "bogus", "=", "x").unwrap_err();
        assert!(matches!(err, snomed_loader::TerminologyError::UnsupportedFilter { .. }));
    }
}
