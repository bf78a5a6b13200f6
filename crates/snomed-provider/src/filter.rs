//! Filter lifecycle: an explicit state machine rather than a
//! loosely-ordered sequence of calls a provider merely promises to honour.
//! Illegal transitions are `debug_assert!`-backed panics: a misbehaving
//! caller is a programmer error, not recoverable input.

use snomed_loader::TerminologyError;

/// The state a [`FilterExecutionContext`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No prep context obtained yet.
    Init,
    /// `getPrepContext` called; no filters added yet.
    Prep,
    /// One or more `filter`/`searchFilter`/`specialFilter` calls made.
    Building,
    /// `executeFilters` called; the filter set is closed.
    Executed,
    /// Iterating over results via `filterMore`/`filterConcept`.
    Iterating,
    /// `filterFinish` called; the context is no longer usable.
    Finished,
}

/// One criterion accumulated while in [`FilterState::Building`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDescriptor {
    /// `filter(prop, op, value)`.
    Property {
        /// The property being filtered on.
        property: String,
        /// The comparison operator (`=`, `in`, `is-a`, `regex`, ...).
        op: String,
        /// The comparison value.
        value: String,
    },
    /// `searchFilter(text)`.
    Search {
        /// The free-text search term.
        text: String,
    },
    /// `specialFilter(name, value)` — a provider-specific filter outside
    /// the common property/search shape (e.g. LOINC's `answers-for`).
    Special {
        /// The filter name.
        name: String,
        /// The filter's value.
        value: String,
    },
}

/// Default page size [`FilterExecutionContext::next_page`] returns.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A single filter-execution context, tracking state transitions across
/// one `getPrepContext` → `filterFinish` lifetime. Built once per request;
/// never reused across requests.
///
/// `results`/`cursor` hold the backend-agnostic materialised match set: a
/// provider's `execute_filters` fills `results` with matching code
/// strings, and `filter_more` walks `cursor` across it in pages. Keeping
/// this on the context itself (rather than as mutable state on the
/// provider) keeps providers safely shareable across concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExecutionContext {
    state: FilterState,
    /// True if the context was opened for iteration rather than a single
    /// `filterLocate`/`filterCheck` lookup.
    pub iterate: bool,
    /// Accumulated filter criteria, in the order they were added.
    pub descriptors: Vec<FilterDescriptor>,
    /// The matched code strings, filled in by `execute_filters`.
    pub results: Vec<String>,
    /// How far `filter_more` has already paged through `results`.
    pub cursor: usize,
}

impl Default for FilterExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterExecutionContext {
    /// A fresh context in [`FilterState::Init`].
    pub fn new() -> Self {
        Self {
            state: FilterState::Init,
            iterate: false,
            descriptors: Vec::new(),
            results: Vec::new(),
            cursor: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// `getPrepContext(iterate)`: `Init → Prep`.
    pub fn prep(&mut self, iterate: bool) {
        debug_assert_eq!(self.state, FilterState::Init, "getPrepContext called twice on one context");
        self.state = FilterState::Prep;
        self.iterate = iterate;
    }

    /// `filter`/`searchFilter`/`specialFilter`: `Prep|Building → Building`.
    pub fn add(&mut self, descriptor: FilterDescriptor) {
        debug_assert!(
            matches!(self.state, FilterState::Prep | FilterState::Building),
            "filter added outside Prep/Building (state = {:?})",
            self.state
        );
        self.state = FilterState::Building;
        self.descriptors.push(descriptor);
    }

    /// `executeFilters`: `Prep|Building → Executed`. Closes the filter
    /// set; no more filters may be added afterward.
    pub fn execute(&mut self) {
        debug_assert!(
            matches!(self.state, FilterState::Prep | FilterState::Building),
            "executeFilters called outside Prep/Building (state = {:?})",
            self.state
        );
        self.state = FilterState::Executed;
    }

    /// `filterMore`/`filterConcept`: `Executed → Iterating`, or stays in
    /// `Iterating` on subsequent calls. Only valid when the context was
    /// opened with `iterate = true`.
    pub fn begin_iterating(&mut self) {
        debug_assert!(self.iterate, "iteration requested on a non-iterate filter context");
        debug_assert!(
            matches!(self.state, FilterState::Executed | FilterState::Iterating),
            "iteration started outside Executed/Iterating (state = {:?})",
            self.state
        );
        self.state = FilterState::Iterating;
    }

    /// `filterLocate`/`filterCheck`: valid only in `Executed`, non-iterate
    /// mode.
    pub fn assert_locate_or_check_allowed(&self) {
        debug_assert_eq!(
            self.state,
            FilterState::Executed,
            "filterLocate/filterCheck called outside Executed (state = {:?})",
            self.state
        );
        debug_assert!(!self.iterate, "filterLocate/filterCheck called on an iterate-mode context");
    }

    /// `filterFinish`: `Executed|Iterating → Finished`.
    pub fn finish(&mut self) {
        debug_assert!(
            matches!(self.state, FilterState::Executed | FilterState::Iterating),
            "filterFinish called outside Executed/Iterating (state = {:?})",
            self.state
        );
        self.state = FilterState::Finished;
    }

    /// True once [`FilterExecutionContext::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.state == FilterState::Finished
    }

    /// Advances `cursor` by up to `page_size` entries, returning the page
    /// of codes and whether more remain. Implements the paging half of
    /// `filter_more` once a provider has filled in `results`.
    pub fn next_page(&mut self, page_size: usize) -> (Vec<String>, bool) {
        let end = (self.cursor + page_size).min(self.results.len());
        let page = self.results[self.cursor..end].to_vec();
        self.cursor = end;
        (page, self.cursor < self.results.len())
    }
}

/// Raised by [`crate::contract::CodeSystemProvider::filter`] when a
/// provider doesn't support the requested `(property, op, value)` triple
/// at all (distinct from the filter being syntactically malformed, which
/// is a parse error upstream).
pub fn unsupported_filter(operation: impl Into<String>) -> TerminologyError {
    TerminologyError::UnsupportedFilter {
        operation: operation.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_in_order() {
        let mut ctx = FilterExecutionContext::new();
        ctx.prep(true);
        ctx.add(FilterDescriptor::Property {
            property: "concept".into(),
            op: "is-a".into(),
            value: "73211009".into(),
        });
        ctx.execute();
        ctx.begin_iterating();
        ctx.finish();
        assert!(ctx.is_finished());
    }

    #[test]
    fn locate_or_check_allowed_only_in_executed_non_iterate() {
        let mut ctx = FilterExecutionContext::new();
        ctx.prep(false);
        ctx.execute();
        ctx.assert_locate_or_check_allowed();
    }

    #[test]
    #[should_panic]
    fn executing_before_prep_panics() {
        let mut ctx = FilterExecutionContext::new();
        ctx.execute();
    }

    #[test]
    #[should_panic]
    fn double_prep_panics() {
        let mut ctx = FilterExecutionContext::new();
        ctx.prep(false);
        ctx.prep(false);
    }

    #[test]
    fn next_page_walks_results_to_the_end() {
        let mut ctx = FilterExecutionContext::new();
        ctx.results = vec!["a".into(), "b".into(), "c".into()];
        let (page, has_more) = ctx.next_page(2);
        assert_eq!(page, vec!["a".to_string(), "b".to_string()]);
        assert!(has_more);
        let (page, has_more) = ctx.next_page(2);
        assert_eq!(page, vec!["c".to_string()]);
        assert!(!has_more);
    }

    #[test]
    #[should_panic]
    fn iterating_a_non_iterate_context_panics() {
        let mut ctx = FilterExecutionContext::new();
        ctx.prep(false);
        ctx.execute();
        ctx.begin_iterating();
    }
}
