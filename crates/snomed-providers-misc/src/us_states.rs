//! US states provider: `https://www.usps.com/` is a static, closed,
//! case-sensitive 59-entry table (the 50 states plus DC, the five
//! inhabited territories, and the three freely-associated states USPS
//! assigns codes to).

use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, StringHandle};

/// The fixed USPS two-letter code → name table.
const STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    ("DC", "District of Columbia"),
    ("AS", "American Samoa"),
    ("GU", "Guam"),
    ("MP", "Northern Mariana Islands"),
    ("PR", "Puerto Rico"),
    ("VI", "U.S. Virgin Islands"),
    ("FM", "Federated States of Micronesia"),
    ("MH", "Marshall Islands"),
    ("PW", "Palau"),
];

fn lookup(code: &str) -> Option<&'static str> {
    STATES.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

/// A provider over the static USPS state/territory code table.
#[derive(Debug, Default)]
pub struct UsStatesProvider;

impl CodeSystemProvider for UsStatesProvider {
    fn system(&self) -> &str {
        "https://www.usps.com/"
    }

    fn version(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "US states and territories"
    }

    fn description(&self) -> &str {
        "USPS two-letter state, district, and territory abbreviations"
    }

    fn total_count(&self) -> Option<usize> {
        Some(STATES.len())
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
        match lookup(code) {
            Some(_) => LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: code.to_string() })),
            None => LocateResult::not_found(format!("not a USPS state/territory code: {code}")),
        }
    }

    fn code(&self, handle: &ConceptHandle) -> String {
        handle.code()
    }

    fn display(&self, handle: &ConceptHandle) -> Option<String> {
        lookup(&handle.code()).map(str::to_string)
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

    fn designations(&self, handle: &ConceptHandle) -> Vec<Designation> {
        match self.display(handle) {
            Some(name) => vec![Designation {
                language: "en".to_string(),
                use_id: 0,
                value: name,
            }],
            None => Vec::new(),
        }
    }

    fn properties(&self, _handle: &ConceptHandle) -> Vec<ConceptProperty> {
        Vec::new()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!((property, op), ("code", "=") | ("code", "in"))
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
        ctx.add(FilterDescriptor::Property {
            property: property.to_string(),
            op: op.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn execute_filters(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<Option<usize>> {
        ctx.execute();
        let mut codes = Vec::new();
        for descriptor in &ctx.descriptors {
            if let FilterDescriptor::Property { op, value, .. } = descriptor {
                match op.as_str() {
                    "=" if lookup(value).is_some() => codes.push(value.clone()),
                    "in" => codes.extend(value.split(',').map(str::trim).filter(|c| lookup(c).is_some()).map(String::from)),
                    _ => {}
                }
            }
        }
        ctx.results = codes;
        Ok(Some(ctx.results.len()))
    }

    fn filter_size(&self, ctx: &FilterExecutionContext) -> Option<usize> {
        Some(ctx.results.len())
    }

    fn filter_more(&self, ctx: &mut FilterExecutionContext) -> TerminologyResult<FilterPage> {
        ctx.begin_iterating();
        let (page, has_more) = ctx.next_page(DEFAULT_PAGE_SIZE);
        let handles = page.into_iter().filter_map(|code| self.locate(&code).context).collect();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_sensitive() {
        let provider = UsStatesProvider;
        assert!(provider.locate("CA").context.is_some());
        assert!(provider.locate("ca").context.is_none());
    }

    #[test]
    fn display_returns_the_full_name() {
        let provider = UsStatesProvider;
        let handle = provider.locate("PR").context.unwrap();
        assert_eq!(provider.display(&handle), Some("Puerto Rico".to_string()));
    }

    #[test]
    fn table_has_fifty_nine_entries() {
        assert_eq!(STATES.len(), 59);
    }
}
