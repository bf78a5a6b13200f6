//! HGVS provider: `http://varnomen.hgvs.org` has no local store at all.
//! `locate` delegates to a remote FHIR `$validate-code` operation with a
//! hard 5-second timeout and parses the returned `Parameters` resource.
//! There is no iteration and no filtering — every `does_filter` call
//! returns `false`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::FilterExecutionContext;
use snomed_provider::handle::{ConceptHandle, LocateResult, StringHandle};

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// The parts of a FHIR `$validate-code` `Parameters` response this
/// provider reads: whether the code validated, and its display term if
/// the server returned one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ValidateCodeResult {
    result: bool,
    display: Option<String>,
    message: Option<String>,
}

/// Reads `result`/`display`/`message` out of a FHIR `Parameters`
/// resource's `parameter` array, ignoring everything else.
fn parse_parameters(body: &Value) -> Option<ValidateCodeResult> {
    let params = body.get("parameter")?.as_array()?;
    let mut out = ValidateCodeResult::default();
    for param in params {
        let name = param.get("name")?.as_str()?;
        match name {
            "result" => out.result = param.get("valueBoolean").and_then(Value::as_bool).unwrap_or(false),
            "display" => out.display = param.get("valueString").and_then(Value::as_str).map(str::to_string),
            "message" => out.message = param.get("valueString").and_then(Value::as_str).map(str::to_string),
            _ => {}
        }
    }
    Some(out)
}

/// A provider over the remote HGVS nomenclature validation service.
pub struct HgvsProvider {
    base_url: String,
    client: Client,
}

impl HgvsProvider {
    /// Creates a provider that validates codes against `$validate-code`
    /// at `base_url`.
    pub fn new(base_url: impl Into<String>) -> TerminologyResult<Self> {
        let client = Client::builder()
            .timeout(VALIDATE_TIMEOUT)
            .build()
            .map_err(|e| TerminologyError::BackendFailure(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn validate(&self, code: &str) -> TerminologyResult<ValidateCodeResult> {
        let url = format!("{}/CodeSystem/$validate-code", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("system", "http://varnomen.hgvs.org"), ("code", code)])
            .send()
            .map_err(|e| TerminologyError::BackendFailure(e.to_string()))?;
        let body: Value = response.json().map_err(|e| TerminologyError::BackendFailure(e.to_string()))?;
        parse_parameters(&body).ok_or_else(|| TerminologyError::BackendFailure("malformed Parameters response".to_string()))
    }
}

impl CodeSystemProvider for HgvsProvider {
    fn system(&self) -> &str {
        "http://varnomen.hgvs.org"
    }

    fn version(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "HGVS"
    }

    fn description(&self) -> &str {
        "Human Genome Variation Society sequence variant nomenclature"
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
        match self.validate(code) {
            Ok(result) if result.result => LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: code.to_string() })),
            Ok(result) => LocateResult::not_found(result.message.unwrap_or_else(|| format!("{code} did not validate"))),
            Err(e) => LocateResult::not_found(e.to_string()),
        }
    }

    fn code(&self, handle: &ConceptHandle) -> String {
        handle.code()
    }

    fn display(&self, handle: &ConceptHandle) -> Option<String> {
        self.validate(&handle.code()).ok().and_then(|r| r.display)
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
    fn parses_a_successful_validate_code_response() {
        let body = serde_json::json!({
            "resourceType": "Parameters",
            "parameter": [
                {"name": "result", "valueBoolean": true},
                {"name": "display", "valueString": "NM_004006.2:c.4375C>T"}
            ]
        });
        let result = parse_parameters(&body).unwrap();
        assert!(result.result);
        assert_eq!(result.display.as_deref(), Some("NM_004006.2:c.4375C>T"));
    }

    #[test]
    fn parses_a_failed_validate_code_response() {
        let body = serde_json::json!({
            "resourceType": "Parameters",
            "parameter": [
                {"name": "result", "valueBoolean": false},
                {"name": "message", "valueString": "unparseable HGVS expression"}
            ]
        });
        let result = parse_parameters(&body).unwrap();
        assert!(!result.result);
        assert_eq!(result.message.as_deref(), Some("unparseable HGVS expression"));
    }

    #[test]
    fn missing_parameter_array_fails_to_parse() {
        assert!(parse_parameters(&serde_json::json!({"resourceType": "Parameters"})).is_none());
    }
}
