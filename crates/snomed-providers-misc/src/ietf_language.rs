//! IETF language provider: `urn:ietf:bcp:47` parses a BCP-47 tag into its
//! subtag components. The value set is grammar-based, not enumerable, so
//! the only filters this provider supports ask whether a given subtag
//! component is present: `{language, ext-lang, script, region, variant,
//! extension, private-use} exists true|false`.

use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext};
use snomed_provider::handle::{ConceptHandle, LocateResult, StringHandle};

/// The subtag components of a parsed BCP-47 language tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageTag {
    /// The full tag as supplied, lower-cased.
    pub raw: String,
    /// The primary language subtag (e.g. `en`).
    pub language: Option<String>,
    /// An extended language subtag (e.g. `yue` in `zh-yue`).
    pub ext_lang: Option<String>,
    /// A 4-letter script subtag (e.g. `hant`).
    pub script: Option<String>,
    /// A region subtag (2-letter or 3-digit, e.g. `us`).
    pub region: Option<String>,
    /// Variant subtags.
    pub variant: Vec<String>,
    /// `x-...`/singleton extension subtags.
    pub extension: Vec<String>,
    /// The `x-` private-use subtags, if present.
    pub private_use: Vec<String>,
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_script(s: &str) -> bool {
    s.len() == 4 && is_alpha(s)
}

fn is_region(s: &str) -> bool {
    (s.len() == 2 && is_alpha(s)) || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
}

fn is_variant(s: &str) -> bool {
    (s.len() >= 5 && s.len() <= 8 && s.chars().all(|c| c.is_ascii_alphanumeric()))
        || (s.len() == 4 && s.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false))
}

/// Parses a BCP-47 tag into its subtag components. Returns `None` if the
/// tag has no valid primary language subtag at all.
pub fn parse(tag: &str) -> Option<LanguageTag> {
    let raw = tag.to_ascii_lowercase();
    let mut subtags = raw.split('-').peekable();

    let language = subtags.next().filter(|s| is_alpha(s) && s.len() >= 2 && s.len() <= 8)?;
    let mut parsed = LanguageTag {
        raw: raw.clone(),
        language: Some(language.to_string()),
        ..Default::default()
    };

    if let Some(next) = subtags.peek() {
        if next.len() == 3 && is_alpha(next) {
            parsed.ext_lang = Some(next.to_string());
            subtags.next();
        }
    }
    if let Some(next) = subtags.peek() {
        if is_script(next) {
            parsed.script = Some(next.to_string());
            subtags.next();
        }
    }
    if let Some(next) = subtags.peek() {
        if is_region(next) {
            parsed.region = Some(next.to_string());
            subtags.next();
        }
    }

    let mut in_private_use = false;
    for subtag in subtags {
        if subtag == "x" {
            in_private_use = true;
            continue;
        }
        if in_private_use {
            parsed.private_use.push(subtag.to_string());
        } else if is_variant(subtag) {
            parsed.variant.push(subtag.to_string());
        } else {
            parsed.extension.push(subtag.to_string());
        }
    }

    Some(parsed)
}

fn component_present(tag: &LanguageTag, component: &str) -> Option<bool> {
    match component {
        "language" => Some(tag.language.is_some()),
        "ext-lang" => Some(tag.ext_lang.is_some()),
        "script" => Some(tag.script.is_some()),
        "region" => Some(tag.region.is_some()),
        "variant" => Some(!tag.variant.is_empty()),
        "extension" => Some(!tag.extension.is_empty()),
        "private-use" => Some(!tag.private_use.is_empty()),
        _ => None,
    }
}

const COMPONENTS: &[&str] = &["language", "ext-lang", "script", "region", "variant", "extension", "private-use"];

/// A provider over the BCP-47 language tag grammar.
#[derive(Debug, Default)]
pub struct IetfLanguageProvider;

impl CodeSystemProvider for IetfLanguageProvider {
    fn system(&self) -> &str {
        "urn:ietf:bcp:47"
    }

    fn version(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "IETF language"
    }

    fn description(&self) -> &str {
        "BCP-47 language tags, validated by grammar"
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
        match parse(code) {
            Some(tag) => LocateResult::found(ConceptHandle::StringLiteral(StringHandle { code: tag.raw })),
            None => LocateResult::not_found(format!("not a valid BCP-47 tag: {code}")),
        }
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

    fn properties(&self, handle: &ConceptHandle) -> Vec<ConceptProperty> {
        let Some(tag) = parse(&handle.code()) else {
            return Vec::new();
        };
        COMPONENTS
            .iter()
            .filter_map(|c| component_present(&tag, c).filter(|present| *present).map(|_| c))
            .map(|c| ConceptProperty {
                name: c.to_string(),
                value: "true".to_string(),
            })
            .collect()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        op == "exists" && COMPONENTS.contains(&property)
    }

    fn filter(
        &self,
        ctx: &mut FilterExecutionContext,
        property: &str,
        op: &str,
        value: &str,
    ) -> TerminologyResult<()> {
        if !self.does_filter(property, op) || !matches!(value, "true" | "false") {
            return Err(TerminologyError::UnsupportedFilter {
                operation: format!("{property} {op} {value}"),
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
        let matches_all = ctx.descriptors.iter().all(|d| match d {
            FilterDescriptor::Property { property, value, .. } => parse(code)
                .and_then(|tag| component_present(&tag, property))
                .map(|present| present.to_string() == *value)
                .unwrap_or(false),
            _ => true,
        });
        if matches_all {
            self.locate(code)
        } else {
            LocateResult::not_found(format!("{code} does not satisfy this filter's component constraints"))
        }
    }

    fn filter_check(&self, ctx: &FilterExecutionContext, handle: &ConceptHandle) -> bool {
        ctx.assert_locate_or_check_allowed();
        self.filter_locate(ctx, &handle.code()).context.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_script_region() {
        let tag = parse("zh-Hant-TW").unwrap();
        assert_eq!(tag.language.as_deref(), Some("zh"));
        assert_eq!(tag.script.as_deref(), Some("hant"));
        assert_eq!(tag.region.as_deref(), Some("tw"));
    }

    #[test]
    fn region_exists_filter_matches_tagged_codes_only() {
        let provider = IetfLanguageProvider;
        let mut ctx = provider.prep_context(false);
        provider.filter(&mut ctx, "region", "exists", "true").unwrap();
        provider.execute_filters(&mut ctx).unwrap();
        assert!(provider.filter_locate(&ctx, "en-US").context.is_some());
        assert!(provider.filter_locate(&ctx, "en").context.is_none());
    }

    #[test]
    fn malformed_tag_does_not_locate() {
        let provider = IetfLanguageProvider;
        assert!(provider.locate("123").context.is_none());
    }
}
