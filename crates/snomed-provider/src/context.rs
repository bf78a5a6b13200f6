//! Operation context: language-chain negotiation, display
//! selection order, and designation de-duplication, shared across every
//! provider call within one request rather than recomputed per concept.

use std::collections::BTreeSet;

use snomed_loader::Designation;

use crate::params::VersionRule;

/// One version rule resolved for a `(system, version)` pair, carried from
/// [`crate::params::RequestParams`] into the operation context so a
/// provider can apply `check`/`override`/`default` without re-parsing the
/// raw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemVersionRule {
    /// The rule, as parsed.
    pub rule: VersionRule,
}

/// Per-request context every provider call receives: the caller's
/// language preferences, the system-version rules in force, and a
/// translator hook for locale-aware messages.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Requested display-language chain, most preferred first (from
    /// `displayLanguage` or a FHIR `_format`-style Accept-Language chain).
    pub requested_languages: Vec<String>,
    /// The HTTP `Accept-Language` chain, kept separate from
    /// `requested_languages` since the two negotiate independently before
    /// being merged for display selection.
    pub http_languages: Vec<String>,
    /// Version rules in force for this request, keyed by system URI.
    pub version_rules: Vec<VersionRule>,
}

impl OperationContext {
    /// Builds a context from an already-parsed language chain.
    pub fn new(requested_languages: Vec<String>) -> Self {
        Self {
            requested_languages,
            http_languages: Vec::new(),
            version_rules: Vec::new(),
        }
    }

    /// The full negotiated language preference order: the explicit
    /// request chain first, then the HTTP chain for anything the request
    /// didn't already name.
    pub fn language_chain(&self) -> Vec<String> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut chain = Vec::new();
        for lang in self.requested_languages.iter().chain(self.http_languages.iter()) {
            if seen.insert(lang.clone()) {
                chain.push(lang.clone());
            }
        }
        chain
    }

    /// True if `tag` (a designation's language) partially matches `want`
    /// (a requested language), per the region-collapsed comparison rule:
    /// `en` matches `en-US`, and `en-US` matches `en-US` or `en`.
    fn language_matches(want: &str, tag: &str) -> bool {
        let want_primary = want.split('-').next().unwrap_or(want);
        let tag_primary = tag.split('-').next().unwrap_or(tag);
        if want_primary != tag_primary {
            return false;
        }
        if want.contains('-') && tag.contains('-') {
            want.eq_ignore_ascii_case(tag)
        } else {
            true
        }
    }

    /// The version rule registered for `system`, if any.
    pub fn version_rule_for(&self, system: &str) -> Option<&VersionRule> {
        self.version_rules.iter().find(|r| r.system == system)
    }

    /// Picks the best display term from a concept's full designation set,
    /// following the selection order: a supplement-provided term first,
    /// then a native term in the requested language, then a native term
    /// in any language. `supplement` stands in for a caller-provided
    /// display override (a language/jurisdiction supplement attached to
    /// the code system).
    pub fn select_display<'a>(&self, designations: &'a [Designation], supplement: Option<&'a str>) -> Option<&'a str> {
        if let Some(text) = supplement {
            return Some(text);
        }

        for want in self.language_chain() {
            if let Some(d) = designations.iter().find(|d| Self::language_matches(&want, &d.language)) {
                return Some(&d.value);
            }
        }

        designations.first().map(|d| d.value.as_str())
    }

    /// De-duplicates a designation list by `(language, use, value)`,
    /// preserving first-seen order.
    pub fn dedup_designations(designations: Vec<Designation>) -> Vec<Designation> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for d in designations {
            let key = (d.language.clone(), d.use_id, d.value.clone());
            if seen.insert(key) {
                out.push(d);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn designation(language: &str, value: &str) -> Designation {
        Designation {
            language: language.to_string(),
            use_id: 900000000000003001,
            value: value.to_string(),
        }
    }

    #[test]
    fn language_chain_deduplicates_across_requested_and_http() {
        let mut ctx = OperationContext::new(vec!["en-US".to_string()]);
        ctx.http_languages = vec!["en-US".to_string(), "fr".to_string()];
        assert_eq!(ctx.language_chain(), vec!["en-US".to_string(), "fr".to_string()]);
    }

    #[test]
    fn select_display_prefers_requested_language_over_any_language() {
        let ctx = OperationContext::new(vec!["fr".to_string()]);
        let designations = vec![designation("en", "Heart attack"), designation("fr", "Infarctus")];
        assert_eq!(ctx.select_display(&designations, None), Some("Infarctus"));
    }

    #[test]
    fn select_display_falls_back_to_any_language_when_no_match() {
        let ctx = OperationContext::new(vec!["de".to_string()]);
        let designations = vec![designation("en", "Heart attack")];
        assert_eq!(ctx.select_display(&designations, None), Some("Heart attack"));
    }

    #[test]
    fn select_display_prefers_supplement_above_all() {
        let ctx = OperationContext::new(vec!["en".to_string()]);
        let designations = vec![designation("en", "Heart attack")];
        assert_eq!(ctx.select_display(&designations, Some("Custom display")), Some("Custom display"));
    }

    #[test]
    fn region_collapsed_match_accepts_bare_primary_tag_request() {
        assert!(OperationContext::language_matches("en", "en-US"));
        assert!(OperationContext::language_matches("en-US", "en-US"));
        assert!(!OperationContext::language_matches("en-GB", "en-US"));
    }

    #[test]
    fn dedup_designations_drops_exact_repeats() {
        let list = vec![designation("en", "Heart attack"), designation("en", "Heart attack"), designation("en", "Myocardial infarction")];
        let deduped = OperationContext::dedup_designations(list);
        assert_eq!(deduped.len(), 2);
    }
}
