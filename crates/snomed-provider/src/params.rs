//! Request-parameter surface: turns the raw `(key, [values])` pairs
//! a caller supplies into a typed [`RequestParams`], leaving anything this
//! core doesn't recognise untouched in `passthrough`.

use std::collections::HashMap;

/// How a `system-version`-family parameter constrains version selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRuleMode {
    /// `system-version`: use this version unless something else overrides it.
    Default,
    /// `check-system-version`: fail with `VersionMismatch` if the resolved
    /// version doesn't match.
    Check,
    /// `force-system-version` / `valueset-version`: use this version
    /// regardless of what else was requested.
    Override,
}

/// One version constraint registered against a `system|version` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRule {
    /// The system URI the rule applies to.
    pub system: String,
    /// The version string the rule names.
    pub version: String,
    /// The rule's mode.
    pub mode: VersionRuleMode,
}

/// Pagination bounds (`count`/`offset`/`limit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Maximum number of results to return, if bounded.
    pub count: Option<usize>,
    /// Number of leading results to skip.
    pub offset: usize,
    /// A hard cap distinct from `count` (some callers pass both).
    pub limit: Option<usize>,
}

/// The boolean expansion toggles from the request-parameter table,
/// grouped together since every caller that sets one tends to set several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpansionFlags {
    /// Restrict results to active concepts only.
    pub active_only: bool,
    /// Exclude nested/grouped results from an expansion.
    pub exclude_nested: bool,
    /// Cap expansion size defensively rather than exhaustively enumerate.
    pub limited_expansion: bool,
    /// Drop concepts marked not-for-UI-selection.
    pub exclude_not_for_ui: bool,
    /// Drop post-coordinated expressions from the result set.
    pub exclude_post_coordinated: bool,
    /// Include designations in the response.
    pub include_designations: bool,
    /// Include the formal definition in the response.
    pub include_definition: bool,
    /// Fall back to the system's latest version when no version is
    /// pinned, rather than erroring.
    pub default_to_latest_version: bool,
    /// Tolerate partial results rather than failing the whole request.
    pub incomplete_ok: bool,
    /// Accept a display term that doesn't match any known designation.
    pub lenient_display_validation: bool,
    /// Restrict matches to value-set membership only, skipping a full
    /// code-system lookup.
    pub valueset_membership_only: bool,
}

/// A fully parsed request. Construct via [`RequestParams::parse`].
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Registered version rules, in the order they were parsed.
    pub version_rules: Vec<VersionRule>,
    /// Display-language chain, most preferred first.
    pub display_language: Vec<String>,
    /// Requested designation `use`s (FSN, Synonym, ...), repeatable.
    pub designations: Vec<String>,
    /// Requested lookup property subset, repeatable.
    pub properties: Vec<String>,
    /// The boolean expansion toggles.
    pub flags: ExpansionFlags,
    /// Free-text search input (`filter` or `term`, whichever was given).
    pub search_text: Option<String>,
    /// Pagination bounds.
    pub pagination: Pagination,
    /// Forces a fresh expansion identity, bypassing any cache.
    pub no_cache: bool,
    /// Recognised-but-unconsumed parameters, passed through unchanged.
    pub passthrough: HashMap<String, Vec<String>>,
}

impl RequestParams {
    /// Parses a raw multimap of request parameters (as a CLI flag set or
    /// an HTTP query string would hand them over) into typed fields.
    /// Parameters not recognised by name land in `passthrough` verbatim.
    pub fn parse(raw: &HashMap<String, Vec<String>>) -> Self {
        let mut params = RequestParams::default();

        for (key, values) in raw {
            match key.as_str() {
                "system-version" => params.push_version_rules(values, VersionRuleMode::Default),
                "check-system-version" => params.push_version_rules(values, VersionRuleMode::Check),
                "force-system-version" => params.push_version_rules(values, VersionRuleMode::Override),
                "valueset-version" => params.push_version_rules(values, VersionRuleMode::Override),
                "displayLanguage" => {
                    params.display_language = values.iter().flat_map(|v| v.split(',')).map(str::trim).map(String::from).collect();
                }
                "designation" => params.designations.extend(values.iter().cloned()),
                "property" => params.properties.extend(values.iter().cloned()),
                "filter" | "term" => {
                    if params.search_text.is_none() {
                        params.search_text = values.first().cloned();
                    }
                }
                "count" => params.pagination.count = values.first().and_then(|v| v.parse().ok()),
                "offset" => params.pagination.offset = values.first().and_then(|v| v.parse().ok()).unwrap_or(0),
                "limit" => params.pagination.limit = values.first().and_then(|v| v.parse().ok()),
                "no-cache" => params.no_cache = is_truthy(values),
                "activeOnly" => params.flags.active_only = is_truthy(values),
                "excludeNested" => params.flags.exclude_nested = is_truthy(values),
                "limitedExpansion" => params.flags.limited_expansion = is_truthy(values),
                "excludeNotForUI" => params.flags.exclude_not_for_ui = is_truthy(values),
                "excludePostCoordinated" => params.flags.exclude_post_coordinated = is_truthy(values),
                "includeDesignations" => params.flags.include_designations = is_truthy(values),
                "includeDefinition" => params.flags.include_definition = is_truthy(values),
                "default-to-latest-version" => params.flags.default_to_latest_version = is_truthy(values),
                "incomplete-ok" => params.flags.incomplete_ok = is_truthy(values),
                "lenient-display-validation" => params.flags.lenient_display_validation = is_truthy(values),
                "valueset-membership-only" => params.flags.valueset_membership_only = is_truthy(values),
                _ => {
                    params.passthrough.insert(key.clone(), values.clone());
                }
            }
        }

        params
    }

    fn push_version_rules(&mut self, values: &[String], mode: VersionRuleMode) {
        for raw in values {
            if let Some((system, version)) = raw.split_once('|') {
                self.version_rules.push(VersionRule {
                    system: system.to_string(),
                    version: version.to_string(),
                    mode: mode.clone(),
                });
            }
        }
    }
}

fn is_truthy(values: &[String]) -> bool {
    match values.first().map(String::as_str) {
        None => true,
        Some("false") | Some("0") | Some("") => false,
        Some(_) => true,
    }
}
