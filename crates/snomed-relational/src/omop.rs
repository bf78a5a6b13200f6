//! OMOP vocabulary provider: a generic `domain=X` filter restricted to
//! standard concepts, plus translation materialisation through a fixed
//! vocabulary-id/URI table.

use rusqlite::{params_from_iter, Connection};
use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, SqlRowHandle};

use crate::schema::{sql_err, SqlFragment};

/// Maps an OMOP `vocabulary_id` to its canonical URI, and back. A fixed
/// table rather than a database column: OMOP's vocabulary ids are a
/// closed, versioned set maintained by the OHDSI vocabulary release.
const VOCABULARY_URIS: &[(&str, &str)] = &[
    ("SNOMED", "http://snomed.info/sct"),
    ("LOINC", "http://loinc.org"),
    ("RxNorm", "http://www.nlm.nih.gov/research/umls/rxnorm"),
    ("ICD10CM", "http://hl7.org/fhir/sid/icd-10-cm"),
    ("ICD9CM", "http://hl7.org/fhir/sid/icd-9-cm"),
    ("CPT4", "http://www.ama-assn.org/go/cpt"),
    ("NDC", "http://hl7.org/fhir/sid/ndc"),
];

fn uri_for_vocabulary(vocabulary_id: &str) -> Option<&'static str> {
    VOCABULARY_URIS.iter().find(|(id, _)| *id == vocabulary_id).map(|(_, uri)| *uri)
}

fn vocabulary_for_uri(uri: &str) -> Option<&'static str> {
    VOCABULARY_URIS.iter().find(|(_, u)| *u == uri).map(|(id, _)| *id)
}

/// A single materialised translation row:
/// `{uri, code, display, relationship, map}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmopTranslation {
    /// The target code system's URI.
    pub uri: String,
    /// The target code.
    pub code: String,
    /// The target display text, if known.
    pub display: Option<String>,
    /// Always `"equivalent"`: OMOP's concept_relationship table records
    /// a single cross-vocabulary mapping kind this provider exposes.
    pub relationship: String,
    /// The concept map identifier the translation was sourced from.
    pub map: String,
}

/// A provider over a single OMOP vocabulary_id's concepts.
pub struct OmopProvider {
    db_path: String,
    version: String,
    vocabulary_id: String,
}

impl OmopProvider {
    /// Creates a provider scoped to one `vocabulary_id` within the OMOP
    /// concept tables at `db_path`.
    pub fn new(db_path: impl Into<String>, version: impl Into<String>, vocabulary_id: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            version: version.into(),
            vocabulary_id: vocabulary_id.into(),
        }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Schema: `omop_concepts` keyed by `concept_code` within a
    /// `vocabulary_id`, plus `omop_relationships` for cross-vocabulary
    /// translations.
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS omop_concepts (
                concept_code TEXT NOT NULL,
                vocabulary_id TEXT NOT NULL,
                concept_name TEXT,
                domain_id TEXT,
                standard_concept TEXT,
                status TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS omop_relationships (
                source_code TEXT NOT NULL,
                source_vocabulary_id TEXT NOT NULL,
                target_code TEXT NOT NULL,
                target_vocabulary_id TEXT NOT NULL,
                map_id TEXT NOT NULL
            );",
        )
    }

    /// Materialises the translations for `code`: every row in
    /// `omop_relationships` with this concept as source, resolved to a
    /// target URI via the fixed vocabulary table.
    pub fn translations_for(&self, code: &str) -> TerminologyResult<Vec<OmopTranslation>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT r.target_code, r.target_vocabulary_id, r.map_id, c.concept_name
                 FROM omop_relationships r
                 LEFT JOIN omop_concepts c
                   ON c.concept_code = r.target_code AND c.vocabulary_id = r.target_vocabulary_id
                 WHERE r.source_code = ?1 AND r.source_vocabulary_id = ?2",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([code, &self.vocabulary_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(sql_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (target_code, target_vocabulary_id, map_id, display) = row.map_err(sql_err)?;
            let Some(uri) = uri_for_vocabulary(&target_vocabulary_id) else {
                continue;
            };
            out.push(OmopTranslation {
                uri: uri.to_string(),
                code: target_code,
                display,
                relationship: "equivalent".to_string(),
                map: map_id,
            });
        }
        Ok(out)
    }
}

impl CodeSystemProvider for OmopProvider {
    fn system(&self) -> &str {
        uri_for_vocabulary(&self.vocabulary_id).unwrap_or("http://omop.org/vocabulary")
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        &self.vocabulary_id
    }

    fn description(&self) -> &str {
        "OMOP standardized vocabulary concept"
    }

    fn total_count(&self) -> Option<usize> {
        let conn = self.connection().ok()?;
        conn.query_row(
            "SELECT COUNT(*) FROM omop_concepts WHERE vocabulary_id = ?1",
            [&self.vocabulary_id],
            |row| row.get::<_, i64>(0),
        )
        .ok()
        .map(|n| n as usize)
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
        let Ok(conn) = self.connection() else {
            return LocateResult::not_found("OMOP database unavailable");
        };
        let row = conn.query_row(
            "SELECT concept_code, concept_name, domain_id, status FROM omop_concepts
             WHERE concept_code = ?1 AND vocabulary_id = ?2",
            [code, self.vocabulary_id.as_str()],
            |row| {
                Ok(SqlRowHandle {
                    code: row.get::<_, String>(0)?,
                    display: row.get::<_, Option<String>>(1)?,
                    domain: row.get::<_, Option<String>>(2)?,
                    active: row.get::<_, String>(3)? == "ACTIVE",
                })
            },
        );
        match row {
            Ok(handle) => LocateResult::found(ConceptHandle::SqlRow(handle)),
            Err(_) => LocateResult::not_found(format!("no such {} code: {code}", self.vocabulary_id)),
        }
    }

    fn code(&self, handle: &ConceptHandle) -> String {
        handle.code()
    }

    fn display(&self, handle: &ConceptHandle) -> Option<String> {
        match handle {
            ConceptHandle::SqlRow(h) => h.display.clone(),
            _ => None,
        }
    }

    fn definition(&self, _handle: &ConceptHandle) -> Option<String> {
        None
    }

    fn status(&self, handle: &ConceptHandle) -> ConceptStatus {
        match handle {
            ConceptHandle::SqlRow(h) => ConceptStatus {
                is_abstract: false,
                is_inactive: !h.active,
                is_deprecated: false,
            },
            _ => ConceptStatus::default(),
        }
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
        match handle {
            ConceptHandle::SqlRow(h) => h
                .domain
                .as_ref()
                .map(|d| {
                    vec![ConceptProperty {
                        name: "domain".to_string(),
                        value: d.clone(),
                    }]
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!((property, op), ("domain", "="))
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
        let conn = self.connection()?;
        let mut frag = SqlFragment::new();
        frag.equals("t.vocabulary_id", self.vocabulary_id.clone());
        frag.equals("t.standard_concept", "S".to_string());

        for descriptor in &ctx.descriptors {
            match descriptor {
                FilterDescriptor::Property { property, value, .. } if property == "domain" => {
                    frag.equals("t.domain_id", value.clone());
                }
                other => {
                    return Err(TerminologyError::UnsupportedFilter {
                        operation: format!("{other:?}"),
                    })
                }
            }
        }

        let sql = frag.compose("omop_concepts", "t.concept_code");
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let codes: Vec<String> = stmt
            .query_map(params_from_iter(frag.params.iter()), |row| row.get::<_, String>(0))
            .map_err(sql_err)?
            .collect::<Result<_, _>>()
            .map_err(sql_err)?;

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

    fn seeded_provider(path: &std::path::Path) -> OmopProvider {
        let conn = Connection::open(path).unwrap();
        OmopProvider::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO omop_concepts (concept_code, vocabulary_id, concept_name, domain_id, standard_concept, status) VALUES
             ('320128', 'SNOMED', 'Essential hypertension', 'Condition', 'S', 'ACTIVE'),
             ('38341003', 'SNOMED', 'Hypertensive disorder', 'Condition', 'N', 'ACTIVE')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO omop_relationships (source_code, source_vocabulary_id, target_code, target_vocabulary_id, map_id) VALUES
             ('320128', 'SNOMED', '59621000', 'SNOMED', 'map-1')",
            [],
        )
        .unwrap();
        OmopProvider::new(path.to_string_lossy().to_string(), "v5".to_string(), "SNOMED".to_string())
    }

    #[test]
    fn domain_filter_only_returns_standard_concepts() {
        let dir = std::env::temp_dir().join(format!("omop-test-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        let mut ctx = provider.prep_context(false);
        provider.filter(&mut ctx, "domain", "=", "Condition").unwrap();
        let count = provider.execute_filters(&mut ctx).unwrap();
        assert_eq!(count, Some(1));
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn translations_resolve_target_vocabulary_to_a_uri() {
        let dir = std::env::temp_dir().join(format!("omop-test2-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        let translations = provider.translations_for("320128").unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].uri, "http://snomed.info/sct");
        assert_eq!(translations[0].relationship, "equivalent");
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn vocabulary_for_uri_round_trips() {
        assert_eq!(vocabulary_for_uri("http://loinc.org"), Some("LOINC"));
        assert_eq!(vocabulary_for_uri("http://example.com/unknown"), None);
    }
}
