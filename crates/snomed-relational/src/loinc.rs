//! LOINC provider: a laboratory/clinical observation code system
//! backed by a `loinc_concepts` table plus one `loinc_relationships` edge
//! table that the concept-property and `answers-for` filters both read.

use rusqlite::{params_from_iter, Connection};
use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, SqlRowHandle};

use crate::schema::{sql_err, SqlFragment};

/// LOINC's `copyright` pseudo-property: `property-type-9` rows mark a
/// code as 3rd-party-licensed content; its absence means plain LOINC.
const COPYRIGHT_PROPERTY_TYPE: &str = "9";

/// A provider over a LOINC database loaded at `db_path`.
pub struct LoincProvider {
    db_path: String,
    version: String,
}

impl LoincProvider {
    /// Creates a provider for the LOINC release at `db_path`. The schema
    /// is assumed already populated (`loinc_concepts`, `loinc_relationships`,
    /// `loinc_properties`); this crate doesn't own ingestion, only
    /// serving.
    pub fn new(db_path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            version: version.into(),
        }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Creates the schema this provider expects, for tests and for a
    /// fresh in-memory database.
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS loinc_concepts (
                code TEXT PRIMARY KEY,
                long_common_name TEXT,
                status TEXT NOT NULL,
                classtype INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS loinc_relationships (
                code TEXT NOT NULL,
                rel_type TEXT NOT NULL,
                target TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS loinc_properties (
                code TEXT NOT NULL,
                property_type TEXT NOT NULL,
                value TEXT
            );",
        )
    }
}

fn classtype_label(classtype: i64) -> &'static str {
    match classtype {
        1 => "Laboratory class",
        2 => "Clinical class",
        3 => "Claims attachments",
        4 => "Surveys",
        _ => "Unknown class",
    }
}

impl CodeSystemProvider for LoincProvider {
    fn system(&self) -> &str {
        "http://loinc.org"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        "LOINC"
    }

    fn description(&self) -> &str {
        "Logical Observation Identifiers Names and Codes"
    }

    fn total_count(&self) -> Option<usize> {
        let conn = self.connection().ok()?;
        conn.query_row("SELECT COUNT(*) FROM loinc_concepts", [], |row| row.get::<_, i64>(0))
            .ok()
            .map(|n| n as usize)
    }

    fn is_case_sensitive(&self) -> bool {
        false
    }

    fn has_parents(&self) -> bool {
        false
    }

    fn is_not_closed(&self) -> bool {
        false
    }

    fn locate(&self, code: &str) -> LocateResult {
        let Ok(conn) = self.connection() else {
            return LocateResult::not_found("LOINC database unavailable");
        };
        let row = conn.query_row(
            "SELECT code, long_common_name, status FROM loinc_concepts WHERE code = ?1",
            [code],
            |row| {
                Ok(SqlRowHandle {
                    code: row.get(0)?,
                    display: row.get(1)?,
                    domain: None,
                    active: row.get::<_, String>(2)? == "ACTIVE",
                })
            },
        );
        match row {
            Ok(handle) => LocateResult::found(ConceptHandle::SqlRow(handle)),
            Err(_) => LocateResult::not_found(format!("no such LOINC code: {code}")),
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
        let ConceptHandle::SqlRow(h) = handle else {
            return Vec::new();
        };
        let Ok(conn) = self.connection() else {
            return Vec::new();
        };
        let mut stmt = match conn.prepare("SELECT classtype FROM loinc_concepts WHERE code = ?1") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        let classtype: Option<i64> = stmt.query_row([&h.code], |row| row.get(0)).ok();
        classtype
            .map(|c| {
                vec![ConceptProperty {
                    name: "CLASSTYPE".to_string(),
                    value: classtype_label(c).to_string(),
                }]
            })
            .unwrap_or_default()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!(
            (property, op),
            ("STATUS", "=")
                | ("LIST", "in")
                | ("answers-for", "=")
                | ("CLASSTYPE", "=")
                | ("concept", "is-a")
                | ("concept", "descendent-of")
                | ("concept", "=")
                | ("concept", "in")
                | ("code", "is-a")
                | ("code", "descendent-of")
                | ("code", "=")
                | ("code", "in")
                | ("copyright", "=")
        ) || op == "exists"
            || op == "regex"
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

        for descriptor in &ctx.descriptors {
            match descriptor {
                FilterDescriptor::Property { property, op, value } => {
                    self.apply_property_filter(&mut frag, property, op, value)?;
                }
                FilterDescriptor::Search { text } => {
                    frag.like("t.long_common_name", format!("%{text}%"));
                }
                FilterDescriptor::Special { name, value } => {
                    if name == "answers-for" {
                        frag.join("JOIN loinc_relationships r ON r.code = t.code");
                        frag.equals("r.rel_type", "answers-for".to_string());
                        frag.equals("r.target", value.clone());
                    } else {
                        return Err(TerminologyError::UnsupportedFilter { operation: name.clone() });
                    }
                }
            }
        }

        let sql = frag.compose("loinc_concepts", "t.code");
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
        let handles = page
            .into_iter()
            .map(|code| match self.locate(&code).context {
                Some(handle) => handle,
                None => ConceptHandle::SqlRow(SqlRowHandle {
                    code,
                    display: None,
                    domain: None,
                    active: false,
                }),
            })
            .collect();
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

impl LoincProvider {
    fn apply_property_filter(&self, frag: &mut SqlFragment, property: &str, op: &str, value: &str) -> TerminologyResult<()> {
        match (property, op) {
            ("STATUS", "=") => frag.equals("t.status", value.to_string()),
            ("CLASSTYPE", "=") => {
                let code = match value {
                    "Laboratory class" => 1,
                    "Clinical class" => 2,
                    "Claims attachments" => 3,
                    "Surveys" => 4,
                    _ => return Err(TerminologyError::UnsupportedFilter { operation: format!("CLASSTYPE = {value}") }),
                };
                frag.equals("t.classtype", code);
            }
            ("LIST", "in") => frag.is_in("t.code", &value.split(',').map(str::trim).map(String::from).collect::<Vec<_>>()),
            ("concept", "=") | ("code", "=") => frag.equals("t.code", value.to_string()),
            ("concept", "in") | ("code", "in") => {
                frag.is_in("t.code", &value.split(',').map(str::trim).map(String::from).collect::<Vec<_>>())
            }
            ("concept", "is-a") | ("code", "is-a") | ("concept", "descendent-of") | ("code", "descendent-of") => {
                // LOINC has no hierarchy of its own; treat is-a/descendent-of
                // as exact-match so these pseudo-properties behave
                // consistently without pretending to traverse a real tree.
                frag.equals("t.code", value.to_string());
            }
            ("copyright", "=") => {
                frag.join("LEFT JOIN loinc_properties cp ON cp.code = t.code AND cp.property_type = '9'");
                if value == "3rdParty" {
                    frag.not_null("cp.code");
                } else {
                    frag.is_null("cp.code");
                }
            }
            _ => {
                return Err(TerminologyError::UnsupportedFilter {
                    operation: format!("{property} {op}"),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A `LoincProvider` opens a fresh connection per request, so
    // tests seed a temp-file-backed database rather than `:memory:`,
    // which rusqlite scopes to a single connection.
    fn seeded_file_provider(path: &std::path::Path) -> LoincProvider {
        let conn = Connection::open(path).unwrap();
        LoincProvider::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO loinc_concepts (code, long_common_name, status, classtype) VALUES
             ('4548-4', 'Hemoglobin A1c/Hemoglobin.total in Blood', 'ACTIVE', 1),
             ('8302-2', 'Body height', 'ACTIVE', 2)",
            [],
        )
        .unwrap();
        LoincProvider::new(path.to_string_lossy().to_string(), "2.78".to_string())
    }

    #[test]
    fn locate_finds_a_seeded_code() {
        let dir = std::env::temp_dir().join(format!("loinc-test-{}.db", std::process::id()));
        let provider = seeded_file_provider(&dir);
        let result = provider.locate("4548-4");
        assert!(result.context.is_some());
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn classtype_filter_restricts_to_matching_rows() {
        let dir = std::env::temp_dir().join(format!("loinc-test2-{}.db", std::process::id()));
        let provider = seeded_file_provider(&dir);
        let mut ctx = provider.prep_context(true);
        provider.filter(&mut ctx, "CLASSTYPE", "=", "Laboratory class").unwrap();
        provider.execute_filters(&mut ctx).unwrap();
        assert_eq!(ctx.results, vec!["4548-4".to_string()]);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn unsupported_filter_combination_is_rejected() {
        let dir = std::env::temp_dir().join(format!("loinc-test3-{}.db", std::process::id()));
        let provider = seeded_file_provider(&dir);
        let mut ctx = provider.prep_context(false);
        let err = provider.filter(&mut ctx, "bogus", "~", "x");
        assert!(err.is_err());
        let _ = std::fs::remove_file(&dir);
    }
}
