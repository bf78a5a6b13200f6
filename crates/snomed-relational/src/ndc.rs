//! NDC (National Drug Code) provider: packages carry both a
//! 10-digit hyphenated and an 11-digit non-hyphenated form; `locate`
//! accepts either.

use rusqlite::{params_from_iter, Connection};
use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, SqlRowHandle};

use crate::schema::{sql_err, SqlFragment};

/// A provider over NDC package/product data.
pub struct NdcProvider {
    db_path: String,
    version: String,
}

impl NdcProvider {
    /// Creates a provider over the NDC database at `db_path`.
    pub fn new(db_path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            version: version.into(),
        }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Schema: one row per package, carrying both code forms plus a
    /// `code_type` discriminator (`10-digit` / `11-digit` / `product`).
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ndc_packages (
                ndc_10 TEXT,
                ndc_11 TEXT,
                product_code TEXT,
                proprietary_name TEXT,
                code_type TEXT NOT NULL,
                status TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ndc_10_idx ON ndc_packages(ndc_10);
            CREATE INDEX IF NOT EXISTS ndc_11_idx ON ndc_packages(ndc_11);",
        )
    }

    fn row_to_handle(row: &rusqlite::Row) -> rusqlite::Result<SqlRowHandle> {
        let ndc_10: Option<String> = row.get(0)?;
        let ndc_11: Option<String> = row.get(1)?;
        let name: Option<String> = row.get(3)?;
        let status: String = row.get(5)?;
        Ok(SqlRowHandle {
            code: ndc_11.or(ndc_10).unwrap_or_default(),
            display: name,
            domain: None,
            active: status == "ACTIVE",
        })
    }
}

impl CodeSystemProvider for NdcProvider {
    fn system(&self) -> &str {
        "http://hl7.org/fhir/sid/ndc"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        "NDC"
    }

    fn description(&self) -> &str {
        "FDA National Drug Code directory"
    }

    fn total_count(&self) -> Option<usize> {
        let conn = self.connection().ok()?;
        conn.query_row("SELECT COUNT(*) FROM ndc_packages", [], |row| row.get::<_, i64>(0))
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
            return LocateResult::not_found("NDC database unavailable");
        };
        let row = conn.query_row(
            "SELECT ndc_10, ndc_11, product_code, proprietary_name, code_type, status FROM ndc_packages
             WHERE ndc_10 = ?1 OR ndc_11 = ?1",
            [code],
            Self::row_to_handle,
        );
        match row {
            Ok(handle) => LocateResult::found(ConceptHandle::SqlRow(handle)),
            Err(_) => LocateResult::not_found(format!("no such NDC code: {code}")),
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

    fn properties(&self, _handle: &ConceptHandle) -> Vec<ConceptProperty> {
        Vec::new()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!((property, op), ("code-type", "="))
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
        if !matches!(value, "10-digit" | "11-digit" | "product") {
            return Err(TerminologyError::UnsupportedFilter {
                operation: format!("code-type = {value}"),
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
                FilterDescriptor::Property { property, value, .. } if property == "code-type" => {
                    frag.equals("t.code_type", value.clone());
                }
                FilterDescriptor::Search { text } => frag.like("t.proprietary_name", format!("%{text}%")),
                other => {
                    return Err(TerminologyError::UnsupportedFilter {
                        operation: format!("{other:?}"),
                    })
                }
            }
        }

        let sql = frag.compose("ndc_packages", "t.ndc_10, t.ndc_11");
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let codes: Vec<String> = stmt
            .query_map(params_from_iter(frag.params.iter()), |row| {
                let ndc_10: Option<String> = row.get(0)?;
                let ndc_11: Option<String> = row.get(1)?;
                Ok(ndc_11.or(ndc_10).unwrap_or_default())
            })
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

    fn seeded_provider(path: &std::path::Path) -> NdcProvider {
        let conn = Connection::open(path).unwrap();
        NdcProvider::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO ndc_packages (ndc_10, ndc_11, product_code, proprietary_name, code_type, status) VALUES
             ('0002-1200', '00002120001', '0002-1200', 'Humalog', '11-digit', 'ACTIVE')",
            [],
        )
        .unwrap();
        NdcProvider::new(path.to_string_lossy().to_string(), "2024Q1".to_string())
    }

    #[test]
    fn locate_matches_either_code_form() {
        let dir = std::env::temp_dir().join(format!("ndc-test-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        assert!(provider.locate("0002-1200").context.is_some());
        assert!(provider.locate("00002120001").context.is_some());
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn code_type_filter_rejects_unknown_values() {
        let dir = std::env::temp_dir().join(format!("ndc-test2-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        let mut ctx = provider.prep_context(false);
        assert!(provider.filter(&mut ctx, "code-type", "=", "bogus").is_err());
        let _ = std::fs::remove_file(&dir);
    }
}
