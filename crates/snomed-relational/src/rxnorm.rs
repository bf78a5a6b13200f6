//! RxNorm / NCI Thesaurus provider: TTY/STY/SAB/REL/RELA filters
//! plus a stemmed text search that joins one `rxnstems` alias per stem.

use rusqlite::{params_from_iter, Connection};
use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, SqlRowHandle};

use crate::schema::{sql_err, SqlFragment};

/// Which vocabulary this provider is serving — RxNorm and NCI Thesaurus
/// share the same `RXNCONSO`-style schema and filter set, differing only
/// in system URI and the `SAB` value their rows carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxVocabulary {
    /// `http://www.nlm.nih.gov/research/umls/rxnorm`.
    RxNorm,
    /// `http://ncimeta.nci.nih.gov`.
    Nci,
}

impl RxVocabulary {
    fn system(self) -> &'static str {
        match self {
            RxVocabulary::RxNorm => "http://www.nlm.nih.gov/research/umls/rxnorm",
            RxVocabulary::Nci => "http://ncimeta.nci.nih.gov",
        }
    }
}

/// A provider over an RxNorm/NCI-shaped relational schema.
pub struct RxNormProvider {
    db_path: String,
    version: String,
    vocabulary: RxVocabulary,
}

impl RxNormProvider {
    /// Creates a provider over the database at `db_path` for `vocabulary`.
    pub fn new(db_path: impl Into<String>, version: impl Into<String>, vocabulary: RxVocabulary) -> Self {
        Self {
            db_path: db_path.into(),
            version: version.into(),
            vocabulary,
        }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Schema: one concept row per `(RXCUI, SAB)` pair, one relationship
    /// row per `REL`/`RELA` edge, and a pre-tokenised `rxnstems` table
    /// for the stemmed search filter.
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rxn_concepts (
                rxcui TEXT PRIMARY KEY,
                str TEXT,
                tty TEXT NOT NULL,
                sty TEXT,
                sab TEXT NOT NULL,
                status TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rxn_relationships (
                rxcui TEXT NOT NULL,
                rel TEXT NOT NULL,
                rela TEXT,
                target TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rxn_stems (
                rxcui TEXT NOT NULL,
                stem TEXT NOT NULL
            );",
        )
    }
}

impl CodeSystemProvider for RxNormProvider {
    fn system(&self) -> &str {
        self.vocabulary.system()
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        match self.vocabulary {
            RxVocabulary::RxNorm => "RxNorm",
            RxVocabulary::Nci => "NCI Thesaurus",
        }
    }

    fn description(&self) -> &str {
        "RxNorm/UMLS-derived drug vocabulary"
    }

    fn total_count(&self) -> Option<usize> {
        let conn = self.connection().ok()?;
        conn.query_row("SELECT COUNT(*) FROM rxn_concepts", [], |row| row.get::<_, i64>(0))
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
            return LocateResult::not_found("RxNorm database unavailable");
        };
        let row = conn.query_row(
            "SELECT rxcui, str, status FROM rxn_concepts WHERE rxcui = ?1",
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
            Err(_) => LocateResult::not_found(format!("no such RXCUI: {code}")),
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
        conn.query_row("SELECT tty, sty FROM rxn_concepts WHERE rxcui = ?1", [&h.code], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .ok()
        .map(|(tty, sty)| {
            let mut props = vec![ConceptProperty { name: "TTY".to_string(), value: tty }];
            if let Some(sty) = sty {
                props.push(ConceptProperty { name: "STY".to_string(), value: sty });
            }
            props
        })
        .unwrap_or_default()
    }

    fn subsumes_test(&self, _subsumer: &ConceptHandle, _subsumed: &ConceptHandle) -> bool {
        false
    }

    fn does_filter(&self, property: &str, op: &str) -> bool {
        matches!(
            (property, op),
            ("TTY", "=") | ("TTY", "in") | ("STY", "=") | ("SAB", "=") | ("STR", "search")
        ) || property.starts_with("REL:")
            || property.starts_with("RELA:")
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
        frag.equals("t.sab", self.vocabulary_tag().to_string());

        for descriptor in &ctx.descriptors {
            match descriptor {
                FilterDescriptor::Property { property, op, value } => self.apply_property_filter(&mut frag, property, op, value)?,
                FilterDescriptor::Search { text } => self.apply_stemmed_search(&mut frag, text),
                FilterDescriptor::Special { name, .. } => {
                    return Err(TerminologyError::UnsupportedFilter { operation: name.clone() })
                }
            }
        }

        let sql = frag.compose("rxn_concepts", "t.rxcui");
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
            .filter_map(|code| self.locate(&code).context)
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

impl RxNormProvider {
    fn vocabulary_tag(&self) -> &'static str {
        match self.vocabulary {
            RxVocabulary::RxNorm => "RXNORM",
            RxVocabulary::Nci => "NCI",
        }
    }

    fn apply_property_filter(&self, frag: &mut SqlFragment, property: &str, op: &str, value: &str) -> TerminologyResult<()> {
        if let Some(rel) = property.strip_prefix("REL:") {
            frag.join("JOIN rxn_relationships rr ON rr.rxcui = t.rxcui");
            frag.equals("rr.rel", rel.to_string());
            frag.equals("rr.target", value.to_string());
            return Ok(());
        }
        if let Some(rela) = property.strip_prefix("RELA:") {
            frag.join("JOIN rxn_relationships rr ON rr.rxcui = t.rxcui");
            frag.equals("rr.rela", rela.to_string());
            frag.equals("rr.target", value.to_string());
            return Ok(());
        }
        match (property, op) {
            ("TTY", "=") => frag.equals("t.tty", value.to_string()),
            ("TTY", "in") => frag.is_in("t.tty", &value.split(',').map(str::trim).map(String::from).collect::<Vec<_>>()),
            ("STY", "=") => frag.equals("t.sty", value.to_string()),
            ("SAB", "=") => frag.equals("t.sab", value.to_string()),
            _ => {
                return Err(TerminologyError::UnsupportedFilter {
                    operation: format!("{property} {op}"),
                })
            }
        }
        Ok(())
    }

    fn apply_stemmed_search(&self, frag: &mut SqlFragment, text: &str) {
        for (i, stem) in text.split_whitespace().enumerate() {
            let alias = format!("stem{i}");
            frag.join(format!("JOIN rxn_stems {alias} ON {alias}.rxcui = t.rxcui"));
            frag.like(&format!("{alias}.stem"), stem.to_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_provider(path: &std::path::Path) -> RxNormProvider {
        let conn = Connection::open(path).unwrap();
        RxNormProvider::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO rxn_concepts (rxcui, str, tty, sty, sab, status) VALUES
             ('161', 'Acetaminophen', 'IN', 'Pharmacologic Substance', 'RXNORM', 'ACTIVE'),
             ('200', 'Ibuprofen', 'IN', 'Pharmacologic Substance', 'RXNORM', 'ACTIVE')",
            [],
        )
        .unwrap();
        RxNormProvider::new(path.to_string_lossy().to_string(), "2024-01-02".to_string(), RxVocabulary::RxNorm)
    }

    #[test]
    fn tty_filter_restricts_rows() {
        let dir = std::env::temp_dir().join(format!("rxnorm-test-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        let mut ctx = provider.prep_context(true);
        provider.filter(&mut ctx, "TTY", "=", "IN").unwrap();
        provider.execute_filters(&mut ctx).unwrap();
        assert_eq!(ctx.results.len(), 2);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn locate_round_trips_an_rxcui() {
        let dir = std::env::temp_dir().join(format!("rxnorm-test2-{}.db", std::process::id()));
        let provider = seeded_provider(&dir);
        let result = provider.locate("161");
        assert!(result.context.is_some());
        let _ = std::fs::remove_file(&dir);
    }
}
