//! CPT provider: codes may be simple (`99213`) or carry one or two
//! modifiers (`99213:25`, `99213:25:59`). `locate` validates the modifier
//! combination against CPT's compatibility rules before resolving.

use rusqlite::Connection;
use snomed_loader::{Designation, TerminologyError, TerminologyResult};

use snomed_provider::contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
use snomed_provider::filter::{FilterDescriptor, FilterExecutionContext, DEFAULT_PAGE_SIZE};
use snomed_provider::handle::{ConceptHandle, LocateResult, SqlRowHandle};

use crate::schema::sql_err;

/// Modifiers restricted to category-II codes (`XXXXF`).
const CAT_2_ONLY: &[&str] = &["1P", "2P", "3P", "8P"];
/// Mutually exclusive modifier groups: at most one member of each group
/// may appear together.
const EXCLUSIVE_GROUPS: &[&[&str]] = &[&["25", "57", "59"], &["52", "53", "73", "74"], &["76", "77", "78", "79"], &["93", "95"]];
/// Codes modifier 92 is restricted to.
const MODIFIER_92_CODES: &[&str] = &["86701", "86702", "86703", "87389"];

fn is_physical_status_modifier(modifier: &str) -> bool {
    matches!(modifier, "P1" | "P2" | "P3" | "P4" | "P5" | "P6")
}

fn in_physical_status_range(code: &str) -> bool {
    code.parse::<u32>().map(|n| (100..=1999).contains(&n)).unwrap_or(false)
}

fn in_modifier_63_range(code: &str) -> bool {
    code.parse::<u32>().map(|n| (20100..=69990).contains(&n)).unwrap_or(false)
}

/// HCPCS Level II modifiers are two characters with at least one letter
/// (`TC`, `GA`, ...), excluding CPT's own alphanumeric modifiers
/// (category-II `1P`-`8P`, physical status `P1`-`P6`).
fn is_hcpcs_ii_modifier(modifier: &str) -> bool {
    modifier.len() == 2
        && modifier.chars().any(|c| c.is_ascii_alphabetic())
        && !CAT_2_ONLY.contains(&modifier)
        && !is_physical_status_modifier(modifier)
}

/// Validates a CPT code plus its modifiers against the modifier
/// compatibility rules. Returns an error message describing the first
/// violation found, or `Ok(())` if the combination is allowed.
fn validate_modifiers(code: &str, modifiers: &[&str], is_cat_2: bool, telemedicine: bool) -> Result<(), String> {
    if modifiers.iter().any(|m| *m == "kind=code") {
        return Err("kind=code cannot be used as a modifier".to_string());
    }

    for m in modifiers {
        if CAT_2_ONLY.contains(m) && !is_cat_2 {
            return Err(format!("modifier {m} is valid only on category II codes"));
        }
        if is_physical_status_modifier(m) && !in_physical_status_range(code) {
            return Err(format!("modifier {m} is valid only on codes 00100-01999"));
        }
        if is_hcpcs_ii_modifier(m) && !modifiers.contains(&"59") {
            return Err(format!("HCPCS Level II modifier {m} requires modifier 59 to also be present"));
        }
        if *m == "63" && !(in_modifier_63_range(code) || matches!(code, "99289" | "99291")) {
            return Err("modifier 63 is valid only on 20100-69990 or the enumerated exception list".to_string());
        }
        if *m == "92" && !MODIFIER_92_CODES.contains(&code) {
            return Err(format!("modifier 92 is valid only on {MODIFIER_92_CODES:?}"));
        }
        if *m == "95" && !telemedicine {
            return Err("modifier 95 requires a telemedicine-eligible code".to_string());
        }
    }

    for group in EXCLUSIVE_GROUPS {
        let present: Vec<&&str> = modifiers.iter().filter(|m| group.contains(m)).collect();
        if present.len() > 1 {
            return Err(format!("modifiers {present:?} are mutually exclusive"));
        }
    }

    Ok(())
}

/// A provider over a CPT code/modifier database.
pub struct CptProvider {
    db_path: String,
    version: String,
}

impl CptProvider {
    /// Creates a provider over the CPT database at `db_path`.
    pub fn new(db_path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            version: version.into(),
        }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Schema: one row per base code, carrying its descriptor and the two
    /// boolean flags the modifier rules consult (`is_cat_2`,
    /// `telemedicine`).
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cpt_codes (
                code TEXT PRIMARY KEY,
                descriptor TEXT,
                is_cat_2 INTEGER NOT NULL DEFAULT 0,
                telemedicine INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
            );",
        )
    }

    fn lookup_base(&self, conn: &Connection, code: &str) -> Option<(Option<String>, bool, bool, String)> {
        conn.query_row(
            "SELECT descriptor, is_cat_2, telemedicine, status FROM cpt_codes WHERE code = ?1",
            [code],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, i64>(1)? != 0,
                    row.get::<_, i64>(2)? != 0,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .ok()
    }
}

impl CodeSystemProvider for CptProvider {
    fn system(&self) -> &str {
        "http://www.ama-assn.org/go/cpt"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        "CPT"
    }

    fn description(&self) -> &str {
        "Current Procedural Terminology"
    }

    fn total_count(&self) -> Option<usize> {
        let conn = self.connection().ok()?;
        conn.query_row("SELECT COUNT(*) FROM cpt_codes", [], |row| row.get::<_, i64>(0))
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
        let parts: Vec<&str> = code.split(':').collect();
        let base = parts[0];
        let modifiers = &parts[1..];

        let Ok(conn) = self.connection() else {
            return LocateResult::not_found("CPT database unavailable");
        };
        let Some((descriptor, is_cat_2, telemedicine, status)) = self.lookup_base(&conn, base) else {
            return LocateResult::not_found(format!("no such CPT code: {base}"));
        };

        if let Err(reason) = validate_modifiers(base, modifiers, is_cat_2, telemedicine) {
            return LocateResult::not_found(reason);
        }

        LocateResult::found(ConceptHandle::SqlRow(SqlRowHandle {
            code: code.to_string(),
            display: descriptor,
            domain: None,
            active: status == "ACTIVE",
        }))
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
        matches!((property, op), ("code", "="))
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
        let found = ctx
            .descriptors
            .iter()
            .filter_map(|d| match d {
                FilterDescriptor::Property { value, .. } if self.locate(value).context.is_some() => Some(value.clone()),
                _ => None,
            })
            .collect();
        ctx.results = found;
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
