//! ConceptMap store: a dedicated indexed schema for FHIR ConceptMap
//! resources, separate from the `CodeSystemProvider` contract (a
//! ConceptMap is searched and projected, never filtered/iterated the way
//! a code system is).

use rusqlite::Connection;
use snomed_loader::TerminologyResult;

use crate::schema::sql_err;

/// A single FHIR search parameter constraint recognised by
/// [`ConceptMapStore::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchParam {
    /// `url` — exact match against `conceptmaps.url`.
    Url(String),
    /// `identifier` — joined against `conceptmap_identifiers`.
    Identifier(String),
    /// `jurisdiction` — joined against `conceptmap_jurisdictions`.
    Jurisdiction(String),
    /// `source-system` or `target-system` — joined against
    /// `conceptmap_systems`.
    System(String),
    /// `name` — substring match (LIKE).
    Name(String),
}

/// A projection requested on a search: either the full resource, or a
/// fixed set of indexed columns the store can answer without touching
/// the stored JSON body at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    /// `true` unless the caller supplied an explicit `elements` list.
    pub full_resource: bool,
    /// The element names requested, when not the full resource.
    pub elements: Vec<String>,
}

impl Projection {
    /// The full resource (the default when no `elements` param is given).
    pub fn full() -> Self {
        Self {
            full_resource: true,
            elements: Vec::new(),
        }
    }

    /// A projection naming specific elements.
    pub fn of(elements: Vec<String>) -> Self {
        Self {
            full_resource: false,
            elements,
        }
    }

    /// Whether this projection can be answered entirely from indexed
    /// columns (`id`, `url`, `version`, `name`, `status`), skipping the
    /// stored JSON body entirely.
    pub fn is_indexed_only(&self) -> bool {
        const INDEXED: &[&str] = &["id", "url", "version", "name", "status"];
        !self.full_resource && self.elements.iter().all(|e| INDEXED.contains(&e.as_str()))
    }
}

/// A row projected purely from indexed columns, bypassing JSON parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSummary {
    /// The resource id.
    pub id: String,
    /// The canonical URL.
    pub url: Option<String>,
    /// The business version.
    pub version: Option<String>,
    /// The resource name.
    pub name: Option<String>,
    /// The publication status.
    pub status: String,
}

/// A full ConceptMap row, including its stored JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptMapRecord {
    /// The resource id.
    pub id: String,
    /// The canonical URL.
    pub url: Option<String>,
    /// The business version.
    pub version: Option<String>,
    /// The resource name.
    pub name: Option<String>,
    /// The publication status.
    pub status: String,
    /// The full FHIR ConceptMap resource, serialised as JSON text.
    pub resource_json: String,
}

/// A store over FHIR ConceptMap resources with indexed search
/// parameters and an upsert-by-id write path.
pub struct ConceptMapStore {
    db_path: String,
}

impl ConceptMapStore {
    /// Opens (or creates) a ConceptMap store backed by the SQLite
    /// database at `db_path`.
    pub fn new(db_path: impl Into<String>) -> Self {
        Self { db_path: db_path.into() }
    }

    fn connection(&self) -> TerminologyResult<Connection> {
        Connection::open(&self.db_path).map_err(sql_err)
    }

    /// Schema: one `conceptmaps` row per resource plus three satellite
    /// tables for the multi-valued fields a search parameter joins
    /// against.
    pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conceptmaps (
                id TEXT PRIMARY KEY,
                url TEXT,
                version TEXT,
                name TEXT,
                status TEXT NOT NULL,
                resource_json TEXT NOT NULL,
                last_seen_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS conceptmaps_url_idx ON conceptmaps(url);
            CREATE TABLE IF NOT EXISTS conceptmap_identifiers (
                conceptmap_id TEXT NOT NULL,
                identifier TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS conceptmap_jurisdictions (
                conceptmap_id TEXT NOT NULL,
                jurisdiction TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS conceptmap_systems (
                conceptmap_id TEXT NOT NULL,
                role TEXT NOT NULL,
                system TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS conceptmap_identifiers_idx ON conceptmap_identifiers(identifier);
            CREATE INDEX IF NOT EXISTS conceptmap_jurisdictions_idx ON conceptmap_jurisdictions(jurisdiction);
            CREATE INDEX IF NOT EXISTS conceptmap_systems_idx ON conceptmap_systems(system);",
        )
    }

    /// Inserts or replaces a ConceptMap by id, refreshing its satellite
    /// rows and last-seen timestamp. `now` is caller-supplied (an epoch
    /// second) since this crate never calls the system clock itself.
    pub fn upsert(
        &self,
        id: &str,
        url: Option<&str>,
        version: Option<&str>,
        name: Option<&str>,
        status: &str,
        resource_json: &str,
        identifiers: &[String],
        jurisdictions: &[String],
        source_systems: &[String],
        target_systems: &[String],
        now: i64,
    ) -> TerminologyResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO conceptmaps (id, url, version, name, status, resource_json, last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url, version = excluded.version, name = excluded.name,
                status = excluded.status, resource_json = excluded.resource_json,
                last_seen_at = excluded.last_seen_at",
            (id, url, version, name, status, resource_json, now),
        )
        .map_err(sql_err)?;

        conn.execute("DELETE FROM conceptmap_identifiers WHERE conceptmap_id = ?1", [id])
            .map_err(sql_err)?;
        conn.execute("DELETE FROM conceptmap_jurisdictions WHERE conceptmap_id = ?1", [id])
            .map_err(sql_err)?;
        conn.execute("DELETE FROM conceptmap_systems WHERE conceptmap_id = ?1", [id])
            .map_err(sql_err)?;

        for identifier in identifiers {
            conn.execute(
                "INSERT INTO conceptmap_identifiers (conceptmap_id, identifier) VALUES (?1, ?2)",
                (id, identifier),
            )
            .map_err(sql_err)?;
        }
        for jurisdiction in jurisdictions {
            conn.execute(
                "INSERT INTO conceptmap_jurisdictions (conceptmap_id, jurisdiction) VALUES (?1, ?2)",
                (id, jurisdiction),
            )
            .map_err(sql_err)?;
        }
        for system in source_systems {
            conn.execute(
                "INSERT INTO conceptmap_systems (conceptmap_id, role, system) VALUES (?1, 'source', ?2)",
                (id, system),
            )
            .map_err(sql_err)?;
        }
        for system in target_systems {
            conn.execute(
                "INSERT INTO conceptmap_systems (conceptmap_id, role, system) VALUES (?1, 'target', ?2)",
                (id, system),
            )
            .map_err(sql_err)?;
        }
        Ok(())
    }

    /// Deletes ConceptMaps whose `last_seen_at` predates `cutoff`,
    /// alongside their satellite rows. Called periodically by whatever
    /// owns the reload cycle, not by this store itself.
    pub fn garbage_collect(&self, cutoff: i64) -> TerminologyResult<usize> {
        let conn = self.connection()?;
        let stale: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT id FROM conceptmaps WHERE last_seen_at < ?1")
                .map_err(sql_err)?;
            let rows = stmt
                .query_map([cutoff], |row| row.get::<_, String>(0))
                .map_err(sql_err)?
                .collect::<Result<_, _>>()
                .map_err(sql_err)?;
            rows
        };
        for id in &stale {
            conn.execute("DELETE FROM conceptmap_identifiers WHERE conceptmap_id = ?1", [id])
                .map_err(sql_err)?;
            conn.execute("DELETE FROM conceptmap_jurisdictions WHERE conceptmap_id = ?1", [id])
                .map_err(sql_err)?;
            conn.execute("DELETE FROM conceptmap_systems WHERE conceptmap_id = ?1", [id])
                .map_err(sql_err)?;
        }
        conn.execute("DELETE FROM conceptmaps WHERE last_seen_at < ?1", [cutoff])
            .map_err(sql_err)?;
        Ok(stale.len())
    }

    /// Translates search parameters into the join/where clauses they
    /// need and runs the query, honouring the indexed-column-projection
    /// shortcut when the requested `elements` are all indexed.
    pub fn search(&self, params: &[SearchParam], projection: &Projection) -> TerminologyResult<Vec<ConceptMapRecord>> {
        if projection.is_indexed_only() {
            let summaries = self.search_indexed_only(params)?;
            return Ok(summaries
                .into_iter()
                .map(|s| ConceptMapRecord {
                    id: s.id,
                    url: s.url,
                    version: s.version,
                    name: s.name,
                    status: s.status,
                    resource_json: String::new(),
                })
                .collect());
        }

        let conn = self.connection()?;
        let (sql, binds) = self.build_query(params, "t.id, t.url, t.version, t.name, t.status, t.resource_json");
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(binds.iter()), |row| {
                Ok(ConceptMapRecord {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    version: row.get(2)?,
                    name: row.get(3)?,
                    status: row.get(4)?,
                    resource_json: row.get(5)?,
                })
            })
            .map_err(sql_err)?;
        rows.collect::<Result<_, _>>().map_err(sql_err)
    }

    /// Answers a search using only indexed columns, skipping the
    /// `resource_json` body entirely.
    fn search_indexed_only(&self, params: &[SearchParam]) -> TerminologyResult<Vec<IndexedSummary>> {
        let conn = self.connection()?;
        let (sql, binds) = self.build_query(params, "t.id, t.url, t.version, t.name, t.status");
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(binds.iter()), |row| {
                Ok(IndexedSummary {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    version: row.get(2)?,
                    name: row.get(3)?,
                    status: row.get(4)?,
                })
            })
            .map_err(sql_err)?;
        rows.collect::<Result<_, _>>().map_err(sql_err)
    }

    fn build_query(&self, params: &[SearchParam], select: &str) -> (String, Vec<rusqlite::types::Value>) {
        let mut joins = Vec::new();
        let mut wheres = Vec::new();
        let mut binds: Vec<rusqlite::types::Value> = Vec::new();

        for (i, param) in params.iter().enumerate() {
            match param {
                SearchParam::Url(url) => {
                    wheres.push("t.url = ?".to_string());
                    binds.push(url.clone().into());
                }
                SearchParam::Name(name) => {
                    wheres.push("t.name LIKE ?".to_string());
                    binds.push(format!("%{name}%").into());
                }
                SearchParam::Identifier(value) => {
                    let alias = format!("ci{i}");
                    joins.push(format!("JOIN conceptmap_identifiers {alias} ON {alias}.conceptmap_id = t.id"));
                    wheres.push(format!("{alias}.identifier = ?"));
                    binds.push(value.clone().into());
                }
                SearchParam::Jurisdiction(value) => {
                    let alias = format!("cj{i}");
                    joins.push(format!("JOIN conceptmap_jurisdictions {alias} ON {alias}.conceptmap_id = t.id"));
                    wheres.push(format!("{alias}.jurisdiction = ?"));
                    binds.push(value.clone().into());
                }
                SearchParam::System(value) => {
                    let alias = format!("cs{i}");
                    joins.push(format!("JOIN conceptmap_systems {alias} ON {alias}.conceptmap_id = t.id"));
                    wheres.push(format!("{alias}.system = ?"));
                    binds.push(value.clone().into());
                }
            }
        }

        let mut sql = format!("SELECT {select} FROM conceptmaps t");
        for j in &joins {
            sql.push(' ');
            sql.push_str(j);
        }
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        (sql, binds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_at(path: &std::path::Path) -> ConceptMapStore {
        let conn = Connection::open(path).unwrap();
        ConceptMapStore::init_schema(&conn).unwrap();
        ConceptMapStore::new(path.to_string_lossy().to_string())
    }

    #[test]
    fn upsert_then_search_by_url_finds_the_map() {
        let dir = std::env::temp_dir().join(format!("cm-test-{}.db", std::process::id()));
        let store = store_at(&dir);
        store
            .upsert(
                "map-1",
                Some("http://example.org/fhir/ConceptMap/map-1"),
                Some("1.0.0"),
                Some("Example Map"),
                "active",
                "{\"resourceType\":\"ConceptMap\"}",
                &["urn:ietf:example".to_string()],
                &["US".to_string()],
                &["http://snomed.info/sct".to_string()],
                &["http://loinc.org".to_string()],
                1_700_000_000,
            )
            .unwrap();

        let results = store
            .search(
                &[SearchParam::Url("http://example.org/fhir/ConceptMap/map-1".to_string())],
                &Projection::full(),
            )
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "map-1");
        assert!(results[0].resource_json.contains("ConceptMap"));
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn indexed_only_projection_skips_the_json_body() {
        let dir = std::env::temp_dir().join(format!("cm-test2-{}.db", std::process::id()));
        let store = store_at(&dir);
        store
            .upsert(
                "map-2",
                Some("http://example.org/fhir/ConceptMap/map-2"),
                None,
                Some("Second Map"),
                "draft",
                "{\"resourceType\":\"ConceptMap\"}",
                &[],
                &[],
                &[],
                &[],
                1_700_000_000,
            )
            .unwrap();

        let projection = Projection::of(vec!["id".to_string(), "name".to_string()]);
        assert!(projection.is_indexed_only());
        let results = store.search(&[], &projection).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].resource_json.is_empty());
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn garbage_collect_removes_stale_maps_and_their_satellites() {
        let dir = std::env::temp_dir().join(format!("cm-test3-{}.db", std::process::id()));
        let store = store_at(&dir);
        store
            .upsert(
                "map-3",
                None,
                None,
                None,
                "active",
                "{}",
                &["id-1".to_string()],
                &[],
                &[],
                &[],
                1_000,
            )
            .unwrap();

        let removed = store.garbage_collect(2_000).unwrap();
        assert_eq!(removed, 1);
        let results = store.search(&[SearchParam::Identifier("id-1".to_string())], &Projection::full()).unwrap();
        assert!(results.is_empty());
        let _ = std::fs::remove_file(&dir);
    }
}
